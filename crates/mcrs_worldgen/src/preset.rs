//! A small built-in world: rolling continents with cheese caves, a handful of
//! biomes picked by climate and a surface rule covering them.
//!
//! Density is positive in air, so terrain functions rise with height.

use crate::biome::{Biome, BiomeRegistry, BiomeSourceSettings, ClimateEntry};
use crate::climate::{Param, ParamPoint};
use crate::density_function::proto::{
    DensityFunctionHolder, NoiseHolder, ProtoDensityFunction, SingleArgumentFunction,
    TwoArgumentFunction,
};
use crate::proto::{
    BlockState, CaveSurface, ConditionSource, NoiseGeneratorSettings, NoiseSettings,
    ProtoNoiseRouter, SurfaceRule, VerticalAnchor,
};
use mcrs_engine::world::block::{BlockKind, BlockStates};
use std::collections::BTreeMap;

pub const MIN_Y: i32 = -64;
pub const HEIGHT: u32 = 384;
pub const SEA_LEVEL: i32 = 63;

const SOLID_BLOCKS: [&str; 19] = [
    "stone",
    "deepslate",
    "bedrock",
    "grass_block",
    "dirt",
    "sand",
    "red_sand",
    "gravel",
    "snow_block",
    "packed_ice",
    "terracotta",
    "orange_terracotta",
    "yellow_terracotta",
    "brown_terracotta",
    "red_terracotta",
    "white_terracotta",
    "light_gray_terracotta",
    "ice",
    "calcite",
];

pub fn block_states() -> BlockStates {
    let mut blocks = BlockStates::new();
    for name in SOLID_BLOCKS {
        blocks.register(format!("minecraft:{name}"), BlockKind::Solid);
    }
    blocks.register("minecraft:water", BlockKind::Water);
    blocks.register("minecraft:lava", BlockKind::Lava);
    blocks
}

pub fn biome_registry() -> BiomeRegistry {
    let mut biomes = BiomeRegistry::new();
    for (name, temperature) in [
        ("plains", 0.8),
        ("forest", 0.7),
        ("desert", 2.0),
        ("snowy_plains", 0.0),
        ("badlands", 2.0),
        ("eroded_badlands", 2.0),
        ("ocean", 0.5),
        ("frozen_ocean", 0.0),
        ("deep_frozen_ocean", 0.5),
    ] {
        biomes.register(name, Biome { temperature });
    }
    biomes
}

fn climate(
    biome: &str,
    temperature: (f64, f64),
    humidity: (f64, f64),
    continentalness: (f64, f64),
    erosion: (f64, f64),
) -> ClimateEntry {
    let span = |(min, max): (f64, f64)| Param::span(min, max);
    ClimateEntry {
        biome: format!("minecraft:{biome}"),
        parameters: ParamPoint::new(
            span(temperature),
            span(humidity),
            span(continentalness),
            span(erosion),
            Param::span(0.0, 0.0),
            Param::span(-1.0, 1.0),
            0.0_f64,
        ),
    }
}

pub fn biome_source() -> BiomeSourceSettings {
    const ANY: (f64, f64) = (-1.0, 1.0);
    const SEA: (f64, f64) = (-1.2, -0.19);
    const DEEP_SEA: (f64, f64) = (-1.2, -0.455);
    const LAND: (f64, f64) = (-0.19, 1.0);
    const FROZEN: (f64, f64) = (-1.0, -0.45);
    const TEMPERATE: (f64, f64) = (-0.45, 0.55);
    const HOT: (f64, f64) = (0.55, 1.0);
    const DRY: (f64, f64) = (-1.0, 0.1);
    const WET: (f64, f64) = (0.1, 1.0);
    BiomeSourceSettings::MultiNoise {
        biomes: vec![
            climate("deep_frozen_ocean", FROZEN, ANY, DEEP_SEA, ANY),
            climate("frozen_ocean", FROZEN, ANY, SEA, ANY),
            climate("ocean", (-0.45, 1.0), ANY, SEA, ANY),
            climate("snowy_plains", FROZEN, ANY, LAND, ANY),
            climate("plains", TEMPERATE, DRY, LAND, ANY),
            climate("forest", TEMPERATE, WET, LAND, ANY),
            climate("desert", HOT, DRY, LAND, ANY),
            climate("badlands", HOT, WET, LAND, (-1.0, 0.05)),
            climate("eroded_badlands", HOT, WET, LAND, (0.05, 1.0)),
        ],
    }
}

fn owned(function: ProtoDensityFunction) -> DensityFunctionHolder {
    function.into()
}

fn single(argument: DensityFunctionHolder) -> SingleArgumentFunction {
    SingleArgumentFunction { argument }
}

fn pair(argument1: DensityFunctionHolder, argument2: DensityFunctionHolder) -> TwoArgumentFunction {
    TwoArgumentFunction {
        argument1,
        argument2,
    }
}

fn noise(name: &str, xz_scale: f64, y_scale: f64) -> DensityFunctionHolder {
    owned(ProtoDensityFunction::Noise {
        noise: NoiseHolder::Reference(format!("minecraft:{name}")),
        xz_scale: xz_scale.into(),
        y_scale: y_scale.into(),
    })
}

fn add(a: DensityFunctionHolder, b: DensityFunctionHolder) -> DensityFunctionHolder {
    owned(ProtoDensityFunction::Add(pair(a, b)))
}

fn mul(a: DensityFunctionHolder, b: DensityFunctionHolder) -> DensityFunctionHolder {
    owned(ProtoDensityFunction::Mul(pair(a, b)))
}

fn y_gradient(from_y: i32, to_y: i32, from_value: f64, to_value: f64) -> DensityFunctionHolder {
    owned(ProtoDensityFunction::YClampedGradient {
        from_y,
        to_y,
        from_value: from_value.into(),
        to_value: to_value.into(),
    })
}

const TERRAIN: &str = "preset:terrain";
const CONTINENTS: &str = "preset:continents";

fn density_functions() -> BTreeMap<String, DensityFunctionHolder> {
    let continents = owned(ProtoDensityFunction::FlatCache(single(noise(
        "continentalness",
        0.25,
        0.0,
    ))));
    // Zero at y 64 and one unit per 128 blocks; low continents sink the ground under the sea.
    let terrain = add(
        y_gradient(MIN_Y, 192, -1.0, 1.0),
        mul(DensityFunctionHolder::from(-0.25), CONTINENTS.into()),
    );
    BTreeMap::from([
        (CONTINENTS.to_owned(), continents),
        (TERRAIN.to_owned(), terrain),
    ])
}

fn noise_router() -> ProtoNoiseRouter {
    // Cheese caves fade out above y 40.
    let caves = add(
        mul(
            noise("cave_cheese", 1.0, 0.6667),
            y_gradient(MIN_Y + 8, 40, 1.0, 0.0),
        ),
        DensityFunctionHolder::from(-0.45),
    );
    let final_density = owned(ProtoDensityFunction::Interpolated(single(owned(
        ProtoDensityFunction::Max(pair(TERRAIN.into(), caves)),
    ))));

    ProtoNoiseRouter {
        barrier: noise("aquifer_barrier", 1.0, 0.5),
        fluid_level_floodedness: noise("aquifer_fluid_level_floodedness", 1.0, 0.67),
        fluid_level_spread: noise("aquifer_fluid_level_spread", 1.0, 0.7142857142857143),
        lava: noise("aquifer_lava", 1.0, 1.0),
        temperature: noise("temperature", 0.25, 0.0),
        vegetation: noise("vegetation", 0.25, 0.0),
        continents: CONTINENTS.into(),
        erosion: noise("erosion", 0.25, 0.0),
        depth: y_gradient(MIN_Y, 320, 1.5, -1.5),
        ridges: noise("ridge", 0.25, 0.0),
        preliminary_surface_level: owned(ProtoDensityFunction::FindTopSurface {
            density: TERRAIN.into(),
            upper_bound: DensityFunctionHolder::from(192.0),
            lower_bound: MIN_Y,
            cell_height: 8,
        }),
        final_density,
    }
}

fn block(name: &str) -> SurfaceRule {
    SurfaceRule::Block {
        result_state: BlockState::new(format!("minecraft:{name}")),
    }
}

fn when(condition: ConditionSource, then_run: SurfaceRule) -> SurfaceRule {
    SurfaceRule::Condition {
        if_true: Box::new(condition),
        then_run: Box::new(then_run),
    }
}

fn biome_is(names: &[&str]) -> ConditionSource {
    ConditionSource::Biome {
        biome_is: names.iter().map(|name| format!("minecraft:{name}")).collect(),
    }
}

fn floor(add_surface_depth: bool) -> ConditionSource {
    ConditionSource::StoneDepth {
        offset: 0,
        add_surface_depth,
        secondary_depth_range: 0,
        surface_type: CaveSurface::Floor,
    }
}

fn above_water(offset: i32) -> ConditionSource {
    ConditionSource::Water {
        offset,
        surface_depth_multiplier: 0,
        add_stone_depth: false,
    }
}

fn gradient(random_name: &str, true_at_and_below: VerticalAnchor, false_at_and_above: VerticalAnchor) -> ConditionSource {
    ConditionSource::VerticalGradient {
        random_name: random_name.to_owned(),
        true_at_and_below,
        false_at_and_above,
    }
}

fn surface_rule() -> SurfaceRule {
    let top = SurfaceRule::Sequence {
        sequence: vec![
            when(biome_is(&["desert"]), block("sand")),
            when(biome_is(&["snowy_plains"]), block("snow_block")),
            block("grass_block"),
        ],
    };
    let under = SurfaceRule::Sequence {
        sequence: vec![when(biome_is(&["desert"]), block("sand")), block("dirt")],
    };
    let badlands = when(
        biome_is(&["badlands", "eroded_badlands"]),
        SurfaceRule::Sequence {
            sequence: vec![
                when(floor(false), when(above_water(-1), block("red_sand"))),
                when(floor(true), SurfaceRule::Bandlands),
            ],
        },
    );
    let land = when(
        ConditionSource::AbovePreliminarySurface,
        SurfaceRule::Sequence {
            sequence: vec![
                badlands,
                when(floor(false), when(above_water(-1), top)),
                when(floor(false), block("gravel")),
                when(floor(true), under),
            ],
        },
    );

    SurfaceRule::Sequence {
        sequence: vec![
            when(
                gradient(
                    "minecraft:bedrock_floor",
                    VerticalAnchor::AboveBottom { above_bottom: 0 },
                    VerticalAnchor::AboveBottom { above_bottom: 5 },
                ),
                block("bedrock"),
            ),
            land,
            when(
                gradient(
                    "minecraft:deepslate",
                    VerticalAnchor::Absolute { absolute: 0 },
                    VerticalAnchor::Absolute { absolute: 8 },
                ),
                block("deepslate"),
            ),
        ],
    }
}

/// Settings of the built-in world, with aquifers off.
pub fn overworld_like() -> NoiseGeneratorSettings {
    NoiseGeneratorSettings {
        noise: NoiseSettings {
            min_y: MIN_Y,
            height: HEIGHT,
            size_horizontal: 1,
            size_vertical: 2,
        },
        default_block: BlockState::new("minecraft:stone"),
        default_fluid: BlockState::new("minecraft:water"),
        noise_router: noise_router(),
        surface_rule: surface_rule(),
        sea_level: SEA_LEVEL,
        aquifers_enabled: false,
        legacy_random_source: false,
        density_functions: density_functions(),
        noises: BTreeMap::new(),
        aquifer: Default::default(),
    }
}
