pub mod context;
pub mod rule;

use crate::aquifer::WAY_BELOW_MIN_Y;
use crate::biome::{BiomeId, BiomeRegistry, BiomeSource};
use crate::error::BuildError;
use crate::noise::normal_noise::NormalNoise;
use crate::proto::NoiseGeneratorSettings;
use crate::random_state::{RandomState, qualified};
use crate::router::NoiseRouter;
use crate::surface::context::SurfaceContext;
use crate::surface::rule::SurfaceRules;
use bevy_math::IVec3;
use mcrs_engine::world::block::{BlockKind, BlockPos, BlockStateId, BlockStates};
use mcrs_engine::world::chunk::ChunkAccess;
use mcrs_engine::world::chunk::heightmap::HeightmapKind;
use mcrs_random::Random;
use mcrs_random::positional::PositionalRandom;
use std::sync::Arc;
use tracing::debug;

const CLAY_BAND_COUNT: usize = 192;

/// Terracotta colours used by the clay bands, in resolution order.
const TERRACOTTA: [&str; 7] = [
    "minecraft:terracotta",
    "minecraft:orange_terracotta",
    "minecraft:yellow_terracotta",
    "minecraft:brown_terracotta",
    "minecraft:red_terracotta",
    "minecraft:white_terracotta",
    "minecraft:light_gray_terracotta",
];

#[derive(Debug)]
struct BadlandsPillars {
    biome: BiomeId,
    surface: Arc<NormalNoise>,
    pillar: Arc<NormalNoise>,
    roof: Arc<NormalNoise>,
}

#[derive(Debug)]
struct Icebergs {
    biomes: Vec<BiomeId>,
    surface: Arc<NormalNoise>,
    pillar: Arc<NormalNoise>,
    roof: Arc<NormalNoise>,
    packed_ice: BlockStateId,
    snow_block: BlockStateId,
}

/// Repaints the placeholder block of filled chunks with biome specific materials.
#[derive(Debug)]
pub struct SurfaceSystem {
    rules: SurfaceRules,
    biomes: Arc<BiomeRegistry>,
    default_block: BlockStateId,
    sea_level: i32,
    legacy_biome_height: bool,
    random: PositionalRandom,
    surface_noise: Arc<NormalNoise>,
    surface_secondary_noise: Arc<NormalNoise>,
    clay_bands_offset_noise: Arc<NormalNoise>,
    clay_bands: Box<[BlockStateId]>,
    badlands: Option<BadlandsPillars>,
    icebergs: Option<Icebergs>,
}

impl SurfaceSystem {
    pub fn new(
        settings: &NoiseGeneratorSettings,
        random_state: &mut RandomState,
        blocks: &BlockStates,
        biomes: Arc<BiomeRegistry>,
    ) -> Result<Self, BuildError> {
        let resolve = |name: &str| {
            blocks
                .id(&qualified(name))
                .ok_or_else(|| BuildError::UnknownBlock(name.to_owned()))
        };
        let default_block = resolve(&settings.default_block.name)?;
        let rules = SurfaceRules::compile(
            &settings.surface_rule,
            &settings.noise,
            random_state,
            blocks,
            &biomes,
        )?;

        let clay_bands = if rules.rule().uses_bandlands() {
            let colours = TERRACOTTA
                .iter()
                .map(|name| resolve(*name))
                .collect::<Result<Vec<_>, _>>()?;
            let mut random = random_state.random().from_hash_of("minecraft:clay_bands");
            generate_bands(&mut random)
                .iter()
                .map(|&colour| colours[colour as usize])
                .collect()
        } else {
            Box::default()
        };

        let badlands = match biomes.id("eroded_badlands") {
            Some(biome) => Some(BadlandsPillars {
                biome,
                surface: random_state.noise("badlands_surface")?,
                pillar: random_state.noise("badlands_pillar")?,
                roof: random_state.noise("badlands_pillar_roof")?,
            }),
            None => None,
        };

        let frozen: Vec<BiomeId> = ["frozen_ocean", "deep_frozen_ocean"]
            .iter()
            .filter_map(|name| biomes.id(name))
            .collect();
        let ice = blocks.id("minecraft:packed_ice").zip(blocks.id("minecraft:snow_block"));
        let icebergs = match ice {
            Some((packed_ice, snow_block)) if !frozen.is_empty() => Some(Icebergs {
                biomes: frozen,
                surface: random_state.noise("iceberg_surface")?,
                pillar: random_state.noise("iceberg_pillar")?,
                roof: random_state.noise("iceberg_pillar_roof")?,
                packed_ice,
                snow_block,
            }),
            _ => {
                if !frozen.is_empty() {
                    debug!("frozen ocean biomes registered without ice blocks, icebergs disabled");
                }
                None
            }
        };

        Ok(Self {
            rules,
            biomes,
            default_block,
            sea_level: settings.sea_level,
            legacy_biome_height: settings.legacy_random_source,
            random: *random_state.random(),
            surface_noise: random_state.noise("surface")?,
            surface_secondary_noise: random_state.noise("surface_secondary")?,
            clay_bands_offset_noise: random_state.noise("clay_bands_offset")?,
            clay_bands,
            badlands,
            icebergs,
        })
    }

    #[inline]
    pub fn rules(&self) -> &SurfaceRules {
        &self.rules
    }

    #[inline]
    pub fn default_block(&self) -> BlockStateId {
        self.default_block
    }

    /// Depth of the surface layer of a column, mostly between 2 and 6.
    pub fn surface_depth(&self, x: i32, z: i32) -> i32 {
        let noise = self.surface_noise.get(x as f64, 0.0, z as f64);
        let jitter = self.random.at(x, 0, z).next_f64() * 0.25;
        (noise * 2.75 + 3.0 + jitter) as i32
    }

    pub fn surface_secondary(&self, x: i32, z: i32) -> f64 {
        self.surface_secondary_noise.get(x as f64, 0.0, z as f64)
    }

    /// Clay band at a block. `None` when no rule paints bands.
    pub fn band(&self, x: i32, y: i32, z: i32) -> Option<BlockStateId> {
        if self.clay_bands.is_empty() {
            return None;
        }
        let offset = self.clay_bands_offset_noise.get(x as f64, 0.0, z as f64) * 4.0;
        let offset = (offset + 0.5).floor() as i32;
        let index = (y + offset).rem_euclid(self.clay_bands.len() as i32);
        self.clay_bands.get(index as usize).copied()
    }

    pub fn is_cold(&self, biome: BiomeId, pos: IVec3) -> bool {
        self.biomes.cold_enough_to_snow(biome, pos, self.sea_level)
    }

    /// Runs the biome extensions and the rule scan over every column of `chunk`.
    pub fn build_surface<C: ChunkAccess + ?Sized>(
        &self,
        chunk: &mut C,
        biome_source: &dyn BiomeSource,
        router: &NoiseRouter,
    ) {
        let mut ctx = SurfaceContext::new(self, biome_source, router);
        let min_x = chunk.pos().min_block_x();
        let min_z = chunk.pos().min_block_z();
        for local_x in 0..16 {
            for local_z in 0..16 {
                let x = min_x + local_x;
                let z = min_z + local_z;
                let top = chunk.height_at(HeightmapKind::WorldSurfaceWg, x, z) + 1;
                let biome_y = if self.legacy_biome_height { 0 } else { top };
                let biome = biome_source.biome_at_block(IVec3::new(x, biome_y, z));
                ctx.update_xz(x, z);

                if let Some(badlands) = &self.badlands {
                    if biome == badlands.biome {
                        self.badlands_pillar(badlands, chunk, x, z, top);
                    }
                }
                // pillars join the scan, icebergs above the old surface do not
                let top = chunk.height_at(HeightmapKind::WorldSurfaceWg, x, z) + 1;
                if let Some(icebergs) = &self.icebergs {
                    if icebergs.biomes.contains(&biome) {
                        let min_surface_level = ctx.min_surface_level();
                        self.iceberg(icebergs, min_surface_level, biome, chunk, x, z, top);
                    }
                }

                self.scan_column(&mut ctx, chunk, x, z, top);
            }
        }
    }

    fn scan_column<C: ChunkAccess + ?Sized>(
        &self,
        ctx: &mut SurfaceContext<'_>,
        chunk: &mut C,
        x: i32,
        z: i32,
        top: i32,
    ) {
        let min_y = chunk.min_y();
        let mut stone_depth_above = 0;
        let mut water_height = i32::MIN;
        let mut next_ceiling = i32::MAX;
        for y in (min_y..=top).rev() {
            let pos = BlockPos::new(x, y, z);
            let state = chunk.block_state(pos);
            let kind = chunk.block_states().kind(state);
            if kind.is_air() {
                stone_depth_above = 0;
                water_height = i32::MIN;
                continue;
            }
            if kind.is_fluid() {
                if water_height == i32::MIN {
                    water_height = y + 1;
                }
                continue;
            }
            if next_ceiling >= y {
                next_ceiling = WAY_BELOW_MIN_Y;
                for below in (min_y - 1..y).rev() {
                    if !chunk.block_kind(BlockPos::new(x, below, z)).blocks_motion() {
                        next_ceiling = below + 1;
                        break;
                    }
                }
            }
            stone_depth_above += 1;
            let stone_depth_below = y - next_ceiling + 1;
            ctx.update_y(stone_depth_above, stone_depth_below, water_height, y);
            if state != self.default_block {
                continue;
            }
            if let Some(replacement) = self.rules.try_apply(ctx, &*chunk) {
                chunk.set_block_state(pos, replacement);
            }
        }
    }

    /// Highest block of an eroded badlands pillar in the column, if one rises there.
    pub fn badlands_pillar_top(&self, x: i32, z: i32) -> Option<i32> {
        let badlands = self.badlands.as_ref()?;
        pillar_top(badlands, x, z)
    }

    fn badlands_pillar<C: ChunkAccess + ?Sized>(
        &self,
        badlands: &BadlandsPillars,
        chunk: &mut C,
        x: i32,
        z: i32,
        start: i32,
    ) {
        let Some(top) = pillar_top(badlands, x, z) else {
            return;
        };
        if start > top {
            return;
        }
        let min_y = chunk.min_y();
        for y in (min_y..=top).rev() {
            let pos = BlockPos::new(x, y, z);
            if chunk.block_state(pos) == self.default_block {
                break;
            }
            if chunk.block_kind(pos) == BlockKind::Water {
                return;
            }
        }
        for y in (min_y..=top).rev() {
            let pos = BlockPos::new(x, y, z);
            if !chunk.block_kind(pos).is_air() {
                break;
            }
            chunk.set_block_state(pos, self.default_block);
        }
    }

    /// Ice extent of an iceberg in the column as `(top, bottom)` heights,
    /// both zero when the berg is too small to reach the surface.
    pub fn iceberg_extent(&self, biome: BiomeId, x: i32, z: i32) -> Option<(f64, f64)> {
        let icebergs = self.icebergs.as_ref()?;
        let (x_f, z_f) = (x as f64, z as f64);
        let size = (icebergs.surface.get(x_f, 0.0, z_f) * 8.25)
            .abs()
            .min(icebergs.pillar.get(x_f * 1.28, 0.0, z_f * 1.28) * 15.0);
        if size <= 1.8 {
            return None;
        }
        let roof = (icebergs.roof.get(x_f * 1.17, 0.0, z_f * 1.17) * 1.5).abs();
        let mut height = (size * size * 1.2).min((roof * 40.0).ceil() + 14.0);
        if self.biomes.temperature(biome, IVec3::new(x, self.sea_level, z), self.sea_level) > 0.1 {
            height -= 2.0;
        }
        let sea_level = self.sea_level as f64;
        if height > 2.0 {
            Some((height + sea_level, sea_level - height - 7.0))
        } else {
            Some((0.0, 0.0))
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn iceberg<C: ChunkAccess + ?Sized>(
        &self,
        icebergs: &Icebergs,
        min_surface_level: i32,
        biome: BiomeId,
        chunk: &mut C,
        x: i32,
        z: i32,
        start: i32,
    ) {
        let Some((top, bottom)) = self.iceberg_extent(biome, x, z) else {
            return;
        };
        let mut random = self.random.at(x, 0, z);
        let max_snow = 2 + random.next_i32_bound(4);
        let min_snow_y = self.sea_level + 18 + random.next_i32_bound(10);
        let (top_y, bottom_y) = (top as i32, bottom as i32);
        let mut snow = 0;
        for y in (min_surface_level..=start.max(top_y + 1)).rev() {
            let pos = BlockPos::new(x, y, z);
            let kind = chunk.block_kind(pos);
            let freeze = (kind.is_air() && y < top_y && random.next_f64() > 0.01)
                || (kind == BlockKind::Water
                    && y > bottom_y
                    && y < self.sea_level
                    && bottom != 0.0
                    && random.next_f64() > 0.15);
            if !freeze {
                continue;
            }
            if snow <= max_snow && y > min_snow_y {
                chunk.set_block_state(pos, icebergs.snow_block);
                snow += 1;
            } else {
                chunk.set_block_state(pos, icebergs.packed_ice);
            }
        }
    }
}

fn pillar_top(badlands: &BadlandsPillars, x: i32, z: i32) -> Option<i32> {
    let (x_f, z_f) = (x as f64, z as f64);
    let size = (badlands.surface.get(x_f, 0.0, z_f) * 8.25)
        .abs()
        .min(badlands.pillar.get(x_f * 0.2, 0.0, z_f * 0.2) * 15.0);
    if size <= 0.0 {
        return None;
    }
    let roof = (badlands.roof.get(x_f * 0.75, 0.0, z_f * 0.75) * 1.5).abs();
    let height = 64.0 + (size * size * 2.5).min((roof * 50.0).ceil() + 24.0);
    Some(height.floor() as i32)
}

/// Colour index per band: terracotta with thin seeded stripes of the other colours.
fn generate_bands<R: Random>(random: &mut R) -> [u8; CLAY_BAND_COUNT] {
    const PLAIN: u8 = 0;
    const ORANGE: u8 = 1;
    const YELLOW: u8 = 2;
    const BROWN: u8 = 3;
    const RED: u8 = 4;
    const WHITE: u8 = 5;
    const LIGHT_GRAY: u8 = 6;

    let mut bands = [PLAIN; CLAY_BAND_COUNT];
    let len = CLAY_BAND_COUNT as i32;
    let mut i = 0;
    while i < len {
        i += random.next_i32_bound(5) + 1;
        if i < len {
            bands[i as usize] = ORANGE;
        }
        i += 1;
    }
    make_bands(random, &mut bands, 1, YELLOW);
    make_bands(random, &mut bands, 2, BROWN);
    make_bands(random, &mut bands, 1, RED);

    let stripes = random.next_i32_between_inclusive(9, 15);
    let mut placed = 0;
    let mut k = 0;
    while placed < stripes && k < len {
        bands[k as usize] = WHITE;
        if k - 1 > 0 && random.next_bool() {
            bands[k as usize - 1] = LIGHT_GRAY;
        }
        if k + 1 < len && random.next_bool() {
            bands[k as usize + 1] = LIGHT_GRAY;
        }
        placed += 1;
        k += random.next_i32_bound(16) + 4;
    }
    bands
}

fn make_bands<R: Random>(random: &mut R, bands: &mut [u8; CLAY_BAND_COUNT], min_width: i32, colour: u8) {
    let count = random.next_i32_between_inclusive(6, 15);
    for _ in 0..count {
        let width = min_width + random.next_i32_bound(3);
        let start = random.next_i32_bound(CLAY_BAND_COUNT as i32) as usize;
        for band in bands.iter_mut().skip(start).take(width as usize) {
            *band = colour;
        }
    }
}

#[cfg(test)]
mod test {
    use crate::biome::{Biome, BiomeId, BiomeRegistry, BiomeSource, FixedBiomeSource};
    use crate::density_function::proto::DensityFunctionHolder;
    use crate::proto::{
        BlockState, ConditionSource, NoiseGeneratorSettings, NoiseSettings, ProtoNoiseRouter,
        SurfaceRule, VerticalAnchor,
    };
    use crate::random_state::RandomState;
    use crate::router::NoiseRouter;
    use crate::surface::{SurfaceSystem, generate_bands};
    use bevy_math::IVec3;
    use mcrs_engine::world::block::{BlockKind, BlockPos, BlockStateId, BlockStates};
    use mcrs_engine::world::chunk::heightmap::HeightmapKind;
    use mcrs_engine::world::chunk::{ChunkAccess, ChunkPos, ProtoChunk};
    use mcrs_random::xoroshiro::XoroshiroRandom;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        blocks: Arc<BlockStates>,
        biomes: Arc<BiomeRegistry>,
        router: NoiseRouter,
        system: SurfaceSystem,
    }

    fn block(name: &str) -> SurfaceRule {
        SurfaceRule::Block {
            result_state: BlockState::new(name),
        }
    }

    fn fixture(rule: SurfaceRule, min_y: i32, height: u32) -> Fixture {
        sea_fixture(rule, min_y, height, 63)
    }

    fn sea_fixture(rule: SurfaceRule, min_y: i32, height: u32, sea_level: i32) -> Fixture {
        let mut blocks = BlockStates::new();
        for name in ["stone", "grass_block", "dirt", "packed_ice", "snow_block"] {
            blocks.register(format!("minecraft:{name}"), BlockKind::Solid);
        }
        blocks.register("minecraft:water", BlockKind::Water);
        let blocks = Arc::new(blocks);

        let mut biomes = BiomeRegistry::new();
        biomes.register("plains", Biome { temperature: 0.8 });
        biomes.register("eroded_badlands", Biome { temperature: 2.0 });
        biomes.register("frozen_ocean", Biome { temperature: 0.0 });
        biomes.register("chilly_ocean", Biome { temperature: 0.12 });
        let biomes = Arc::new(biomes);

        let settings = NoiseGeneratorSettings {
            noise: NoiseSettings {
                min_y,
                height,
                size_horizontal: 1,
                size_vertical: 2,
            },
            default_block: BlockState::new("minecraft:stone"),
            default_fluid: BlockState::new("minecraft:water"),
            noise_router: ProtoNoiseRouter::uniform(DensityFunctionHolder::from(40.0)),
            surface_rule: rule,
            sea_level,
            aquifers_enabled: false,
            legacy_random_source: false,
            density_functions: BTreeMap::new(),
            noises: BTreeMap::new(),
            aquifer: Default::default(),
        };
        let mut state = RandomState::new(42, false, BTreeMap::new());
        let router =
            NoiseRouter::new(&settings.noise_router, &BTreeMap::new(), &mut state).unwrap();
        let system = SurfaceSystem::new(&settings, &mut state, &blocks, biomes.clone()).unwrap();
        Fixture {
            blocks,
            biomes,
            router,
            system,
        }
    }

    impl Fixture {
        fn id(&self, name: &str) -> BlockStateId {
            self.blocks.id(&format!("minecraft:{name}")).unwrap()
        }

        fn chunk(&self, pos: ChunkPos, min_y: i32, height: u32) -> ProtoChunk {
            ProtoChunk::new(pos, min_y, height, self.blocks.clone()).unwrap()
        }

        fn fill(&self, chunk: &mut ProtoChunk, from: i32, to: i32, name: &str) {
            let state = self.id(name);
            let (min_x, min_z) = (chunk.pos().min_block_x(), chunk.pos().min_block_z());
            for x in min_x..min_x + 16 {
                for z in min_z..min_z + 16 {
                    for y in from..=to {
                        chunk.set_block_state(BlockPos::new(x, y, z), state);
                    }
                }
            }
        }
    }

    struct CountingBiomeSource {
        biome: BiomeId,
        calls: AtomicUsize,
    }

    impl BiomeSource for CountingBiomeSource {
        fn biome(&self, _quart_x: i32, _quart_y: i32, _quart_z: i32) -> BiomeId {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.biome
        }
    }

    #[test]
    fn y_above_splits_the_column() {
        let rule = SurfaceRule::Sequence {
            sequence: vec![
                SurfaceRule::Condition {
                    if_true: Box::new(ConditionSource::YAbove {
                        anchor: VerticalAnchor::Absolute { absolute: 100 },
                        surface_depth_multiplier: 0,
                        add_stone_depth: false,
                    }),
                    then_run: Box::new(block("grass_block")),
                },
                block("dirt"),
            ],
        };
        let fixture = fixture(rule, 0, 160);
        let mut chunk = fixture.chunk(ChunkPos::new(0, 0), 0, 160);
        fixture.fill(&mut chunk, 0, 150, "stone");
        let plains = FixedBiomeSource::new(fixture.biomes.id("plains").unwrap());
        fixture.system.build_surface(&mut chunk, &plains, &fixture.router);

        let (grass, dirt) = (fixture.id("grass_block"), fixture.id("dirt"));
        for y in 0..=150 {
            let expected = if y >= 100 { grass } else { dirt };
            assert_eq!(chunk.block_state(BlockPos::new(5, y, 9)), expected, "y = {y}");
        }
        assert_eq!(chunk.block_state(BlockPos::new(5, 151, 9)), BlockStateId::AIR);
    }

    #[test]
    fn only_the_placeholder_is_repainted() {
        let fixture = fixture(block("grass_block"), 0, 32);
        let mut chunk = fixture.chunk(ChunkPos::new(1, 1), 0, 32);
        fixture.fill(&mut chunk, 0, 10, "stone");
        fixture.fill(&mut chunk, 11, 12, "dirt");
        fixture.fill(&mut chunk, 13, 20, "water");
        let plains = FixedBiomeSource::new(fixture.biomes.id("plains").unwrap());
        fixture.system.build_surface(&mut chunk, &plains, &fixture.router);
        let column = |y| chunk.block_state(BlockPos::new(20, y, 30));
        assert_eq!(column(5), fixture.id("grass_block"));
        assert_eq!(column(12), fixture.id("dirt"));
        assert_eq!(column(15), fixture.id("water"));
    }

    #[test]
    fn stone_depth_counts_from_the_nearest_opening() {
        let rule = SurfaceRule::Sequence {
            sequence: vec![
                SurfaceRule::Condition {
                    if_true: Box::new(ConditionSource::StoneDepth {
                        offset: 0,
                        add_surface_depth: false,
                        secondary_depth_range: 0,
                        surface_type: crate::proto::CaveSurface::Floor,
                    }),
                    then_run: Box::new(block("grass_block")),
                },
                SurfaceRule::Condition {
                    if_true: Box::new(ConditionSource::StoneDepth {
                        offset: 0,
                        add_surface_depth: false,
                        secondary_depth_range: 0,
                        surface_type: crate::proto::CaveSurface::Ceiling,
                    }),
                    then_run: Box::new(block("dirt")),
                },
            ],
        };
        let fixture = fixture(rule, 0, 32);
        let mut chunk = fixture.chunk(ChunkPos::new(0, 0), 0, 32);
        fixture.fill(&mut chunk, 1, 20, "stone");
        // cave from 8 to 10
        for y in 8..=10 {
            chunk.set_block_state(BlockPos::new(3, y, 3), BlockStateId::AIR);
        }
        let plains = FixedBiomeSource::new(fixture.biomes.id("plains").unwrap());
        fixture.system.build_surface(&mut chunk, &plains, &fixture.router);
        let column = |y| chunk.block_state(BlockPos::new(3, y, 3));
        let (grass, dirt, stone) = (fixture.id("grass_block"), fixture.id("dirt"), fixture.id("stone"));
        assert_eq!(column(20), grass);
        assert_eq!(column(19), stone);
        assert_eq!(column(15), stone);
        assert_eq!(column(12), stone);
        assert_eq!(column(11), dirt);
        assert_eq!(column(7), grass);
        assert_eq!(column(2), stone);
        assert_eq!(column(1), dirt);
    }

    #[test]
    fn block_conditions_are_evaluated_once_per_block() {
        let plains = || {
            Box::new(ConditionSource::Biome {
                biome_is: vec!["plains".to_owned()],
            })
        };
        let rule = SurfaceRule::Sequence {
            sequence: vec![
                SurfaceRule::Condition {
                    if_true: Box::new(ConditionSource::Not { invert: plains() }),
                    then_run: Box::new(block("dirt")),
                },
                SurfaceRule::Condition {
                    if_true: Box::new(ConditionSource::Biome {
                        biome_is: vec!["frozen_ocean".to_owned()],
                    }),
                    then_run: Box::new(block("dirt")),
                },
                SurfaceRule::Condition {
                    if_true: plains(),
                    then_run: Box::new(block("grass_block")),
                },
            ],
        };
        let fixture = fixture(rule, 0, 16);
        let mut chunk = fixture.chunk(ChunkPos::new(0, 0), 0, 16);
        fixture.fill(&mut chunk, 0, 3, "stone");
        let source = CountingBiomeSource {
            biome: fixture.biomes.id("plains").unwrap(),
            calls: AtomicUsize::new(0),
        };
        fixture.system.build_surface(&mut chunk, &source, &fixture.router);
        // one lookup per column for the extensions, one per placeholder block
        assert_eq!(source.calls.load(Ordering::Relaxed), 256 + 256 * 4);
        assert_eq!(chunk.block_state(BlockPos::new(0, 2, 0)), fixture.id("grass_block"));
    }

    #[test]
    fn badlands_pillars_rise_from_the_ground() {
        let fixture = fixture(block("stone"), 0, 160);
        let badlands = fixture.biomes.id("eroded_badlands").unwrap();
        let (x, z, top) = (0..256)
            .flat_map(|x| (0..256).map(move |z| (x, z)))
            .find_map(|(x, z)| fixture.system.badlands_pillar_top(x, z).map(|top| (x, z, top)))
            .unwrap();
        assert!(top >= 64);
        let mut chunk = fixture.chunk(ChunkPos::new(x >> 4, z >> 4), 0, 160);
        fixture.fill(&mut chunk, 0, 60, "stone");
        fixture
            .system
            .build_surface(&mut chunk, &FixedBiomeSource::new(badlands), &fixture.router);
        assert_eq!(chunk.height_at(HeightmapKind::WorldSurfaceWg, x, z), top.min(159));

        let mut plain = fixture.chunk(ChunkPos::new(x >> 4, z >> 4), 0, 160);
        fixture.fill(&mut plain, 0, 60, "stone");
        let plains = FixedBiomeSource::new(fixture.biomes.id("plains").unwrap());
        fixture.system.build_surface(&mut plain, &plains, &fixture.router);
        assert_eq!(plain.height_at(HeightmapKind::WorldSurfaceWg, x, z), 60);
    }

    #[test]
    fn iceberg_melt_follows_sea_level() {
        let high = fixture(block("stone"), 0, 128);
        let low = sea_fixture(block("stone"), -128, 256, -100);
        let chilly = high.biomes.id("chilly_ocean").unwrap();
        let mut checked = 0;
        for x in 0..128 {
            for z in 0..128 {
                let Some((top, _)) = high.system.iceberg_extent(chilly, x, z) else {
                    continue;
                };
                if top <= 0.0 {
                    continue;
                }
                let (low_top, _) = low.system.iceberg_extent(chilly, x, z).unwrap();
                assert!((top - 63.0 - (low_top + 100.0)).abs() < 1e-9);
                checked += 1;
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn icebergs_above_the_surface_are_not_scanned() {
        let rule = SurfaceRule::Condition {
            if_true: Box::new(ConditionSource::StoneDepth {
                offset: 1,
                add_surface_depth: false,
                secondary_depth_range: 0,
                surface_type: crate::proto::CaveSurface::Floor,
            }),
            then_run: Box::new(block("grass_block")),
        };
        let fixture = fixture(rule, 0, 128);
        let frozen = fixture.biomes.id("frozen_ocean").unwrap();
        let (x, z) = (0..256)
            .flat_map(|x| (0..256).map(move |z| (x, z)))
            .find(|&(x, z)| {
                fixture
                    .system
                    .iceberg_extent(frozen, x, z)
                    .is_some_and(|(top, _)| top >= 70.0)
            })
            .unwrap();
        let is_ice = |state: BlockStateId| {
            state == fixture.id("packed_ice") || state == fixture.id("snow_block")
        };

        // dry ground up to sea level, so the whole berg sits above it
        let mut chunk = fixture.chunk(ChunkPos::new(x >> 4, z >> 4), 0, 128);
        fixture.fill(&mut chunk, 0, 62, "stone");
        fixture
            .system
            .build_surface(&mut chunk, &FixedBiomeSource::new(frozen), &fixture.router);
        let column = |y| chunk.block_state(BlockPos::new(x, y, z));
        assert!((64..70).filter(|&y| is_ice(column(y))).count() >= 2);
        assert_eq!(column(62), fixture.id("grass_block"));
        assert_eq!(column(60), fixture.id("stone"));
    }

    #[test]
    fn icebergs_freeze_frozen_oceans() {
        let fixture = fixture(block("stone"), 0, 128);
        let frozen = fixture.biomes.id("frozen_ocean").unwrap();
        let (x, z) = (0..256)
            .flat_map(|x| (0..256).map(move |z| (x, z)))
            .find(|&(x, z)| {
                fixture
                    .system
                    .iceberg_extent(frozen, x, z)
                    .is_some_and(|(top, _)| top > 0.0)
            })
            .unwrap();
        let pos = ChunkPos::new(x >> 4, z >> 4);
        let is_ice = |state: BlockStateId| {
            state == fixture.id("packed_ice") || state == fixture.id("snow_block")
        };

        let mut chunk = fixture.chunk(pos, 0, 128);
        fixture.fill(&mut chunk, 0, 20, "stone");
        fixture.fill(&mut chunk, 21, 62, "water");
        fixture
            .system
            .build_surface(&mut chunk, &FixedBiomeSource::new(frozen), &fixture.router);
        assert!((21..128).any(|y| is_ice(chunk.block_state(BlockPos::new(x, y, z)))));

        let mut plain = fixture.chunk(pos, 0, 128);
        fixture.fill(&mut plain, 0, 20, "stone");
        fixture.fill(&mut plain, 21, 62, "water");
        let plains = FixedBiomeSource::new(fixture.biomes.id("plains").unwrap());
        fixture.system.build_surface(&mut plain, &plains, &fixture.router);
        assert!(!(21..128).any(|y| is_ice(plain.block_state(BlockPos::new(x, y, z)))));
    }

    #[test]
    fn surface_is_deterministic() {
        let fixture = fixture(block("grass_block"), 0, 32);
        assert_eq!(
            fixture.system.surface_depth(17, -40),
            fixture.system.surface_depth(17, -40)
        );
        assert_eq!(fixture.system.band(0, 70, 0), None);
        assert!(fixture.system.is_cold(
            fixture.biomes.id("frozen_ocean").unwrap(),
            IVec3::new(0, 64, 0)
        ));
    }

    #[test]
    fn clay_bands_are_mostly_terracotta() {
        let mut random = XoroshiroRandom::new(3);
        let bands = generate_bands(&mut random);
        assert_eq!(bands, generate_bands(&mut XoroshiroRandom::new(3)));
        let plain = bands.iter().filter(|&&band| band == 0).count();
        assert!(plain > 0 && plain < bands.len());
        assert!(bands.contains(&5));
    }
}
