use crate::aquifer::AquiferSettings;
use crate::density_function::proto::DensityFunctionHolder;
use crate::error::BuildError;
use crate::noise::NoiseParam;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarative description of a noise based terrain generator.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct NoiseGeneratorSettings {
    pub noise: NoiseSettings,
    pub default_block: BlockState,
    pub default_fluid: BlockState,
    pub noise_router: ProtoNoiseRouter,
    pub surface_rule: SurfaceRule,
    pub sea_level: i32,
    pub aquifers_enabled: bool,
    pub legacy_random_source: bool,
    /// Named functions that router entries may reference.
    #[serde(default)]
    pub density_functions: BTreeMap<String, DensityFunctionHolder>,
    /// Noise parameters overriding or extending the built-in table.
    #[serde(default)]
    pub noises: BTreeMap<String, NoiseParam>,
    #[serde(default)]
    pub aquifer: AquiferSettings,
}

#[derive(Hash, PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NoiseSettings {
    pub min_y: i32,
    pub height: u32,
    pub size_horizontal: u8,
    pub size_vertical: u8,
}

impl NoiseSettings {
    #[inline]
    pub fn cell_width(&self) -> i32 {
        self.size_horizontal as i32 * 4
    }

    #[inline]
    pub fn cell_height(&self) -> i32 {
        self.size_vertical as i32 * 4
    }

    #[inline]
    pub fn max_y(&self) -> i32 {
        self.min_y + self.height as i32
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        let width = self.cell_width();
        let height = self.cell_height();
        if width == 0 || height == 0 || 16 % width != 0 {
            return Err(BuildError::InvalidCellSize { width, height });
        }
        if self.height == 0
            || self.height as i32 % height != 0
            || self.min_y.rem_euclid(height) != 0
        {
            return Err(BuildError::InvalidHeight {
                min_y: self.min_y,
                height: self.height as i32,
            });
        }
        Ok(())
    }
}

/// Named outputs of the density graph before seed binding.
#[derive(Hash, PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct ProtoNoiseRouter {
    pub barrier: DensityFunctionHolder,
    pub fluid_level_floodedness: DensityFunctionHolder,
    pub fluid_level_spread: DensityFunctionHolder,
    pub lava: DensityFunctionHolder,
    pub temperature: DensityFunctionHolder,
    pub vegetation: DensityFunctionHolder,
    pub continents: DensityFunctionHolder,
    pub erosion: DensityFunctionHolder,
    pub depth: DensityFunctionHolder,
    pub ridges: DensityFunctionHolder,
    pub preliminary_surface_level: DensityFunctionHolder,
    pub final_density: DensityFunctionHolder,
}

impl ProtoNoiseRouter {
    /// Every output set to the same function.
    pub fn uniform(holder: DensityFunctionHolder) -> Self {
        Self {
            barrier: holder.clone(),
            fluid_level_floodedness: holder.clone(),
            fluid_level_spread: holder.clone(),
            lava: holder.clone(),
            temperature: holder.clone(),
            vegetation: holder.clone(),
            continents: holder.clone(),
            erosion: holder.clone(),
            depth: holder.clone(),
            ridges: holder.clone(),
            preliminary_surface_level: holder.clone(),
            final_density: holder,
        }
    }

    pub fn outputs(&self) -> [&DensityFunctionHolder; 12] {
        [
            &self.barrier,
            &self.fluid_level_floodedness,
            &self.fluid_level_spread,
            &self.lava,
            &self.temperature,
            &self.vegetation,
            &self.continents,
            &self.erosion,
            &self.depth,
            &self.ridges,
            &self.preliminary_surface_level,
            &self.final_density,
        ]
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SurfaceRule {
    #[serde(rename = "minecraft:bandlands", alias = "bandlands")]
    Bandlands,
    #[serde(rename = "minecraft:block", alias = "block")]
    Block { result_state: BlockState },
    #[serde(rename = "minecraft:sequence", alias = "sequence")]
    Sequence { sequence: Vec<SurfaceRule> },
    #[serde(rename = "minecraft:condition", alias = "condition")]
    Condition {
        if_true: Box<ConditionSource>,
        then_run: Box<SurfaceRule>,
    },
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConditionSource {
    #[serde(rename = "minecraft:biome", alias = "biome")]
    Biome { biome_is: Vec<String> },
    #[serde(rename = "minecraft:noise_threshold", alias = "noise_threshold")]
    NoiseThreshold {
        noise: String,
        min_threshold: f64,
        max_threshold: f64,
    },
    #[serde(rename = "minecraft:vertical_gradient", alias = "vertical_gradient")]
    VerticalGradient {
        random_name: String,
        true_at_and_below: VerticalAnchor,
        false_at_and_above: VerticalAnchor,
    },
    #[serde(rename = "minecraft:y_above", alias = "y_above")]
    YAbove {
        anchor: VerticalAnchor,
        surface_depth_multiplier: i32,
        add_stone_depth: bool,
    },
    #[serde(rename = "minecraft:water", alias = "water")]
    Water {
        offset: i32,
        surface_depth_multiplier: i32,
        add_stone_depth: bool,
    },
    #[serde(rename = "minecraft:temperature", alias = "temperature")]
    Temperature,
    #[serde(rename = "minecraft:steep", alias = "steep")]
    Steep,
    #[serde(rename = "minecraft:not", alias = "not")]
    Not { invert: Box<ConditionSource> },
    #[serde(rename = "minecraft:hole", alias = "hole")]
    Hole,
    #[serde(
        rename = "minecraft:above_preliminary_surface",
        alias = "above_preliminary_surface"
    )]
    AbovePreliminarySurface,
    #[serde(rename = "minecraft:stone_depth", alias = "stone_depth")]
    StoneDepth {
        offset: i32,
        add_surface_depth: bool,
        secondary_depth_range: i32,
        surface_type: CaveSurface,
    },
}

#[derive(Hash, PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerticalAnchor {
    Absolute { absolute: i32 },
    AboveBottom { above_bottom: i32 },
    BelowTop { below_top: i32 },
}

impl VerticalAnchor {
    pub fn resolve(&self, min_y: i32, height: i32) -> i32 {
        match *self {
            VerticalAnchor::Absolute { absolute } => absolute,
            VerticalAnchor::AboveBottom { above_bottom } => min_y + above_bottom,
            VerticalAnchor::BelowTop { below_top } => min_y + height - 1 - below_top,
        }
    }
}

#[derive(Hash, PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaveSurface {
    Ceiling,
    Floor,
}

#[derive(Hash, PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct BlockState {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Properties", default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, String>>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: None,
        }
    }
}

/// A `[min, max]` pair that also accepts a bare value or `{min, max}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "Either<I, Either<[I; 2], InternalInterval<I>>>")]
#[serde(into = "Either<I, Either<[I; 2], InternalInterval<I>>>")]
pub struct Interval<I>
where
    I: Clone + PartialEq,
{
    pub(crate) min: I,
    pub(crate) max: I,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
struct InternalInterval<I> {
    min: I,
    max: I,
}

impl<I: Clone + PartialEq> From<Either<I, Either<[I; 2], InternalInterval<I>>>> for Interval<I> {
    fn from(value: Either<I, Either<[I; 2], InternalInterval<I>>>) -> Self {
        match value {
            Either::Left(i) => Interval {
                min: i.clone(),
                max: i,
            },
            Either::Right(Either::Left([min, max])) => Interval { min, max },
            Either::Right(Either::Right(i)) => Interval {
                min: i.min,
                max: i.max,
            },
        }
    }
}

impl<I: Clone + PartialEq> From<Interval<I>> for Either<I, Either<[I; 2], InternalInterval<I>>> {
    fn from(value: Interval<I>) -> Self {
        if value.min == value.max {
            Either::Left(value.min)
        } else {
            Either::Right(Either::Left([value.min, value.max]))
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

#[cfg(test)]
mod test {
    use crate::proto::{
        CaveSurface, ConditionSource, Interval, NoiseSettings, SurfaceRule, VerticalAnchor,
    };

    #[test]
    fn vertical_anchor_resolves() {
        let anchors: Vec<VerticalAnchor> = serde_json::from_str(
            r#"[{"absolute": 10}, {"above_bottom": 5}, {"below_top": 0}]"#,
        )
        .unwrap();
        let resolved: Vec<i32> = anchors.iter().map(|a| a.resolve(-64, 384)).collect();
        assert_eq!(resolved, vec![10, -59, 319]);
    }

    #[test]
    fn surface_rule_from_json() {
        let rule: SurfaceRule = serde_json::from_str(
            r#"{
                "type": "minecraft:condition",
                "if_true": {
                    "type": "minecraft:stone_depth",
                    "offset": 0,
                    "add_surface_depth": false,
                    "secondary_depth_range": 0,
                    "surface_type": "floor"
                },
                "then_run": {"type": "minecraft:block", "result_state": {"Name": "minecraft:grass_block"}}
            }"#,
        )
        .unwrap();
        let SurfaceRule::Condition { if_true, .. } = rule else {
            panic!("expected condition");
        };
        assert_eq!(
            *if_true,
            ConditionSource::StoneDepth {
                offset: 0,
                add_surface_depth: false,
                secondary_depth_range: 0,
                surface_type: CaveSurface::Floor,
            }
        );
    }

    #[test]
    fn interval_forms() {
        let single: Interval<f64> = serde_json::from_str("0.5").unwrap();
        let pair: Interval<f64> = serde_json::from_str("[-1.0, 1.0]").unwrap();
        let object: Interval<f64> = serde_json::from_str(r#"{"min": 0.0, "max": 2.0}"#).unwrap();
        assert_eq!((single.min, single.max), (0.5, 0.5));
        assert_eq!((pair.min, pair.max), (-1.0, 1.0));
        assert_eq!((object.min, object.max), (0.0, 2.0));
    }

    #[test]
    fn cell_geometry_validation() {
        let good = NoiseSettings {
            min_y: -64,
            height: 384,
            size_horizontal: 1,
            size_vertical: 2,
        };
        assert!(good.validate().is_ok());
        assert_eq!((good.cell_width(), good.cell_height()), (4, 8));
        let bad = NoiseSettings { height: 100, ..good };
        assert!(bad.validate().is_err());
        let wide = NoiseSettings {
            size_horizontal: 3,
            ..good
        };
        assert!(wide.validate().is_err());
    }
}
