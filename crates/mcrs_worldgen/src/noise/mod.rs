pub mod blended_noise;
pub mod improved_noise;
pub mod normal_noise;
pub mod octave_perlin_noise;
pub mod simplex_noise;

use crate::noise::normal_noise::NormalNoise;
use mcrs_random::Random;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Octave layout of a [`NormalNoise`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseParam {
    #[serde(rename = "firstOctave")]
    pub first_octave: i32,
    pub amplitudes: Vec<f64>,
}

impl Default for NoiseParam {
    fn default() -> Self {
        Self {
            first_octave: -1,
            amplitudes: vec![1.0],
        }
    }
}

impl Eq for NoiseParam {}

// Bitwise, only used to spot identical subtrees.
impl Hash for NoiseParam {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.first_octave.hash(state);
        for amplitude in &self.amplitudes {
            amplitude.to_bits().hash(state);
        }
    }
}

impl NoiseParam {
    pub fn new(first_octave: i32, amplitudes: Vec<f64>) -> Self {
        Self {
            first_octave,
            amplitudes,
        }
    }

    pub fn instantiate<R: Random>(&self, random: &mut R) -> NormalNoise {
        NormalNoise::new(random, self.first_octave, self.amplitudes.clone(), false)
    }
}

impl From<Noises> for NoiseParam {
    #[inline]
    fn from(noise: Noises) -> Self {
        noise.to_noise_param()
    }
}

macro_rules! noises {
    ($($name:ident => ($id:literal, $first:literal, [$($amp:expr),* $(,)?]),)*) => {
        /// Built-in noise parameters, addressable by their namespaced id.
        #[derive(Clone, Debug, Eq, PartialEq, Hash, Copy, Serialize, Deserialize)]
        pub enum Noises {
            $(#[serde(rename = $id)] $name,)*
        }

        impl Noises {
            pub const ALL: &'static [Noises] = &[$(Noises::$name,)*];

            pub fn id(self) -> &'static str {
                match self {
                    $(Noises::$name => $id,)*
                }
            }

            pub fn to_noise_param(self) -> NoiseParam {
                match self {
                    $(Noises::$name => NoiseParam::new($first, vec![$($amp),*]),)*
                }
            }
        }
    };
}

noises! {
    Temperature => ("minecraft:temperature", -10, [1.5, 0.0, 1.0, 0.0, 0.0, 0.0]),
    Vegetation => ("minecraft:vegetation", -8, [1.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
    Continentalness => ("minecraft:continentalness", -9, [1.0, 1.0, 2.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0]),
    Erosion => ("minecraft:erosion", -9, [1.0, 1.0, 0.0, 1.0, 1.0]),
    TemperatureLarge => ("minecraft:temperature_large", -12, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
    VegetationLarge => ("minecraft:vegetation_large", -10, [1.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
    ContinentalnessLarge => ("minecraft:continentalness_large", -11, [1.0, 1.0, 2.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0]),
    ErosionLarge => ("minecraft:erosion_large", -11, [1.0, 1.0, 0.0, 1.0, 1.0]),
    Ridge => ("minecraft:ridge", -7, [1.0, 2.0, 1.0, 0.0, 0.0, 0.0]),
    Offset => ("minecraft:offset", -3, [1.0, 1.0, 1.0, 0.0]),
    AquiferBarrier => ("minecraft:aquifer_barrier", -3, [1.0]),
    AquiferFluidLevelFloodedness => ("minecraft:aquifer_fluid_level_floodedness", -7, [1.0]),
    AquiferLava => ("minecraft:aquifer_lava", -1, [1.0]),
    AquiferFluidLevelSpread => ("minecraft:aquifer_fluid_level_spread", -5, [1.0]),
    Pillar => ("minecraft:pillar", -7, [1.0, 1.0]),
    PillarRareness => ("minecraft:pillar_rareness", -8, [1.0]),
    PillarThickness => ("minecraft:pillar_thickness", -8, [1.0]),
    Spaghetti2D => ("minecraft:spaghetti_2d", -7, [1.0]),
    Spaghetti2DElevation => ("minecraft:spaghetti_2d_elevation", -8, [1.0]),
    Spaghetti2DModulator => ("minecraft:spaghetti_2d_modulator", -11, [1.0]),
    Spaghetti2DThickness => ("minecraft:spaghetti_2d_thickness", -11, [1.0]),
    Spaghetti3D1 => ("minecraft:spaghetti_3d_1", -7, [1.0]),
    Spaghetti3D2 => ("minecraft:spaghetti_3d_2", -7, [1.0]),
    Spaghetti3DRarity => ("minecraft:spaghetti_3d_rarity", -11, [1.0]),
    Spaghetti3DThickness => ("minecraft:spaghetti_3d_thickness", -8, [1.0]),
    SpaghettiRoughness => ("minecraft:spaghetti_roughness", -5, [1.0]),
    SpaghettiRoughnessModulator => ("minecraft:spaghetti_roughness_modulator", -8, [1.0]),
    CaveEntrance => ("minecraft:cave_entrance", -7, [0.4, 0.5, 1.0]),
    CaveLayer => ("minecraft:cave_layer", -8, [1.0]),
    CaveCheese => ("minecraft:cave_cheese", -8, [0.5, 1.0, 2.0, 1.0, 2.0, 1.0, 0.0, 2.0, 0.0]),
    OreVeininess => ("minecraft:ore_veininess", -8, [1.0]),
    OreVeinA => ("minecraft:ore_vein_a", -7, [1.0]),
    OreVeinB => ("minecraft:ore_vein_b", -7, [1.0]),
    OreGap => ("minecraft:ore_gap", -5, [1.0]),
    Noodle => ("minecraft:noodle", -8, [1.0]),
    NoodleThickness => ("minecraft:noodle_thickness", -8, [1.0]),
    NoodleRidgeA => ("minecraft:noodle_ridge_a", -7, [1.0]),
    NoodleRidgeB => ("minecraft:noodle_ridge_b", -7, [1.0]),
    Jagged => ("minecraft:jagged", -16, [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]),
    Surface => ("minecraft:surface", -6, [1.0, 1.0, 1.0]),
    SurfaceSecondary => ("minecraft:surface_secondary", -6, [1.0, 1.0, 0.0, 1.0]),
    ClayBandsOffset => ("minecraft:clay_bands_offset", -8, [1.0]),
    BadlandsPillar => ("minecraft:badlands_pillar", -2, [1.0, 1.0, 1.0, 1.0]),
    BadlandsPillarRoof => ("minecraft:badlands_pillar_roof", -8, [1.0]),
    BadlandsSurface => ("minecraft:badlands_surface", -6, [1.0, 1.0, 1.0]),
    IcebergPillar => ("minecraft:iceberg_pillar", -6, [1.0, 1.0, 1.0, 1.0]),
    IcebergPillarRoof => ("minecraft:iceberg_pillar_roof", -3, [1.0]),
    IcebergSurface => ("minecraft:iceberg_surface", -6, [1.0, 1.0, 1.0]),
    SurfaceSwamp => ("minecraft:surface_swamp", -2, [1.0]),
    Calcite => ("minecraft:calcite", -9, [1.0, 1.0, 1.0, 1.0]),
    Gravel => ("minecraft:gravel", -8, [1.0, 1.0, 1.0, 1.0]),
    PowderSnow => ("minecraft:powder_snow", -6, [1.0, 1.0, 1.0, 1.0]),
    PackedIce => ("minecraft:packed_ice", -7, [1.0, 1.0, 1.0, 1.0]),
    Ice => ("minecraft:ice", -4, [1.0, 1.0, 1.0, 1.0]),}

impl Noises {
    pub fn from_id(id: &str) -> Option<Noises> {
        Noises::ALL.iter().copied().find(|noise| noise.id() == id)
    }
}
