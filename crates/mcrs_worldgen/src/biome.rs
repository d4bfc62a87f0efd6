use crate::climate::{ParamPoint, RTree, TargetPoint};
use crate::error::BuildError;
use crate::noise::simplex_noise::SimplexNoise;
use crate::random_state::qualified;
use crate::router::{NoiseRouter, RouterOutput};
use bevy_math::IVec3;
use indexmap::IndexMap;
use mcrs_random::legacy::LegacyRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Index of a biome in its [`BiomeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BiomeId(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Biome {
    pub temperature: f32,
}

/// Biomes by name, in registration order.
#[derive(Debug, Clone)]
pub struct BiomeRegistry {
    biomes: IndexMap<String, Biome>,
    temperature_noise: SimplexNoise,
}

impl Default for BiomeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BiomeRegistry {
    pub fn new() -> Self {
        Self {
            biomes: IndexMap::new(),
            temperature_noise: SimplexNoise::from_random(&mut LegacyRandom::new(1234)),
        }
    }

    /// Registers `name`, replacing the data of an existing entry.
    pub fn register(&mut self, name: &str, biome: Biome) -> BiomeId {
        let (index, _) = self.biomes.insert_full(qualified(name).into_owned(), biome);
        BiomeId(index as u16)
    }

    pub fn id(&self, name: &str) -> Option<BiomeId> {
        self.biomes
            .get_index_of(qualified(name).as_ref())
            .map(|index| BiomeId(index as u16))
    }

    pub fn resolve(&self, name: &str) -> Result<BiomeId, BuildError> {
        self.id(name)
            .ok_or_else(|| BuildError::UnknownBiome(name.to_owned()))
    }

    pub fn name(&self, id: BiomeId) -> Option<&str> {
        self.biomes
            .get_index(id.0 as usize)
            .map(|(name, _)| name.as_str())
    }

    pub fn get(&self, id: BiomeId) -> Option<&Biome> {
        self.biomes.get_index(id.0 as usize).map(|(_, biome)| biome)
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    /// Base temperature, cooling off with height above `sea_level + 17`.
    pub fn temperature(&self, id: BiomeId, pos: IVec3, sea_level: i32) -> f32 {
        let base = self.get(id).map_or(0.5, |biome| biome.temperature);
        let snow_line = sea_level + 17;
        if pos.y > snow_line {
            let noise = (self
                .temperature_noise
                .get_value((pos.x as f32 / 8.0) as f64, (pos.z as f32 / 8.0) as f64)
                * 8.0) as f32;
            base - (noise + pos.y as f32 - snow_line as f32) * 0.05 / 40.0
        } else {
            base
        }
    }

    pub fn cold_enough_to_snow(&self, id: BiomeId, pos: IVec3, sea_level: i32) -> bool {
        self.temperature(id, pos, sea_level) < 0.15
    }
}

/// Biome lookup by quart position.
pub trait BiomeSource: Send + Sync {
    fn biome(&self, quart_x: i32, quart_y: i32, quart_z: i32) -> BiomeId;

    fn biome_at_block(&self, pos: IVec3) -> BiomeId {
        self.biome(pos.x >> 2, pos.y >> 2, pos.z >> 2)
    }
}

pub struct FixedBiomeSource {
    biome: BiomeId,
}

impl FixedBiomeSource {
    pub fn new(biome: BiomeId) -> Self {
        Self { biome }
    }
}

impl BiomeSource for FixedBiomeSource {
    fn biome(&self, _quart_x: i32, _quart_y: i32, _quart_z: i32) -> BiomeId {
        self.biome
    }
}

/// Picks the biome whose climate box is nearest to the router's climate outputs.
pub struct MultiNoiseBiomeSource {
    router: Arc<NoiseRouter>,
    tree: RTree<BiomeId>,
}

impl MultiNoiseBiomeSource {
    pub fn new(router: Arc<NoiseRouter>, tree: RTree<BiomeId>) -> Self {
        Self { router, tree }
    }

    pub fn climate(&self, quart_x: i32, quart_y: i32, quart_z: i32) -> TargetPoint {
        let pos = IVec3::new(quart_x << 2, quart_y << 2, quart_z << 2);
        let sample = |output| self.router.compute(output, pos);
        TargetPoint::new(
            sample(RouterOutput::Temperature),
            sample(RouterOutput::Vegetation),
            sample(RouterOutput::Continents),
            sample(RouterOutput::Erosion),
            sample(RouterOutput::Depth),
            sample(RouterOutput::Ridges),
        )
    }
}

impl BiomeSource for MultiNoiseBiomeSource {
    fn biome(&self, quart_x: i32, quart_y: i32, quart_z: i32) -> BiomeId {
        *self.tree.search(self.climate(quart_x, quart_y, quart_z))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateEntry {
    pub biome: String,
    pub parameters: ParamPoint,
}

/// Declarative biome source, bound once the router exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BiomeSourceSettings {
    #[serde(rename = "minecraft:fixed", alias = "fixed")]
    Fixed { biome: String },
    #[serde(rename = "minecraft:multi_noise", alias = "multi_noise")]
    MultiNoise { biomes: Vec<ClimateEntry> },
}

impl BiomeSourceSettings {
    pub fn build(
        &self,
        router: Arc<NoiseRouter>,
        registry: &BiomeRegistry,
    ) -> Result<Arc<dyn BiomeSource>, BuildError> {
        match self {
            BiomeSourceSettings::Fixed { biome } => {
                Ok(Arc::new(FixedBiomeSource::new(registry.resolve(biome)?)))
            }
            BiomeSourceSettings::MultiNoise { biomes } => {
                let points = biomes
                    .iter()
                    .map(|entry| Ok((entry.parameters, registry.resolve(&entry.biome)?)))
                    .collect::<Result<Vec<_>, BuildError>>()?;
                let tree = RTree::new(points).ok_or(BuildError::EmptyBiomeSource)?;
                Ok(Arc::new(MultiNoiseBiomeSource::new(router, tree)))
            }
        }
    }
}
