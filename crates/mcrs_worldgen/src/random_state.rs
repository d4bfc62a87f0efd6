use crate::error::BuildError;
use crate::noise::normal_noise::NormalNoise;
use crate::noise::{NoiseParam, Noises};
use mcrs_random::legacy::LegacyRandom;
use mcrs_random::positional::PositionalRandom;
use mcrs_random::{Random, RandomSource};
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Adds the default namespace to bare ids.
pub(crate) fn qualified(id: &str) -> Cow<'_, str> {
    if id.contains(':') {
        Cow::Borrowed(id)
    } else {
        Cow::Owned(format!("minecraft:{id}"))
    }
}

/// Seed-derived randomness shared by everything built for one world.
///
/// Noises are instantiated once per id. The state is only mutated while a
/// generator is being built; afterwards it is read through shared references.
#[derive(Debug)]
pub struct RandomState {
    seed: u64,
    legacy: bool,
    random: PositionalRandom,
    aquifer_random: PositionalRandom,
    params: BTreeMap<String, NoiseParam>,
    noises: FxHashMap<String, Arc<NormalNoise>>,
}

impl RandomState {
    pub fn new(seed: u64, legacy: bool, params: BTreeMap<String, NoiseParam>) -> Self {
        let random = RandomSource::new(seed, legacy).fork_positional();
        let aquifer_random = random.from_hash_of("minecraft:aquifer").fork_positional();
        let params = params
            .into_iter()
            .map(|(id, param)| (qualified(&id).into_owned(), param))
            .collect();
        Self {
            seed,
            legacy,
            random,
            aquifer_random,
            params,
            noises: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    #[inline]
    pub fn random(&self) -> &PositionalRandom {
        &self.random
    }

    /// Jitter source for aquifer lattice points.
    #[inline]
    pub fn aquifer_random(&self) -> &PositionalRandom {
        &self.aquifer_random
    }

    /// An independent positional factory named after `name`.
    pub fn random_factory(&self, name: &str) -> PositionalRandom {
        self.random.from_hash_of(qualified(name)).fork_positional()
    }

    pub fn noise_param(&self, id: &str) -> Result<NoiseParam, BuildError> {
        let id = qualified(id);
        if let Some(param) = self.params.get(id.as_ref()) {
            return Ok(param.clone());
        }
        Noises::from_id(&id)
            .map(Noises::to_noise_param)
            .ok_or_else(|| BuildError::UnknownNoise(id.into_owned()))
    }

    /// The seeded noise registered under `id`, created on first use.
    pub fn noise(&mut self, id: &str) -> Result<Arc<NormalNoise>, BuildError> {
        let id = qualified(id);
        if let Some(noise) = self.noises.get(id.as_ref()) {
            return Ok(noise.clone());
        }
        let param = self.noise_param(&id)?;
        let noise = Arc::new(param.instantiate(&mut self.random.from_hash_of(&id)));
        debug!("instantiated noise {id} from octave {}", param.first_octave);
        self.noises.insert(id.into_owned(), noise.clone());
        Ok(noise)
    }

    /// Noise described inline by a density function rather than by id.
    pub fn inline_noise(&mut self, param: &NoiseParam) -> Arc<NormalNoise> {
        let key = format!("inline:{}:{:?}", param.first_octave, param.amplitudes);
        if let Some(noise) = self.noises.get(&key) {
            return noise.clone();
        }
        let noise = Arc::new(param.instantiate(&mut self.random.from_hash_of(&key)));
        self.noises.insert(key, noise.clone());
        noise
    }

    /// Noise for a density function leaf. Legacy worlds seed the climate noises
    /// from the world seed directly and disable the offset noise.
    pub fn density_noise(&mut self, id: &str) -> Result<Arc<NormalNoise>, BuildError> {
        let id = qualified(id);
        if !self.legacy {
            return self.noise(&id);
        }
        let key = format!("legacy:{id}");
        if let Some(noise) = self.noises.get(&key) {
            return Ok(noise.clone());
        }
        let noise = match id.as_ref() {
            "minecraft:temperature" => {
                NormalNoise::new(&mut LegacyRandom::new(self.seed), -7, vec![1.0, 1.0], true)
            }
            "minecraft:vegetation" => NormalNoise::new(
                &mut LegacyRandom::new(self.seed.wrapping_add(1)),
                -7,
                vec![1.0, 1.0],
                true,
            ),
            "minecraft:offset" => {
                NormalNoise::new(&mut self.random.from_hash_of(&id), 0, vec![0.0], false)
            }
            _ => return self.noise(&id),
        };
        let noise = Arc::new(noise);
        self.noises.insert(key, noise.clone());
        Ok(noise)
    }

    /// Number of distinct noises instantiated so far.
    pub fn noise_count(&self) -> usize {
        self.noises.len()
    }
}

#[cfg(test)]
mod test {
    use crate::error::BuildError;
    use crate::noise::NoiseParam;
    use crate::random_state::{RandomState, qualified};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[test]
    fn ids_are_namespaced() {
        assert_eq!(qualified("ridge"), "minecraft:ridge");
        assert_eq!(qualified("custom:ridge"), "custom:ridge");
    }

    #[test]
    fn noises_are_shared_per_id() {
        let mut state = RandomState::new(42, false, BTreeMap::new());
        let a = state.noise("minecraft:ridge").unwrap();
        let b = state.noise("ridge").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(state.noise_count(), 1);
        assert_eq!(
            state.noise("minecraft:missing").unwrap_err(),
            BuildError::UnknownNoise("minecraft:missing".into())
        );
    }

    #[test]
    fn overrides_take_precedence() {
        let mut params = BTreeMap::new();
        params.insert("ridge".to_owned(), NoiseParam::new(-2, vec![1.0]));
        let state = RandomState::new(1, false, params);
        assert_eq!(
            state.noise_param("minecraft:ridge").unwrap(),
            NoiseParam::new(-2, vec![1.0])
        );
    }

    #[test]
    fn legacy_offset_is_silent() {
        let mut state = RandomState::new(5, true, BTreeMap::new());
        let offset = state.density_noise("minecraft:offset").unwrap();
        assert_eq!(offset.get(12.0, 0.0, -40.0), 0.0);
        let temperature = state.density_noise("minecraft:temperature").unwrap();
        let plain = state.noise("minecraft:temperature").unwrap();
        assert!(!Arc::ptr_eq(&temperature, &plain));
    }

    #[test]
    fn same_seed_same_noise() {
        let mut a = RandomState::new(7, false, BTreeMap::new());
        let mut b = RandomState::new(7, false, BTreeMap::new());
        let na = a.noise("minecraft:erosion").unwrap();
        let nb = b.noise("minecraft:erosion").unwrap();
        assert_eq!(na.get(1.5, 2.5, -3.5), nb.get(1.5, 2.5, -3.5));
    }
}
