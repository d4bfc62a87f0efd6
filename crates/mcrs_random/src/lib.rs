pub mod legacy;
pub mod positional;
pub mod xoroshiro;

use crate::legacy::LegacyRandom;
use crate::positional::PositionalRandom;
use crate::xoroshiro::XoroshiroRandom;
use bevy_math::IVec3;
use rand_xoshiro::rand_core::{Rng, TryRng};
use std::convert::Infallible;

pub trait Random: Rng + Clone {
    fn is_legacy(&self) -> bool;

    fn next_bool(&mut self) -> bool;

    fn next_i32(&mut self) -> i32 {
        self.next_u32() as i32
    }

    fn next_u32_bound(&mut self, bound: u32) -> u32;

    fn next_i32_bound(&mut self, bound: i32) -> i32 {
        self.next_u32_bound(bound as u32) as i32
    }

    /// Uniform in `min..=max`.
    fn next_i32_between_inclusive(&mut self, min: i32, max: i32) -> i32 {
        min + self.next_i32_bound(max - min + 1)
    }

    fn next_i64(&mut self) -> i64 {
        self.next_u64() as i64
    }

    fn next_f32(&mut self) -> f32;

    fn next_f64(&mut self) -> f64;

    fn consume_count(&mut self, count: usize) {
        for _ in 0..count {
            self.next_u32();
        }
    }

    fn fork(&mut self) -> Self;

    /// Splits off a factory that derives independent randoms per position or name.
    fn fork_positional(&mut self) -> PositionalRandom;
}

/// Seed of a block position, shared by every positional factory.
pub fn block_pos_seed<T>(pos: T) -> i64
where
    T: Into<IVec3>,
{
    let pos = pos.into();
    let mut l = (pos.x.wrapping_mul(3129871) as i64)
        ^ (pos.z as i64).wrapping_mul(116129781)
        ^ (pos.y as i64);
    l = l
        .wrapping_mul(l)
        .wrapping_mul(42317861)
        .wrapping_add(l.wrapping_mul(11));
    l >> 16
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RandomSource {
    Legacy(LegacyRandom),
    Xoroshiro(XoroshiroRandom),
}

impl RandomSource {
    pub fn new(seed: u64, legacy: bool) -> Self {
        if legacy {
            RandomSource::Legacy(LegacyRandom::new(seed))
        } else {
            RandomSource::Xoroshiro(XoroshiroRandom::new(seed))
        }
    }
}

impl From<LegacyRandom> for RandomSource {
    fn from(random: LegacyRandom) -> Self {
        RandomSource::Legacy(random)
    }
}

impl From<XoroshiroRandom> for RandomSource {
    fn from(random: XoroshiroRandom) -> Self {
        RandomSource::Xoroshiro(random)
    }
}

impl TryRng for RandomSource {
    type Error = Infallible;

    fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
        Ok(match self {
            RandomSource::Legacy(random) => random.next_u32(),
            RandomSource::Xoroshiro(random) => random.next_u32(),
        })
    }

    fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
        Ok(match self {
            RandomSource::Legacy(random) => random.next_u64(),
            RandomSource::Xoroshiro(random) => random.next_u64(),
        })
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Self::Error> {
        match self {
            RandomSource::Legacy(random) => random.fill_bytes(dest),
            RandomSource::Xoroshiro(random) => random.fill_bytes(dest),
        }
        Ok(())
    }
}

impl Random for RandomSource {
    fn is_legacy(&self) -> bool {
        matches!(self, RandomSource::Legacy(_))
    }

    fn next_bool(&mut self) -> bool {
        match self {
            RandomSource::Legacy(random) => random.next_bool(),
            RandomSource::Xoroshiro(random) => random.next_bool(),
        }
    }

    fn next_u32_bound(&mut self, bound: u32) -> u32 {
        match self {
            RandomSource::Legacy(random) => random.next_u32_bound(bound),
            RandomSource::Xoroshiro(random) => random.next_u32_bound(bound),
        }
    }

    fn next_f32(&mut self) -> f32 {
        match self {
            RandomSource::Legacy(random) => random.next_f32(),
            RandomSource::Xoroshiro(random) => random.next_f32(),
        }
    }

    fn next_f64(&mut self) -> f64 {
        match self {
            RandomSource::Legacy(random) => random.next_f64(),
            RandomSource::Xoroshiro(random) => random.next_f64(),
        }
    }

    fn fork(&mut self) -> Self {
        match self {
            RandomSource::Legacy(random) => RandomSource::Legacy(random.fork()),
            RandomSource::Xoroshiro(random) => RandomSource::Xoroshiro(random.fork()),
        }
    }

    fn fork_positional(&mut self) -> PositionalRandom {
        match self {
            RandomSource::Legacy(random) => random.fork_positional(),
            RandomSource::Xoroshiro(random) => random.fork_positional(),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{Random, RandomSource, block_pos_seed};
    use bevy_math::IVec3;

    #[test]
    fn block_pos_seed_is_position_sensitive() {
        assert_eq!(block_pos_seed(IVec3::ZERO), 0);
        assert_ne!(
            block_pos_seed(IVec3::new(1, 0, 0)),
            block_pos_seed(IVec3::new(0, 0, 1))
        );
        assert_eq!(
            block_pos_seed(IVec3::new(-30, 64, 12)),
            block_pos_seed(IVec3::new(-30, 64, 12))
        );
    }

    #[test]
    fn between_inclusive_stays_in_range() {
        let mut random = RandomSource::new(42, false);
        for _ in 0..1000 {
            let v = random.next_i32_between_inclusive(9, 15);
            assert!((9..=15).contains(&v));
        }
    }
}
