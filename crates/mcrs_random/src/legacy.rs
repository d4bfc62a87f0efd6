use crate::positional::{LegacyPositionalRandom, PositionalRandom};
use crate::Random;
use rand_xoshiro::rand_core::{Rng, TryRng};
use std::convert::Infallible;

const MODULUS_BITS: usize = 48;
const MODULUS_MASK: u64 = 281474976710655;
const MULTIPLIER: u64 = 25214903917;
const INCREMENT: u64 = 11;
const F32_MULTIPLIER: f32 = 1.0 / (1u64 << 24) as f32;
const F64_MULTIPLIER: f64 = 1.0 / (1u64 << 53) as f64;

/// The 48-bit linear congruential generator of `java.util.Random`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRandom {
    pub seed: u64,
}

impl LegacyRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            seed: (seed ^ MULTIPLIER) & MODULUS_MASK,
        }
    }

    #[inline]
    fn advance(&mut self) {
        self.seed = self.seed.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT) & MODULUS_MASK;
    }

    fn next_bits(&mut self, bits: usize) -> u64 {
        self.advance();
        self.seed >> (MODULUS_BITS - bits)
    }

    /// Signed 32-bit draw, sign-extended like Java's `next(32)`.
    fn next_signed(&mut self) -> i64 {
        self.next_bits(32) as u32 as i32 as i64
    }
}

impl TryRng for LegacyRandom {
    type Error = Infallible;

    fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
        Ok(self.next_bits(32) as u32)
    }

    fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
        let hi = self.next_signed();
        let lo = self.next_signed();
        Ok((hi << 32).wrapping_add(lo) as u64)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Self::Error> {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
        Ok(())
    }
}

impl Random for LegacyRandom {
    fn is_legacy(&self) -> bool {
        true
    }

    fn next_bool(&mut self) -> bool {
        self.next_bits(1) != 0
    }

    fn next_u32_bound(&mut self, bound: u32) -> u32 {
        if bound.is_power_of_two() {
            let n = self.next_bits(31);
            return ((bound as u64).wrapping_mul(n) >> 31) as u32;
        }
        let bound = bound as i32;
        loop {
            let bits = self.next_bits(31) as i32;
            let value = bits % bound;
            // rejection on i32 overflow, matching the reference generator
            if bits.wrapping_sub(value).wrapping_add(bound - 1) >= 0 {
                return value as u32;
            }
        }
    }

    fn next_f32(&mut self) -> f32 {
        self.next_bits(24) as f32 * F32_MULTIPLIER
    }

    fn next_f64(&mut self) -> f64 {
        let hi = self.next_bits(26);
        let lo = self.next_bits(27);
        ((hi << 27) + lo) as f64 * F64_MULTIPLIER
    }

    fn fork(&mut self) -> Self {
        LegacyRandom::new(self.next_u64())
    }

    fn fork_positional(&mut self) -> PositionalRandom {
        PositionalRandom::Legacy(LegacyPositionalRandom::new(self.next_i64()))
    }
}

#[cfg(test)]
mod test {
    use crate::Random;
    use crate::legacy::LegacyRandom;

    #[test]
    fn next_i32() {
        let mut random = LegacyRandom::new(123);
        let expected = [
            -1188957731,
            1018954901,
            -39088943,
            1295249578,
            1087885590,
            -1829099982,
            -1680189627,
            1111887674,
            -833784125,
            -1621910390,
        ];
        for e in expected {
            assert_eq!(random.next_i32(), e);
        }
    }

    #[test]
    fn next_i32_bound() {
        let mut random = LegacyRandom::new(123);
        assert_eq!(random.next_i32_bound(256), 185);
        assert_eq!(random.next_i32_bound(255), 200);
        assert_eq!(random.next_i32_bound(254), 74);
    }

    #[test]
    fn next_f32() {
        let mut random = LegacyRandom::new(123);
        let expected = [
            0.72317415, 0.23724389, 0.99089885, 0.30157375, 0.2532931, 0.57412946, 0.60880035,
            0.2588815, 0.80586946, 0.6223695,
        ];
        for e in expected {
            assert_eq!(random.next_f32(), e);
        }
    }

    #[test]
    fn next_f64() {
        let mut random = LegacyRandom::new(123);
        let expected = [
            0.7231742029971469,
            0.9908988967772393,
            0.25329310557439133,
            0.6088003703785169,
            0.8058695140834087,
            0.8754127852514174,
            0.7160485112997248,
            0.07191702249367171,
            0.7962609718390335,
            0.5787169373422367,
        ];
        for e in expected {
            assert_eq!(format!("{:.7}", random.next_f64()), format!("{:.7}", e));
        }
    }

    #[test]
    fn next_i64_is_sign_extended() {
        let mut a = LegacyRandom::new(123);
        let mut b = LegacyRandom::new(123);
        let hi = b.next_i32() as i64;
        let lo = b.next_i32() as i64;
        assert_eq!(a.next_i64(), (hi << 32).wrapping_add(lo));
    }

    #[test]
    fn fork_positional_is_deterministic() {
        let mut a = LegacyRandom::new(7);
        let mut b = LegacyRandom::new(7);
        let mut ra = a.fork_positional().at(10, 64, -3);
        let mut rb = b.fork_positional().at(10, 64, -3);
        assert_eq!(ra.next_i64(), rb.next_i64());
    }
}
