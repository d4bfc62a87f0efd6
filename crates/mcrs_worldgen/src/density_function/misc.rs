use crate::density_function::{FunctionContext, NodeSampler};
use crate::noise::simplex_noise::SimplexNoise;
use bevy_math::IVec3;
use mcrs_random::Random;
use mcrs_random::legacy::LegacyRandom;

/// Floating island falloff around the origin with scattered islands further out.
#[derive(Debug, Clone)]
pub struct EndIslands {
    noise: SimplexNoise,
}

impl EndIslands {
    pub const MIN_VALUE: f64 = -0.84375;
    pub const MAX_VALUE: f64 = 0.5625;

    pub fn new(seed: u64) -> Self {
        let mut random = LegacyRandom::new(seed);
        random.consume_count(17292);
        Self {
            noise: SimplexNoise::from_random(&mut random),
        }
    }

    pub fn compute(&self, pos: IVec3) -> f64 {
        (self.height_value(pos.x / 8, pos.z / 8) as f64 - 8.0) / 128.0
    }

    fn height_value(&self, x: i32, z: i32) -> f32 {
        let cell_x = x / 2;
        let cell_z = z / 2;
        let local_x = x % 2;
        let local_z = z % 2;
        let dist = (x.wrapping_mul(x).wrapping_add(z.wrapping_mul(z)) as f32).sqrt();
        let mut height = (100.0 - dist * 8.0).clamp(-100.0, 80.0);
        for dx in -12..=12 {
            for dz in -12..=12 {
                let island_x = (cell_x + dx) as i64;
                let island_z = (cell_z + dz) as i64;
                if island_x * island_x + island_z * island_z > 4096
                    && self.noise.get_value(island_x as f64, island_z as f64) < -0.9f32 as f64
                {
                    let falloff = ((island_x as f32).abs() * 3439.0 + (island_z as f32).abs() * 147.0)
                        % 13.0
                        + 9.0;
                    let offset_x = (local_x - dx * 2) as f32;
                    let offset_z = (local_z - dz * 2) as f32;
                    let island = (100.0 - (offset_x * offset_x + offset_z * offset_z).sqrt() * falloff)
                        .clamp(-100.0, 80.0);
                    height = height.max(island);
                }
            }
        }
        height
    }
}

/// Scans down in `cell_height` steps from the upper bound for the first non-positive density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FindTopSurface {
    pub density: usize,
    pub upper_bound: usize,
    pub lower_bound: i32,
    pub cell_height: i32,
}

impl FindTopSurface {
    pub fn compute<C, S>(&self, sampler: &mut S, ctx: C) -> Result<f64, S::Error>
    where
        C: FunctionContext,
        S: NodeSampler<C>,
    {
        let pos = ctx.block_pos();
        let upper = sampler.sample(self.upper_bound, ctx)?;
        let top = (upper / self.cell_height as f64).floor() as i32 * self.cell_height;
        if top <= self.lower_bound {
            return Ok(self.lower_bound as f64);
        }
        let mut y = top;
        while y >= self.lower_bound {
            let probe = C::single_point(IVec3::new(pos.x, y, pos.z));
            if sampler.sample(self.density, probe)? <= 0.0 {
                return Ok(y as f64);
            }
            y -= self.cell_height;
        }
        Ok(self.lower_bound as f64)
    }
}

#[cfg(test)]
mod test {
    use crate::density_function::misc::EndIslands;
    use bevy_math::IVec3;

    #[test]
    fn center_island_is_solid_and_bounded() {
        let islands = EndIslands::new(0);
        assert_eq!(islands.compute(IVec3::ZERO), (80.0 - 8.0) / 128.0);
        for i in 0..20 {
            let v = islands.compute(IVec3::new(i * 997, 0, -i * 631));
            assert!((EndIslands::MIN_VALUE..=EndIslands::MAX_VALUE).contains(&v));
        }
    }
}
