use crate::density_function::{FunctionContext, NodeSampler};
use crate::density_function::proto::RarityValueMapper;
use crate::noise::normal_noise::NormalNoise;
use bevy_math::IVec3;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct NoiseFunction {
    pub noise: Arc<NormalNoise>,
    pub xz_scale: f64,
    pub y_scale: f64,
}

impl NoiseFunction {
    pub fn compute(&self, pos: IVec3) -> f64 {
        self.noise.get(
            pos.x as f64 * self.xz_scale,
            pos.y as f64 * self.y_scale,
            pos.z as f64 * self.xz_scale,
        )
    }

    pub fn max_value(&self) -> f64 {
        self.noise.max_value()
    }
}

#[derive(Debug, Clone)]
pub struct ShiftedNoise {
    pub shift_x: usize,
    pub shift_y: usize,
    pub shift_z: usize,
    pub xz_scale: f64,
    pub y_scale: f64,
    pub noise: Arc<NormalNoise>,
}

impl ShiftedNoise {
    pub fn compute<C, S>(&self, sampler: &mut S, ctx: C) -> Result<f64, S::Error>
    where
        C: FunctionContext,
        S: NodeSampler<C>,
    {
        let pos = ctx.block_pos();
        let x = pos.x as f64 * self.xz_scale + sampler.sample(self.shift_x, ctx)?;
        let y = pos.y as f64 * self.y_scale + sampler.sample(self.shift_y, ctx)?;
        let z = pos.z as f64 * self.xz_scale + sampler.sample(self.shift_z, ctx)?;
        Ok(self.noise.get(x, y, z))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftKind {
    /// Samples `(x, 0, z)`.
    A,
    /// Samples `(z, x, 0)`.
    B,
    /// Samples `(x, y, z)`.
    All,
}

/// Coordinate offset noise, sampled at quarter resolution and scaled back up.
#[derive(Debug, Clone)]
pub struct Shift {
    pub kind: ShiftKind,
    pub noise: Arc<NormalNoise>,
}

impl Shift {
    pub fn compute(&self, pos: IVec3) -> f64 {
        let (x, y, z) = match self.kind {
            ShiftKind::A => (pos.x, 0, pos.z),
            ShiftKind::B => (pos.z, pos.x, 0),
            ShiftKind::All => (pos.x, pos.y, pos.z),
        };
        self.noise
            .get(x as f64 * 0.25, y as f64 * 0.25, z as f64 * 0.25)
            * 4.0
    }

    pub fn max_value(&self) -> f64 {
        self.noise.max_value() * 4.0
    }
}

impl RarityValueMapper {
    pub fn map(self, value: f64) -> f64 {
        match self {
            RarityValueMapper::Type1 => {
                if value < -0.5 {
                    0.75
                } else if value < 0.0 {
                    1.0
                } else if value < 0.5 {
                    1.5
                } else {
                    2.0
                }
            }
            RarityValueMapper::Type2 => {
                if value < -0.75 {
                    0.5
                } else if value < -0.5 {
                    0.75
                } else if value < 0.5 {
                    1.0
                } else if value < 0.75 {
                    2.0
                } else {
                    3.0
                }
            }
        }
    }

    pub fn max_rarity(self) -> f64 {
        match self {
            RarityValueMapper::Type1 => 2.0,
            RarityValueMapper::Type2 => 3.0,
        }
    }
}

/// Noise whose frequency and amplitude are scaled by a rarity derived from `input`.
#[derive(Debug, Clone)]
pub struct WeirdScaledSampler {
    pub input: usize,
    pub noise: Arc<NormalNoise>,
    pub rarity_value_mapper: RarityValueMapper,
}

impl WeirdScaledSampler {
    pub fn compute<C, S>(&self, sampler: &mut S, ctx: C) -> Result<f64, S::Error>
    where
        C: FunctionContext,
        S: NodeSampler<C>,
    {
        let value = sampler.sample(self.input, ctx)?;
        Ok(self.transform(ctx.block_pos(), value))
    }

    pub fn transform(&self, pos: IVec3, value: f64) -> f64 {
        let rarity = self.rarity_value_mapper.map(value);
        rarity
            * self
                .noise
                .get(
                    pos.x as f64 / rarity,
                    pos.y as f64 / rarity,
                    pos.z as f64 / rarity,
                )
                .abs()
    }

    pub fn max_value(&self) -> f64 {
        self.rarity_value_mapper.max_rarity() * self.noise.max_value()
    }
}
