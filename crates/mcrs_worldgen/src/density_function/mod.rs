pub mod math;
pub mod misc;
pub mod noise;
pub mod proto;

use crate::density_function::math::{Binary, Clamp, RangeChoice, Unary, YClampedGradient};
use crate::density_function::misc::{EndIslands, FindTopSurface};
use crate::density_function::noise::{NoiseFunction, Shift, ShiftedNoise, WeirdScaledSampler};
use crate::noise::blended_noise::BlendedNoise;
use crate::spline::{CubicSpline, RangeFunction};
use bevy_math::IVec3;
use std::sync::Arc;

/// Where a density function is being evaluated.
pub trait FunctionContext: Copy {
    fn block_pos(&self) -> IVec3;

    /// A plain context at an arbitrary position, outside any chunk sweep.
    fn single_point(pos: IVec3) -> Self;
}

impl FunctionContext for IVec3 {
    #[inline]
    fn block_pos(&self) -> IVec3 {
        *self
    }

    #[inline]
    fn single_point(pos: IVec3) -> Self {
        pos
    }
}

/// Resolves child nodes by arena index. Implemented by the direct evaluator and
/// by the per-chunk evaluator, which intercepts cache markers.
pub trait NodeSampler<C: FunctionContext> {
    type Error;

    fn sample(&mut self, index: usize, ctx: C) -> Result<f64, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Interpolated,
    FlatCache,
    Cache2d,
    CacheOnce,
    CacheAllInCell,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub input: usize,
}

/// Spline coordinate bound to an arena node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineCoordinate {
    pub index: usize,
    pub min_value: f32,
    pub max_value: f32,
}

impl RangeFunction for SplineCoordinate {
    fn min_value(&self) -> f32 {
        self.min_value
    }

    fn max_value(&self) -> f32 {
        self.max_value
    }
}

/// A seed-bound node. Children are arena indices, always lower than the node's own.
#[derive(Debug, Clone)]
pub enum DensityFunction {
    Constant(f64),
    YClampedGradient(YClampedGradient),
    Noise(NoiseFunction),
    ShiftedNoise(ShiftedNoise),
    Shift(Shift),
    WeirdScaledSampler(WeirdScaledSampler),
    OldBlendedNoise(Arc<BlendedNoise>),
    EndIslands(Arc<EndIslands>),
    Unary(Unary),
    Clamp(Clamp),
    Binary(Binary),
    RangeChoice(RangeChoice),
    Spline(Box<CubicSpline<SplineCoordinate>>),
    FindTopSurface(FindTopSurface),
    Marker(Marker),
}

impl DensityFunction {
    /// Evaluates this node. Markers are transparent here; chunk evaluation handles
    /// them before reaching this point.
    pub fn compute<C, S>(&self, sampler: &mut S, ctx: C) -> Result<f64, S::Error>
    where
        C: FunctionContext,
        S: NodeSampler<C>,
    {
        match self {
            DensityFunction::Constant(v) => Ok(*v),
            DensityFunction::YClampedGradient(f) => Ok(f.compute(ctx.block_pos())),
            DensityFunction::Noise(f) => Ok(f.compute(ctx.block_pos())),
            DensityFunction::ShiftedNoise(f) => f.compute(sampler, ctx),
            DensityFunction::Shift(f) => Ok(f.compute(ctx.block_pos())),
            DensityFunction::WeirdScaledSampler(f) => f.compute(sampler, ctx),
            DensityFunction::OldBlendedNoise(noise) => {
                let pos = ctx.block_pos();
                Ok(noise.compute(pos.x, pos.y, pos.z))
            }
            DensityFunction::EndIslands(f) => Ok(f.compute(ctx.block_pos())),
            DensityFunction::Unary(f) => Ok(f.op.apply(sampler.sample(f.input, ctx)?)),
            DensityFunction::Clamp(f) => Ok(f.apply(sampler.sample(f.input, ctx)?)),
            DensityFunction::Binary(f) => f.compute(sampler, ctx),
            DensityFunction::RangeChoice(f) => f.compute(sampler, ctx),
            DensityFunction::Spline(spline) => {
                let value = spline.apply(&mut |coordinate: &SplineCoordinate| {
                    sampler
                        .sample(coordinate.index, ctx)
                        .map(|value| value as f32)
                })?;
                Ok(value as f64)
            }
            DensityFunction::FindTopSurface(f) => f.compute(sampler, ctx),
            DensityFunction::Marker(marker) => sampler.sample(marker.input, ctx),
        }
    }

    /// Arena indices this node reads from.
    pub fn inputs(&self) -> Vec<usize> {
        match self {
            DensityFunction::ShiftedNoise(f) => vec![f.shift_x, f.shift_y, f.shift_z],
            DensityFunction::WeirdScaledSampler(f) => vec![f.input],
            DensityFunction::Unary(f) => vec![f.input],
            DensityFunction::Clamp(f) => vec![f.input],
            DensityFunction::Binary(f) => vec![f.argument1, f.argument2],
            DensityFunction::RangeChoice(f) => {
                vec![f.input, f.when_in_range, f.when_out_of_range]
            }
            DensityFunction::Spline(spline) => spline.coordinates().iter().map(|c| c.index).collect(),
            DensityFunction::FindTopSurface(f) => vec![f.density, f.upper_bound],
            DensityFunction::Marker(marker) => vec![marker.input],
            _ => Vec::new(),
        }
    }
}

/// Arena entry: a node with its static value bounds.
#[derive(Debug, Clone)]
pub struct BoundFunction {
    pub function: DensityFunction,
    pub min_value: f64,
    pub max_value: f64,
}
