use crate::density_function::{FunctionContext, NodeSampler};
use bevy_math::IVec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Abs,
    Square,
    Cube,
    HalfNegative,
    QuarterNegative,
    Invert,
    Squeeze,
}

impl UnaryOp {
    #[inline]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            UnaryOp::Abs => value.abs(),
            UnaryOp::Square => value * value,
            UnaryOp::Cube => value * value * value,
            UnaryOp::HalfNegative => {
                if value > 0.0 {
                    value
                } else {
                    value * 0.5
                }
            }
            UnaryOp::QuarterNegative => {
                if value > 0.0 {
                    value
                } else {
                    value * 0.25
                }
            }
            UnaryOp::Invert => 1.0 / value,
            UnaryOp::Squeeze => {
                let e = value.clamp(-1.0, 1.0);
                e / 2.0 - e * e * e / 24.0
            }
        }
    }

    /// Output range for an input range `[min, max]`.
    pub fn bounds(self, min: f64, max: f64) -> (f64, f64) {
        match self {
            UnaryOp::Abs | UnaryOp::Square => {
                let low = self.apply(min);
                let high = self.apply(max);
                if min >= 0.0 {
                    (low, high)
                } else if max <= 0.0 {
                    (high, low)
                } else {
                    (0.0, low.max(high))
                }
            }
            UnaryOp::Invert => {
                if min <= 0.0 && max >= 0.0 {
                    (f64::NEG_INFINITY, f64::INFINITY)
                } else {
                    (1.0 / max, 1.0 / min)
                }
            }
            _ => (self.apply(min), self.apply(max)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unary {
    pub op: UnaryOp,
    pub input: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clamp {
    pub input: usize,
    pub min: f64,
    pub max: f64,
}

impl Clamp {
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Mul,
    Min,
    Max,
}

impl BinaryOp {
    pub fn bounds(self, a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
        match self {
            BinaryOp::Add => (a.0 + b.0, a.1 + b.1),
            BinaryOp::Mul => {
                let corners = [a.0 * b.0, a.0 * b.1, a.1 * b.0, a.1 * b.1];
                let mut min = f64::INFINITY;
                let mut max = f64::NEG_INFINITY;
                for corner in corners {
                    // inf * 0
                    let corner = if corner.is_nan() { 0.0 } else { corner };
                    min = min.min(corner);
                    max = max.max(corner);
                }
                (min, max)
            }
            BinaryOp::Min => (a.0.min(b.0), a.1.min(b.1)),
            BinaryOp::Max => (a.0.max(b.0), a.1.max(b.1)),
        }
    }
}

/// Two-argument combinator. `argument2` bounds are kept to short-circuit min and max.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binary {
    pub op: BinaryOp,
    pub argument1: usize,
    pub argument2: usize,
    pub argument2_min: f64,
    pub argument2_max: f64,
}

impl Binary {
    pub fn compute<C, S>(&self, sampler: &mut S, ctx: C) -> Result<f64, S::Error>
    where
        C: FunctionContext,
        S: NodeSampler<C>,
    {
        let a = sampler.sample(self.argument1, ctx)?;
        self.combine(a, |sampler| sampler.sample(self.argument2, ctx), sampler)
    }

    /// Applies the operator to an already computed first argument, sampling the
    /// second one only when it can still change the result.
    #[inline]
    pub fn combine<S, E, F>(&self, a: f64, second: F, sampler: &mut S) -> Result<f64, E>
    where
        F: FnOnce(&mut S) -> Result<f64, E>,
    {
        Ok(match self.op {
            BinaryOp::Add => a + second(sampler)?,
            BinaryOp::Mul => {
                if a == 0.0 {
                    0.0
                } else {
                    a * second(sampler)?
                }
            }
            BinaryOp::Min => {
                if a < self.argument2_min {
                    a
                } else {
                    a.min(second(sampler)?)
                }
            }
            BinaryOp::Max => {
                if a > self.argument2_max {
                    a
                } else {
                    a.max(second(sampler)?)
                }
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YClampedGradient {
    pub from_y: i32,
    pub to_y: i32,
    pub from_value: f64,
    pub to_value: f64,
}

impl YClampedGradient {
    pub fn compute(&self, pos: IVec3) -> f64 {
        clamped_map(
            pos.y as f64,
            self.from_y as f64,
            self.to_y as f64,
            self.from_value,
            self.to_value,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeChoice {
    pub input: usize,
    pub min_inclusive: f64,
    pub max_exclusive: f64,
    pub when_in_range: usize,
    pub when_out_of_range: usize,
}

impl RangeChoice {
    pub fn compute<C, S>(&self, sampler: &mut S, ctx: C) -> Result<f64, S::Error>
    where
        C: FunctionContext,
        S: NodeSampler<C>,
    {
        let value = sampler.sample(self.input, ctx)?;
        sampler.sample(self.branch(value), ctx)
    }

    #[inline]
    pub fn branch(&self, value: f64) -> usize {
        if value >= self.min_inclusive && value < self.max_exclusive {
            self.when_in_range
        } else {
            self.when_out_of_range
        }
    }
}

/// Linear remap of `value` from `[from_min, from_max]` onto `[to_min, to_max]`, clamped.
pub fn clamped_map(value: f64, from_min: f64, from_max: f64, to_min: f64, to_max: f64) -> f64 {
    clamped_lerp(to_min, to_max, inverse_lerp(value, from_min, from_max))
}

#[inline]
pub fn inverse_lerp(value: f64, min: f64, max: f64) -> f64 {
    (value - min) / (max - min)
}

#[inline]
pub fn clamped_lerp(start: f64, end: f64, delta: f64) -> f64 {
    if delta < 0.0 {
        start
    } else if delta > 1.0 {
        end
    } else {
        start + delta * (end - start)
    }
}

/// Unclamped linear remap.
#[inline]
pub fn map(value: f64, from_min: f64, from_max: f64, to_min: f64, to_max: f64) -> f64 {
    let delta = inverse_lerp(value, from_min, from_max);
    to_min + delta * (to_max - to_min)
}

#[cfg(test)]
mod test {
    use crate::density_function::math::{BinaryOp, UnaryOp, YClampedGradient, clamped_map};
    use bevy_math::IVec3;

    #[test]
    fn unary_bounds() {
        assert_eq!(UnaryOp::Abs.bounds(-2.0, 1.0), (0.0, 2.0));
        assert_eq!(UnaryOp::Abs.bounds(-3.0, -1.0), (1.0, 3.0));
        assert_eq!(UnaryOp::Square.bounds(1.0, 2.0), (1.0, 4.0));
        assert_eq!(UnaryOp::Square.bounds(-3.0, 2.0), (0.0, 9.0));
        assert_eq!(UnaryOp::Cube.bounds(-2.0, 1.0), (-8.0, 1.0));
        assert_eq!(UnaryOp::HalfNegative.bounds(-2.0, 1.0), (-1.0, 1.0));
        assert_eq!(UnaryOp::QuarterNegative.bounds(-4.0, 2.0), (-1.0, 2.0));
        assert_eq!(UnaryOp::Invert.bounds(2.0, 4.0), (0.25, 0.5));
        assert_eq!(
            UnaryOp::Invert.bounds(-1.0, 1.0),
            (f64::NEG_INFINITY, f64::INFINITY)
        );
    }

    #[test]
    fn squeeze_saturates() {
        let top = UnaryOp::Squeeze.apply(1.0);
        assert_eq!(UnaryOp::Squeeze.apply(5.0), top);
        assert_eq!(top, 0.5 - 1.0 / 24.0);
    }

    #[test]
    fn binary_bounds() {
        assert_eq!(BinaryOp::Add.bounds((-1.0, 1.0), (2.0, 3.0)), (1.0, 4.0));
        assert_eq!(BinaryOp::Mul.bounds((-1.0, 2.0), (-3.0, 1.0)), (-6.0, 3.0));
        assert_eq!(BinaryOp::Min.bounds((-1.0, 2.0), (0.0, 1.0)), (-1.0, 1.0));
        assert_eq!(BinaryOp::Max.bounds((-1.0, 2.0), (0.0, 1.0)), (0.0, 2.0));
    }

    #[test]
    fn gradient_clamps() {
        let gradient = YClampedGradient {
            from_y: 0,
            to_y: 100,
            from_value: 1.0,
            to_value: -1.0,
        };
        assert_eq!(gradient.compute(IVec3::new(0, -50, 0)), 1.0);
        assert_eq!(gradient.compute(IVec3::new(0, 50, 0)), 0.0);
        assert_eq!(gradient.compute(IVec3::new(0, 150, 0)), -1.0);
        assert_eq!(clamped_map(5.0, 0.0, 10.0, 0.0, 1.0), 0.5);
    }
}
