use crate::noise::NoiseParam;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::hash::{Hash, Hasher};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HashableF64(pub f64);

// Bitwise equality is enough to recognise identical subtrees.
impl Hash for HashableF64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Eq for HashableF64 {}

impl From<f64> for HashableF64 {
    #[inline]
    fn from(value: f64) -> Self {
        HashableF64(value)
    }
}

/// A density function slot: an inline constant, a named reference or an owned node.
#[derive(Hash, PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DensityFunctionHolder {
    Value(HashableF64),
    Reference(String),
    Owned(Box<ProtoDensityFunction>),
}

impl From<f64> for DensityFunctionHolder {
    fn from(value: f64) -> Self {
        DensityFunctionHolder::Value(value.into())
    }
}

impl From<ProtoDensityFunction> for DensityFunctionHolder {
    fn from(value: ProtoDensityFunction) -> Self {
        DensityFunctionHolder::Owned(Box::new(value))
    }
}

impl From<&str> for DensityFunctionHolder {
    fn from(value: &str) -> Self {
        DensityFunctionHolder::Reference(value.to_owned())
    }
}

#[derive(Hash, Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProtoDensityFunction {
    #[serde(rename = "minecraft:blend_alpha", alias = "blend_alpha")]
    BlendAlpha,
    #[serde(rename = "minecraft:blend_offset", alias = "blend_offset")]
    BlendOffset,
    #[serde(rename = "minecraft:beardifier", alias = "beardifier")]
    Beardifier,
    #[serde(rename = "minecraft:old_blended_noise", alias = "old_blended_noise")]
    OldBlendedNoise {
        xz_scale: HashableF64,
        y_scale: HashableF64,
        xz_factor: HashableF64,
        y_factor: HashableF64,
        smear_scale_multiplier: HashableF64,
    },
    #[serde(rename = "minecraft:interpolated", alias = "interpolated")]
    Interpolated(SingleArgumentFunction),
    #[serde(rename = "minecraft:flat_cache", alias = "flat_cache")]
    FlatCache(SingleArgumentFunction),
    #[serde(rename = "minecraft:cache_2d", alias = "cache_2d")]
    Cache2d(SingleArgumentFunction),
    #[serde(rename = "minecraft:cache_once", alias = "cache_once")]
    CacheOnce(SingleArgumentFunction),
    #[serde(rename = "minecraft:cache_all_in_cell", alias = "cache_all_in_cell")]
    CacheAllInCell(SingleArgumentFunction),
    #[serde(rename = "minecraft:noise", alias = "noise")]
    Noise {
        noise: NoiseHolder,
        xz_scale: HashableF64,
        y_scale: HashableF64,
    },
    #[serde(rename = "minecraft:end_islands", alias = "end_islands")]
    EndIslands,
    #[serde(rename = "minecraft:weird_scaled_sampler", alias = "weird_scaled_sampler")]
    WeirdScaledSampler {
        input: DensityFunctionHolder,
        noise: NoiseHolder,
        rarity_value_mapper: RarityValueMapper,
    },
    #[serde(rename = "minecraft:shifted_noise", alias = "shifted_noise")]
    ShiftedNoise {
        shift_x: DensityFunctionHolder,
        shift_y: DensityFunctionHolder,
        shift_z: DensityFunctionHolder,
        xz_scale: HashableF64,
        y_scale: HashableF64,
        noise: NoiseHolder,
    },
    #[serde(rename = "minecraft:range_choice", alias = "range_choice")]
    RangeChoice {
        input: DensityFunctionHolder,
        min_inclusive: HashableF64,
        max_exclusive: HashableF64,
        when_in_range: DensityFunctionHolder,
        when_out_of_range: DensityFunctionHolder,
    },
    #[serde(rename = "minecraft:shift_a", alias = "shift_a")]
    ShiftA { argument: NoiseHolder },
    #[serde(rename = "minecraft:shift_b", alias = "shift_b")]
    ShiftB { argument: NoiseHolder },
    #[serde(rename = "minecraft:shift", alias = "shift")]
    Shift { argument: NoiseHolder },
    #[serde(rename = "minecraft:blend_density", alias = "blend_density")]
    BlendDensity(SingleArgumentFunction),
    #[serde(rename = "minecraft:clamp", alias = "clamp")]
    Clamp {
        input: DensityFunctionHolder,
        min: HashableF64,
        max: HashableF64,
    },
    #[serde(rename = "minecraft:abs", alias = "abs")]
    Abs(SingleArgumentFunction),
    #[serde(rename = "minecraft:square", alias = "square")]
    Square(SingleArgumentFunction),
    #[serde(rename = "minecraft:cube", alias = "cube")]
    Cube(SingleArgumentFunction),
    #[serde(rename = "minecraft:half_negative", alias = "half_negative")]
    HalfNegative(SingleArgumentFunction),
    #[serde(rename = "minecraft:quarter_negative", alias = "quarter_negative")]
    QuarterNegative(SingleArgumentFunction),
    #[serde(rename = "minecraft:invert", alias = "invert")]
    Invert(SingleArgumentFunction),
    #[serde(rename = "minecraft:squeeze", alias = "squeeze")]
    Squeeze(SingleArgumentFunction),
    #[serde(rename = "minecraft:add", alias = "add")]
    Add(TwoArgumentFunction),
    #[serde(rename = "minecraft:mul", alias = "mul")]
    Mul(TwoArgumentFunction),
    #[serde(rename = "minecraft:min", alias = "min")]
    Min(TwoArgumentFunction),
    #[serde(rename = "minecraft:max", alias = "max")]
    Max(TwoArgumentFunction),
    #[serde(rename = "minecraft:spline", alias = "spline")]
    Spline { spline: SplineHolder },
    #[serde(rename = "minecraft:constant", alias = "constant")]
    Constant { argument: HashableF64 },
    #[serde(rename = "minecraft:y_clamped_gradient", alias = "y_clamped_gradient")]
    YClampedGradient {
        from_y: i32,
        to_y: i32,
        from_value: HashableF64,
        to_value: HashableF64,
    },
    #[serde(rename = "minecraft:find_top_surface", alias = "find_top_surface")]
    FindTopSurface {
        density: DensityFunctionHolder,
        upper_bound: DensityFunctionHolder,
        lower_bound: i32,
        cell_height: u32,
    },
}

#[derive(Hash, PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoiseHolder {
    Reference(String),
    Owned(NoiseParam),
}

#[derive(Hash, PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum RarityValueMapper {
    #[serde(rename = "type_1")]
    Type1,
    #[serde(rename = "type_2")]
    Type2,
}

#[derive(Hash, PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct SingleArgumentFunction {
    pub argument: DensityFunctionHolder,
}

#[derive(Hash, PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct TwoArgumentFunction {
    pub argument1: DensityFunctionHolder,
    pub argument2: DensityFunctionHolder,
}

#[derive(Hash, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SplineHolder {
    Constant(HashableF64),
    Spline(Spline),
}

#[derive(Hash, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Spline {
    pub coordinate: DensityFunctionHolder,
    pub points: Vec<SplinePoint>,
}

#[derive(Hash, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct SplinePoint {
    pub location: HashableF64,
    pub value: SplineHolder,
    pub derivative: HashableF64,
}

impl SingleArgumentFunction {
    fn try_map<E, V>(&self, visitor: &mut V) -> Result<Self, E>
    where
        V: FnMut(DensityFunctionHolder) -> Result<DensityFunctionHolder, E>,
    {
        Ok(SingleArgumentFunction {
            argument: self.argument.try_map_all(visitor)?,
        })
    }
}

impl TwoArgumentFunction {
    fn try_map<E, V>(&self, visitor: &mut V) -> Result<Self, E>
    where
        V: FnMut(DensityFunctionHolder) -> Result<DensityFunctionHolder, E>,
    {
        Ok(TwoArgumentFunction {
            argument1: self.argument1.try_map_all(visitor)?,
            argument2: self.argument2.try_map_all(visitor)?,
        })
    }
}

impl SplineHolder {
    fn try_map<E, V>(&self, visitor: &mut V) -> Result<Self, E>
    where
        V: FnMut(DensityFunctionHolder) -> Result<DensityFunctionHolder, E>,
    {
        match self {
            SplineHolder::Constant(v) => Ok(SplineHolder::Constant(*v)),
            SplineHolder::Spline(spline) => {
                let coordinate = spline.coordinate.try_map_all(visitor)?;
                let points = spline
                    .points
                    .iter()
                    .map(|point| {
                        Ok(SplinePoint {
                            location: point.location,
                            value: point.value.try_map(visitor)?,
                            derivative: point.derivative,
                        })
                    })
                    .collect::<Result<Vec<_>, E>>()?;
                Ok(SplineHolder::Spline(Spline { coordinate, points }))
            }
        }
    }
}

impl DensityFunctionHolder {
    /// Bottom-up rewrite: children are rewritten first, then `visitor` sees the rebuilt slot.
    pub fn try_map_all<E, V>(&self, visitor: &mut V) -> Result<DensityFunctionHolder, E>
    where
        V: FnMut(DensityFunctionHolder) -> Result<DensityFunctionHolder, E>,
    {
        let rebuilt = match self {
            DensityFunctionHolder::Owned(function) => {
                DensityFunctionHolder::Owned(Box::new(function.try_map_children(visitor)?))
            }
            other => other.clone(),
        };
        visitor(rebuilt)
    }

    pub fn map_all<V>(&self, visitor: &mut V) -> DensityFunctionHolder
    where
        V: FnMut(DensityFunctionHolder) -> DensityFunctionHolder,
    {
        match self.try_map_all(&mut |holder| Ok::<_, Infallible>(visitor(holder))) {
            Ok(holder) => holder,
            Err(never) => match never {},
        }
    }
}

impl ProtoDensityFunction {
    fn try_map_children<E, V>(&self, visitor: &mut V) -> Result<ProtoDensityFunction, E>
    where
        V: FnMut(DensityFunctionHolder) -> Result<DensityFunctionHolder, E>,
    {
        use ProtoDensityFunction as F;
        Ok(match self {
            F::Interpolated(x) => F::Interpolated(x.try_map(visitor)?),
            F::FlatCache(x) => F::FlatCache(x.try_map(visitor)?),
            F::Cache2d(x) => F::Cache2d(x.try_map(visitor)?),
            F::CacheOnce(x) => F::CacheOnce(x.try_map(visitor)?),
            F::CacheAllInCell(x) => F::CacheAllInCell(x.try_map(visitor)?),
            F::BlendDensity(x) => F::BlendDensity(x.try_map(visitor)?),
            F::Abs(x) => F::Abs(x.try_map(visitor)?),
            F::Square(x) => F::Square(x.try_map(visitor)?),
            F::Cube(x) => F::Cube(x.try_map(visitor)?),
            F::HalfNegative(x) => F::HalfNegative(x.try_map(visitor)?),
            F::QuarterNegative(x) => F::QuarterNegative(x.try_map(visitor)?),
            F::Invert(x) => F::Invert(x.try_map(visitor)?),
            F::Squeeze(x) => F::Squeeze(x.try_map(visitor)?),
            F::Add(x) => F::Add(x.try_map(visitor)?),
            F::Mul(x) => F::Mul(x.try_map(visitor)?),
            F::Min(x) => F::Min(x.try_map(visitor)?),
            F::Max(x) => F::Max(x.try_map(visitor)?),
            F::WeirdScaledSampler {
                input,
                noise,
                rarity_value_mapper,
            } => F::WeirdScaledSampler {
                input: input.try_map_all(visitor)?,
                noise: noise.clone(),
                rarity_value_mapper: *rarity_value_mapper,
            },
            F::ShiftedNoise {
                shift_x,
                shift_y,
                shift_z,
                xz_scale,
                y_scale,
                noise,
            } => F::ShiftedNoise {
                shift_x: shift_x.try_map_all(visitor)?,
                shift_y: shift_y.try_map_all(visitor)?,
                shift_z: shift_z.try_map_all(visitor)?,
                xz_scale: *xz_scale,
                y_scale: *y_scale,
                noise: noise.clone(),
            },
            F::RangeChoice {
                input,
                min_inclusive,
                max_exclusive,
                when_in_range,
                when_out_of_range,
            } => F::RangeChoice {
                input: input.try_map_all(visitor)?,
                min_inclusive: *min_inclusive,
                max_exclusive: *max_exclusive,
                when_in_range: when_in_range.try_map_all(visitor)?,
                when_out_of_range: when_out_of_range.try_map_all(visitor)?,
            },
            F::Clamp { input, min, max } => F::Clamp {
                input: input.try_map_all(visitor)?,
                min: *min,
                max: *max,
            },
            F::Spline { spline } => F::Spline {
                spline: spline.try_map(visitor)?,
            },
            F::FindTopSurface {
                density,
                upper_bound,
                lower_bound,
                cell_height,
            } => F::FindTopSurface {
                density: density.try_map_all(visitor)?,
                upper_bound: upper_bound.try_map_all(visitor)?,
                lower_bound: *lower_bound,
                cell_height: *cell_height,
            },
            leaf => leaf.clone(),
        })
    }

    /// Direct child slots, spline coordinates included.
    pub fn children(&self) -> Vec<&DensityFunctionHolder> {
        use ProtoDensityFunction as F;
        match self {
            F::Interpolated(x)
            | F::FlatCache(x)
            | F::Cache2d(x)
            | F::CacheOnce(x)
            | F::CacheAllInCell(x)
            | F::BlendDensity(x)
            | F::Abs(x)
            | F::Square(x)
            | F::Cube(x)
            | F::HalfNegative(x)
            | F::QuarterNegative(x)
            | F::Invert(x)
            | F::Squeeze(x) => vec![&x.argument],
            F::Add(x) | F::Mul(x) | F::Min(x) | F::Max(x) => vec![&x.argument1, &x.argument2],
            F::WeirdScaledSampler { input, .. } | F::Clamp { input, .. } => vec![input],
            F::ShiftedNoise {
                shift_x,
                shift_y,
                shift_z,
                ..
            } => vec![shift_x, shift_y, shift_z],
            F::RangeChoice {
                input,
                when_in_range,
                when_out_of_range,
                ..
            } => vec![input, when_in_range, when_out_of_range],
            F::Spline { spline } => {
                let mut out = Vec::new();
                spline.collect_coordinates(&mut out);
                out
            }
            F::FindTopSurface {
                density,
                upper_bound,
                ..
            } => vec![density, upper_bound],
            _ => Vec::new(),
        }
    }

    pub fn noise(&self) -> Option<&NoiseHolder> {
        use ProtoDensityFunction as F;
        match self {
            F::Noise { noise, .. }
            | F::WeirdScaledSampler { noise, .. }
            | F::ShiftedNoise { noise, .. } => Some(noise),
            F::ShiftA { argument } | F::ShiftB { argument } | F::Shift { argument } => {
                Some(argument)
            }
            _ => None,
        }
    }
}

impl SplineHolder {
    fn collect_coordinates<'a>(&'a self, out: &mut Vec<&'a DensityFunctionHolder>) {
        if let SplineHolder::Spline(spline) = self {
            out.push(&spline.coordinate);
            for point in &spline.points {
                point.value.collect_coordinates(out);
            }
        }
    }
}

/// Read-only walk over a declarative tree. References are reported, not followed.
pub trait Visitor {
    fn visit_density_function_holder(&mut self, holder: &DensityFunctionHolder) {
        match holder {
            DensityFunctionHolder::Value(v) => self.visit_constant(v.0),
            DensityFunctionHolder::Reference(r) => self.visit_reference(r),
            DensityFunctionHolder::Owned(f) => self.visit_density_function(f),
        }
    }

    fn visit_density_function(&mut self, function: &ProtoDensityFunction) {
        if let ProtoDensityFunction::Constant { argument } = function {
            self.visit_constant(argument.0);
        }
        if let Some(noise) = function.noise() {
            self.visit_noise_holder(noise);
        }
        for child in function.children() {
            self.visit_density_function_holder(child);
        }
    }

    fn visit_constant(&mut self, _value: f64) {}

    fn visit_reference(&mut self, _id: &str) {}

    fn visit_noise_holder(&mut self, _noise: &NoiseHolder) {}
}
