pub mod chunk;
pub mod wrapper;

use crate::density_function::math::{
    Binary, BinaryOp, Clamp, RangeChoice, Unary, UnaryOp, YClampedGradient,
};
use crate::density_function::misc::{EndIslands, FindTopSurface};
use crate::density_function::noise::{
    NoiseFunction, Shift, ShiftKind, ShiftedNoise, WeirdScaledSampler,
};
use crate::density_function::proto::{
    DensityFunctionHolder, NoiseHolder, ProtoDensityFunction, SingleArgumentFunction,
    SplineHolder, TwoArgumentFunction,
};
use crate::density_function::{
    BoundFunction, DensityFunction, Marker, MarkerKind, NodeSampler, SplineCoordinate,
};
use crate::error::BuildError;
use crate::noise::blended_noise::BlendedNoise;
use crate::noise::normal_noise::NormalNoise;
use crate::proto::ProtoNoiseRouter;
use crate::random_state::{RandomState, qualified};
use crate::spline::CubicSpline;
use bevy_math::IVec3;
use mcrs_random::legacy::LegacyRandom;
use mcrs_random::RandomSource;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;

/// Named entry points of a [`NoiseRouter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouterOutput {
    Barrier,
    FluidLevelFloodedness,
    FluidLevelSpread,
    Lava,
    Temperature,
    Vegetation,
    Continents,
    Erosion,
    Depth,
    Ridges,
    PreliminarySurfaceLevel,
    FinalDensity,
}

impl RouterOutput {
    /// Same order as [`ProtoNoiseRouter::outputs`].
    pub const ALL: [RouterOutput; 12] = [
        RouterOutput::Barrier,
        RouterOutput::FluidLevelFloodedness,
        RouterOutput::FluidLevelSpread,
        RouterOutput::Lava,
        RouterOutput::Temperature,
        RouterOutput::Vegetation,
        RouterOutput::Continents,
        RouterOutput::Erosion,
        RouterOutput::Depth,
        RouterOutput::Ridges,
        RouterOutput::PreliminarySurfaceLevel,
        RouterOutput::FinalDensity,
    ];
}

/// A density graph bound to one seed, flattened into an arena.
///
/// Children always live at lower indices than their parents, and structurally
/// identical subtrees share a single node.
#[derive(Debug, Clone)]
pub struct NoiseRouter {
    nodes: Vec<BoundFunction>,
    outputs: [usize; 12],
}

impl NoiseRouter {
    /// Resolves references in `router` against `functions`, drops blending hooks
    /// and compiles every output into one arena.
    pub fn new(
        router: &ProtoNoiseRouter,
        functions: &BTreeMap<String, DensityFunctionHolder>,
        random_state: &mut RandomState,
    ) -> Result<Self, BuildError> {
        let mut resolver = Resolver::new(functions);
        let mut compiler = Compiler::new(random_state);
        let mut outputs = [0; 12];
        for (slot, holder) in outputs.iter_mut().zip(router.outputs()) {
            let resolved = resolver.resolve(holder)?;
            let unblended = resolved.map_all(&mut strip_blending);
            *slot = compiler.compile(&unblended)?;
        }
        info!(
            "compiled noise router: {} nodes, {} noises",
            compiler.nodes.len(),
            compiler.random_state.noise_count()
        );
        Ok(Self {
            nodes: compiler.nodes,
            outputs,
        })
    }

    #[inline]
    pub fn nodes(&self) -> &[BoundFunction] {
        &self.nodes
    }

    #[inline]
    pub fn node(&self, index: usize) -> &BoundFunction {
        &self.nodes[index]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn output(&self, output: RouterOutput) -> usize {
        self.outputs[output as usize]
    }

    /// Evaluates `output` at a single position, ignoring every cache marker.
    pub fn compute(&self, output: RouterOutput, pos: IVec3) -> f64 {
        self.compute_node(self.output(output), pos)
    }

    pub fn compute_node(&self, index: usize, pos: IVec3) -> f64 {
        let mut sampler = DirectSampler { nodes: &self.nodes };
        match sampler.sample(index, pos) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    pub fn bounds(&self, output: RouterOutput) -> (f64, f64) {
        let node = self.node(self.output(output));
        (node.min_value, node.max_value)
    }
}

struct DirectSampler<'a> {
    nodes: &'a [BoundFunction],
}

impl NodeSampler<IVec3> for DirectSampler<'_> {
    type Error = Infallible;

    #[inline]
    fn sample(&mut self, index: usize, ctx: IVec3) -> Result<f64, Infallible> {
        let nodes = self.nodes;
        nodes[index].function.compute(self, ctx)
    }
}

/// Replaces the hooks used to blend with pre-existing terrain by their neutral values.
fn strip_blending(holder: DensityFunctionHolder) -> DensityFunctionHolder {
    match holder {
        DensityFunctionHolder::Owned(function) => match *function {
            ProtoDensityFunction::BlendAlpha => DensityFunctionHolder::from(1.0),
            ProtoDensityFunction::BlendOffset | ProtoDensityFunction::Beardifier => {
                DensityFunctionHolder::from(0.0)
            }
            ProtoDensityFunction::BlendDensity(SingleArgumentFunction { argument }) => argument,
            other => DensityFunctionHolder::Owned(Box::new(other)),
        },
        other => other,
    }
}

/// Inlines named references, detecting cycles.
struct Resolver<'a> {
    functions: &'a BTreeMap<String, DensityFunctionHolder>,
    resolving: Vec<String>,
    resolved: FxHashMap<String, DensityFunctionHolder>,
}

impl<'a> Resolver<'a> {
    fn new(functions: &'a BTreeMap<String, DensityFunctionHolder>) -> Self {
        Self {
            functions,
            resolving: Vec::new(),
            resolved: FxHashMap::default(),
        }
    }

    fn resolve(&mut self, holder: &DensityFunctionHolder) -> Result<DensityFunctionHolder, BuildError> {
        holder.try_map_all(&mut |holder| match holder {
            DensityFunctionHolder::Reference(id) => self.resolve_reference(&id),
            other => Ok(other),
        })
    }

    fn resolve_reference(&mut self, id: &str) -> Result<DensityFunctionHolder, BuildError> {
        let id = qualified(id).into_owned();
        if let Some(resolved) = self.resolved.get(&id) {
            return Ok(resolved.clone());
        }
        if self.resolving.contains(&id) {
            return Err(BuildError::CyclicReference(id));
        }
        let functions = self.functions;
        let target = functions
            .get(&id)
            .or_else(|| functions.get(id.trim_start_matches("minecraft:")))
            .ok_or_else(|| BuildError::UnknownDensityFunction(id.clone()))?;
        self.resolving.push(id.clone());
        let resolved = self.resolve(target);
        self.resolving.pop();
        let resolved = resolved?;
        self.resolved.insert(id, resolved.clone());
        Ok(resolved)
    }
}

/// Lowers resolved declarative trees into arena nodes.
struct Compiler<'a> {
    random_state: &'a mut RandomState,
    nodes: Vec<BoundFunction>,
    interned: FxHashMap<DensityFunctionHolder, usize>,
    end_islands: Option<Arc<EndIslands>>,
}

impl<'a> Compiler<'a> {
    fn new(random_state: &'a mut RandomState) -> Self {
        Self {
            random_state,
            nodes: Vec::new(),
            interned: FxHashMap::default(),
            end_islands: None,
        }
    }

    fn push(&mut self, function: DensityFunction, min_value: f64, max_value: f64) -> usize {
        self.nodes.push(BoundFunction {
            function,
            min_value,
            max_value,
        });
        self.nodes.len() - 1
    }

    fn bounds(&self, index: usize) -> (f64, f64) {
        let node = &self.nodes[index];
        (node.min_value, node.max_value)
    }

    fn noise(&mut self, holder: &NoiseHolder) -> Result<Arc<NormalNoise>, BuildError> {
        match holder {
            NoiseHolder::Reference(id) => self.random_state.density_noise(id),
            NoiseHolder::Owned(param) => Ok(self.random_state.inline_noise(param)),
        }
    }

    fn compile(&mut self, holder: &DensityFunctionHolder) -> Result<usize, BuildError> {
        if let Some(index) = self.interned.get(holder) {
            return Ok(*index);
        }
        let index = match holder {
            DensityFunctionHolder::Value(value) => self.push(DensityFunction::Constant(value.0), value.0, value.0),
            DensityFunctionHolder::Reference(id) => {
                return Err(BuildError::UnknownDensityFunction(id.clone()));
            }
            DensityFunctionHolder::Owned(function) => self.compile_function(function)?,
        };
        self.interned.insert(holder.clone(), index);
        Ok(index)
    }

    fn compile_function(&mut self, function: &ProtoDensityFunction) -> Result<usize, BuildError> {
        use ProtoDensityFunction as F;
        Ok(match function {
            F::BlendAlpha => self.push(DensityFunction::Constant(1.0), 1.0, 1.0),
            F::BlendOffset | F::Beardifier => self.push(DensityFunction::Constant(0.0), 0.0, 0.0),
            F::BlendDensity(x) => self.compile(&x.argument)?,
            F::Constant { argument } => {
                self.push(DensityFunction::Constant(argument.0), argument.0, argument.0)
            }
            F::OldBlendedNoise {
                xz_scale,
                y_scale,
                xz_factor,
                y_factor,
                smear_scale_multiplier,
            } => {
                let mut random: RandomSource = if self.random_state.is_legacy() {
                    LegacyRandom::new(self.random_state.seed()).into()
                } else {
                    self.random_state.random().from_hash_of("minecraft:terrain")
                };
                let noise = BlendedNoise::new(
                    &mut random,
                    xz_scale.0,
                    y_scale.0,
                    xz_factor.0,
                    y_factor.0,
                    smear_scale_multiplier.0,
                );
                let (min, max) = (noise.min_value(), noise.max_value());
                self.push(DensityFunction::OldBlendedNoise(Arc::new(noise)), min, max)
            }
            F::Interpolated(x) => self.marker(MarkerKind::Interpolated, x)?,
            F::FlatCache(x) => self.marker(MarkerKind::FlatCache, x)?,
            F::Cache2d(x) => self.marker(MarkerKind::Cache2d, x)?,
            F::CacheOnce(x) => self.marker(MarkerKind::CacheOnce, x)?,
            F::CacheAllInCell(x) => self.marker(MarkerKind::CacheAllInCell, x)?,
            F::Noise {
                noise,
                xz_scale,
                y_scale,
            } => {
                let noise = self.noise(noise)?;
                let max = noise.max_value();
                let function = NoiseFunction {
                    noise,
                    xz_scale: xz_scale.0,
                    y_scale: y_scale.0,
                };
                self.push(DensityFunction::Noise(function), -max, max)
            }
            F::EndIslands => {
                let seed = self.random_state.seed();
                let islands = self
                    .end_islands
                    .get_or_insert_with(|| Arc::new(EndIslands::new(seed)))
                    .clone();
                self.push(
                    DensityFunction::EndIslands(islands),
                    EndIslands::MIN_VALUE,
                    EndIslands::MAX_VALUE,
                )
            }
            F::WeirdScaledSampler {
                input,
                noise,
                rarity_value_mapper,
            } => {
                let input = self.compile(input)?;
                let sampler = WeirdScaledSampler {
                    input,
                    noise: self.noise(noise)?,
                    rarity_value_mapper: *rarity_value_mapper,
                };
                let max = sampler.max_value();
                self.push(DensityFunction::WeirdScaledSampler(sampler), 0.0, max)
            }
            F::ShiftedNoise {
                shift_x,
                shift_y,
                shift_z,
                xz_scale,
                y_scale,
                noise,
            } => {
                let shift_x = self.compile(shift_x)?;
                let shift_y = self.compile(shift_y)?;
                let shift_z = self.compile(shift_z)?;
                let noise = self.noise(noise)?;
                let max = noise.max_value();
                let function = ShiftedNoise {
                    shift_x,
                    shift_y,
                    shift_z,
                    xz_scale: xz_scale.0,
                    y_scale: y_scale.0,
                    noise,
                };
                self.push(DensityFunction::ShiftedNoise(function), -max, max)
            }
            F::RangeChoice {
                input,
                min_inclusive,
                max_exclusive,
                when_in_range,
                when_out_of_range,
            } => {
                let input = self.compile(input)?;
                let when_in_range = self.compile(when_in_range)?;
                let when_out_of_range = self.compile(when_out_of_range)?;
                let (in_min, in_max) = self.bounds(when_in_range);
                let (out_min, out_max) = self.bounds(when_out_of_range);
                let function = RangeChoice {
                    input,
                    min_inclusive: min_inclusive.0,
                    max_exclusive: max_exclusive.0,
                    when_in_range,
                    when_out_of_range,
                };
                self.push(
                    DensityFunction::RangeChoice(function),
                    in_min.min(out_min),
                    in_max.max(out_max),
                )
            }
            F::ShiftA { argument } => self.shift(ShiftKind::A, argument)?,
            F::ShiftB { argument } => self.shift(ShiftKind::B, argument)?,
            F::Shift { argument } => self.shift(ShiftKind::All, argument)?,
            F::Clamp { input, min, max } => {
                let input = self.compile(input)?;
                let clamp = Clamp {
                    input,
                    min: min.0,
                    max: max.0,
                };
                self.push(DensityFunction::Clamp(clamp), min.0, max.0)
            }
            F::Abs(x) => self.unary(UnaryOp::Abs, x)?,
            F::Square(x) => self.unary(UnaryOp::Square, x)?,
            F::Cube(x) => self.unary(UnaryOp::Cube, x)?,
            F::HalfNegative(x) => self.unary(UnaryOp::HalfNegative, x)?,
            F::QuarterNegative(x) => self.unary(UnaryOp::QuarterNegative, x)?,
            F::Invert(x) => self.unary(UnaryOp::Invert, x)?,
            F::Squeeze(x) => self.unary(UnaryOp::Squeeze, x)?,
            F::Add(x) => self.binary(BinaryOp::Add, x)?,
            F::Mul(x) => self.binary(BinaryOp::Mul, x)?,
            F::Min(x) => self.binary(BinaryOp::Min, x)?,
            F::Max(x) => self.binary(BinaryOp::Max, x)?,
            F::Spline { spline } => {
                let spline = self.spline(spline)?;
                let (min, max) = (spline.min_value() as f64, spline.max_value() as f64);
                match spline {
                    CubicSpline::Constant(value) => {
                        self.push(DensityFunction::Constant(value as f64), min, max)
                    }
                    spline => self.push(DensityFunction::Spline(Box::new(spline)), min, max),
                }
            }
            F::YClampedGradient {
                from_y,
                to_y,
                from_value,
                to_value,
            } => {
                let gradient = YClampedGradient {
                    from_y: *from_y,
                    to_y: *to_y,
                    from_value: from_value.0,
                    to_value: to_value.0,
                };
                self.push(
                    DensityFunction::YClampedGradient(gradient),
                    from_value.0.min(to_value.0),
                    from_value.0.max(to_value.0),
                )
            }
            F::FindTopSurface {
                density,
                upper_bound,
                lower_bound,
                cell_height,
            } => {
                let density = self.compile(density)?;
                let upper_bound = self.compile(upper_bound)?;
                let (_, upper_max) = self.bounds(upper_bound);
                let function = FindTopSurface {
                    density,
                    upper_bound,
                    lower_bound: *lower_bound,
                    cell_height: (*cell_height).max(1) as i32,
                };
                self.push(
                    DensityFunction::FindTopSurface(function),
                    *lower_bound as f64,
                    (*lower_bound as f64).max(upper_max),
                )
            }
        })
    }

    fn marker(&mut self, kind: MarkerKind, x: &SingleArgumentFunction) -> Result<usize, BuildError> {
        let input = self.compile(&x.argument)?;
        let (min, max) = self.bounds(input);
        Ok(self.push(DensityFunction::Marker(Marker { kind, input }), min, max))
    }

    fn shift(&mut self, kind: ShiftKind, noise: &NoiseHolder) -> Result<usize, BuildError> {
        let shift = Shift {
            kind,
            noise: self.noise(noise)?,
        };
        let max = shift.max_value();
        Ok(self.push(DensityFunction::Shift(shift), -max, max))
    }

    fn unary(&mut self, op: UnaryOp, x: &SingleArgumentFunction) -> Result<usize, BuildError> {
        let input = self.compile(&x.argument)?;
        let (min, max) = self.bounds(input);
        let (min, max) = op.bounds(min, max);
        Ok(self.push(DensityFunction::Unary(Unary { op, input }), min, max))
    }

    fn binary(&mut self, op: BinaryOp, x: &TwoArgumentFunction) -> Result<usize, BuildError> {
        let argument1 = self.compile(&x.argument1)?;
        let argument2 = self.compile(&x.argument2)?;
        let a = self.bounds(argument1);
        let b = self.bounds(argument2);
        let (min, max) = op.bounds(a, b);
        let binary = Binary {
            op,
            argument1,
            argument2,
            argument2_min: b.0,
            argument2_max: b.1,
        };
        Ok(self.push(DensityFunction::Binary(binary), min, max))
    }

    fn spline(&mut self, holder: &SplineHolder) -> Result<CubicSpline<SplineCoordinate>, BuildError> {
        match holder {
            SplineHolder::Constant(value) => Ok(CubicSpline::Constant(value.0 as f32)),
            SplineHolder::Spline(spline) => {
                let index = self.compile(&spline.coordinate)?;
                let (min, max) = self.bounds(index);
                let coordinate = SplineCoordinate {
                    index,
                    min_value: min as f32,
                    max_value: max as f32,
                };
                let mut locations = Vec::with_capacity(spline.points.len());
                let mut values = Vec::with_capacity(spline.points.len());
                let mut derivatives = Vec::with_capacity(spline.points.len());
                for point in &spline.points {
                    locations.push(point.location.0 as f32);
                    values.push(self.spline(&point.value)?);
                    derivatives.push(point.derivative.0 as f32);
                }
                CubicSpline::multipoint(coordinate, locations, values, derivatives)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::density_function::DensityFunction;
    use crate::density_function::proto::{
        DensityFunctionHolder, ProtoDensityFunction, SingleArgumentFunction, TwoArgumentFunction,
    };
    use crate::error::BuildError;
    use crate::proto::ProtoNoiseRouter;
    use crate::random_state::RandomState;
    use crate::router::{NoiseRouter, RouterOutput};
    use bevy_math::IVec3;
    use std::collections::BTreeMap;

    fn build(
        holder: DensityFunctionHolder,
        functions: &BTreeMap<String, DensityFunctionHolder>,
    ) -> Result<NoiseRouter, BuildError> {
        let mut state = RandomState::new(42, false, BTreeMap::new());
        NoiseRouter::new(&ProtoNoiseRouter::uniform(holder), functions, &mut state)
    }

    fn parse(json: &str) -> DensityFunctionHolder {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn identical_subtrees_share_a_node() {
        let noise = parse(r#"{"type": "noise", "noise": "minecraft:ridge", "xz_scale": 1.0, "y_scale": 1.0}"#);
        let sum = DensityFunctionHolder::from(ProtoDensityFunction::Add(TwoArgumentFunction {
            argument1: noise.clone(),
            argument2: noise,
        }));
        let router = build(sum, &BTreeMap::new()).unwrap();
        // noise, add
        assert_eq!(router.len(), 2);
        let output = router.output(RouterOutput::FinalDensity);
        assert_eq!(output, router.output(RouterOutput::Barrier));
        let DensityFunction::Binary(binary) = &router.node(output).function else {
            panic!("expected a binary node");
        };
        assert_eq!(binary.argument1, binary.argument2);
        assert!(binary.argument1 < output);
    }

    #[test]
    fn references_resolve_and_cycles_fail() {
        let mut functions = BTreeMap::new();
        functions.insert("minecraft:half".to_owned(), DensityFunctionHolder::from(0.5));
        functions.insert(
            "minecraft:doubled".to_owned(),
            parse(r#"{"type": "mul", "argument1": "minecraft:half", "argument2": 4.0}"#),
        );
        let router = build(DensityFunctionHolder::from("doubled"), &functions).unwrap();
        assert_eq!(router.compute(RouterOutput::Depth, IVec3::new(3, 4, 5)), 2.0);

        functions.insert("minecraft:a".to_owned(), DensityFunctionHolder::from("minecraft:b"));
        functions.insert("minecraft:b".to_owned(), parse(r#"{"type": "abs", "argument": "minecraft:a"}"#));
        assert!(matches!(
            build(DensityFunctionHolder::from("minecraft:a"), &functions),
            Err(BuildError::CyclicReference(_))
        ));
        assert_eq!(
            build(DensityFunctionHolder::from("minecraft:nope"), &functions).unwrap_err(),
            BuildError::UnknownDensityFunction("minecraft:nope".into())
        );
    }

    #[test]
    fn blending_hooks_are_neutral() {
        let holder = parse(
            r#"{"type": "add",
                "argument1": {"type": "mul", "argument1": {"type": "blend_alpha"}, "argument2": 3.0},
                "argument2": {"type": "blend_density", "argument": {"type": "beardifier"}}}"#,
        );
        let router = build(holder, &BTreeMap::new()).unwrap();
        assert_eq!(router.compute(RouterOutput::FinalDensity, IVec3::ZERO), 3.0);
    }

    #[test]
    fn bounds_propagate() {
        let holder = parse(
            r#"{"type": "clamp", "min": -0.5, "max": 0.5, "input":
                {"type": "mul", "argument1": {"type": "y_clamped_gradient", "from_y": 0, "to_y": 10, "from_value": -2.0, "to_value": 1.0},
                 "argument2": -3.0}}"#,
        );
        let router = build(holder, &BTreeMap::new()).unwrap();
        assert_eq!(router.bounds(RouterOutput::FinalDensity), (-0.5, 0.5));
        let product = router.len() - 2;
        let node = router.node(product);
        assert_eq!((node.min_value, node.max_value), (-3.0, 6.0));
    }

    #[test]
    fn min_short_circuits_on_bounds() {
        let holder = parse(
            r#"{"type": "min", "argument1": -10.0, "argument2":
                {"type": "noise", "noise": "minecraft:ridge", "xz_scale": 1.0, "y_scale": 1.0}}"#,
        );
        let router = build(holder, &BTreeMap::new()).unwrap();
        assert_eq!(router.compute(RouterOutput::Erosion, IVec3::new(9, 9, 9)), -10.0);
    }

    #[test]
    fn markers_are_transparent_for_direct_sampling() {
        let inner = parse(r#"{"type": "noise", "noise": "minecraft:erosion", "xz_scale": 0.5, "y_scale": 0.0}"#);
        let wrapped = DensityFunctionHolder::from(ProtoDensityFunction::FlatCache(
            SingleArgumentFunction {
                argument: inner.clone(),
            },
        ));
        let plain = build(inner, &BTreeMap::new()).unwrap();
        let cached = build(wrapped, &BTreeMap::new()).unwrap();
        for pos in [IVec3::new(0, 0, 0), IVec3::new(17, 80, -33)] {
            assert_eq!(
                plain.compute(RouterOutput::Ridges, pos),
                cached.compute(RouterOutput::Ridges, pos)
            );
        }
    }

    #[test]
    fn evaluation_is_deterministic() {
        let holder = parse(
            r#"{"type": "shifted_noise", "noise": "minecraft:temperature", "xz_scale": 0.25, "y_scale": 0.0,
                "shift_x": {"type": "shift_a", "argument": "minecraft:offset"},
                "shift_y": 0.0,
                "shift_z": {"type": "shift_b", "argument": "minecraft:offset"}}"#,
        );
        let a = build(holder.clone(), &BTreeMap::new()).unwrap();
        let b = build(holder, &BTreeMap::new()).unwrap();
        for i in -4..4 {
            let pos = IVec3::new(i * 37, i * 5, -i * 91);
            let value = a.compute(RouterOutput::Temperature, pos);
            assert_eq!(value.to_bits(), a.compute(RouterOutput::Temperature, pos).to_bits());
            assert_eq!(value.to_bits(), b.compute(RouterOutput::Temperature, pos).to_bits());
        }
    }
}
