use crate::density_function::math::BinaryOp;
use crate::density_function::{DensityFunction, FunctionContext, Marker, MarkerKind, NodeSampler};
use crate::error::GenerationError;
use crate::proto::NoiseSettings;
use crate::router::wrapper::{Cache2d, CacheOnce, CellCache, FlatCache, Interpolator, Wrapper};
use crate::router::{NoiseRouter, RouterOutput};
use bevy_math::IVec3;
use mcrs_engine::world::chunk::ChunkPos;

/// Cell grid of one chunk column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLayout {
    pub cell_width: i32,
    pub cell_height: i32,
    pub count_xz: i32,
    pub count_y: i32,
    /// Lowest cell y, in cells.
    pub cell_min_y: i32,
    pub first_cell_x: i32,
    pub first_cell_z: i32,
}

impl CellLayout {
    pub fn new(settings: &NoiseSettings, chunk: ChunkPos) -> Self {
        let cell_width = settings.cell_width();
        let cell_height = settings.cell_height();
        Self {
            cell_width,
            cell_height,
            count_xz: 16 / cell_width,
            count_y: settings.height as i32 / cell_height,
            cell_min_y: settings.min_y.div_euclid(cell_height),
            first_cell_x: chunk.min_block_x().div_euclid(cell_width),
            first_cell_z: chunk.min_block_z().div_euclid(cell_width),
        }
    }

    #[inline]
    pub fn cell_volume(&self) -> usize {
        (self.cell_width * self.cell_width * self.cell_height) as usize
    }

    /// Quart columns covered by flat caches along each axis.
    #[inline]
    fn flat_size(&self) -> usize {
        ((self.count_xz * self.cell_width) >> 2) as usize + 1
    }
}

/// Position of a sample inside a chunk sweep, with the counters caches key on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub cell_start: IVec3,
    pub in_cell: IVec3,
    pub interpolation_counter: u64,
    pub array_counter: u64,
    pub array_index: usize,
    pub filling_cell: bool,
    pub interpolating: bool,
}

/// Context handed to chunk-bound evaluation. Plain points bypass per-sweep caches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleContext {
    Point(IVec3),
    Cursor(Cursor),
}

impl FunctionContext for SampleContext {
    #[inline]
    fn block_pos(&self) -> IVec3 {
        match self {
            SampleContext::Point(pos) => *pos,
            SampleContext::Cursor(cursor) => cursor.cell_start + cursor.in_cell,
        }
    }

    #[inline]
    fn single_point(pos: IVec3) -> Self {
        SampleContext::Point(pos)
    }
}

/// A [`NoiseRouter`] with per-chunk state installed for each marker node.
///
/// Wrapper state is indexed like the router's arena, so the same shared
/// subgraph always maps to the same wrapper within one chunk.
pub struct ChunkNoiseRouter<'a> {
    router: &'a NoiseRouter,
    layout: CellLayout,
    wrappers: Vec<Option<Wrapper>>,
    interpolators: Vec<usize>,
    cell_caches: Vec<usize>,
}

impl<'a> ChunkNoiseRouter<'a> {
    /// Installs wrappers bottom-up. Flat caches are filled here, inner ones first.
    pub fn new(router: &'a NoiseRouter, layout: CellLayout) -> Result<Self, GenerationError> {
        let mut chunk = Self {
            router,
            layout,
            wrappers: vec![None; router.len()],
            interpolators: Vec::new(),
            cell_caches: Vec::new(),
        };
        for (index, node) in router.nodes().iter().enumerate() {
            let DensityFunction::Marker(marker) = &node.function else {
                continue;
            };
            let wrapper = match marker.kind {
                MarkerKind::Interpolated => {
                    chunk.interpolators.push(index);
                    Wrapper::Interpolated(Interpolator::new(
                        layout.count_xz as usize,
                        layout.count_y as usize,
                    ))
                }
                MarkerKind::FlatCache => Wrapper::FlatCache(chunk.fill_flat_cache(marker.input)?),
                MarkerKind::Cache2d => Wrapper::Cache2d(Cache2d::default()),
                MarkerKind::CacheOnce => Wrapper::CacheOnce(CacheOnce::default()),
                MarkerKind::CacheAllInCell => {
                    chunk.cell_caches.push(index);
                    Wrapper::CellCache(CellCache::new(
                        layout.cell_width as usize,
                        layout.cell_height as usize,
                    ))
                }
            };
            chunk.wrappers[index] = Some(wrapper);
        }
        Ok(chunk)
    }

    #[inline]
    pub fn layout(&self) -> &CellLayout {
        &self.layout
    }

    #[inline]
    pub fn router(&self) -> &'a NoiseRouter {
        self.router
    }

    pub fn interpolator_count(&self) -> usize {
        self.interpolators.len()
    }

    pub fn compute(&mut self, output: RouterOutput, ctx: SampleContext) -> Result<f64, GenerationError> {
        let index = self.router.output(output);
        self.sample(index, ctx)
    }

    fn fill_flat_cache(&mut self, input: usize) -> Result<FlatCache, GenerationError> {
        let size = self.layout.flat_size();
        let first_quart_x = (self.layout.first_cell_x * self.layout.cell_width) >> 2;
        let first_quart_z = (self.layout.first_cell_z * self.layout.cell_width) >> 2;
        let mut values = Vec::with_capacity(size * size);
        for dx in 0..size as i32 {
            for dz in 0..size as i32 {
                let pos = IVec3::new((first_quart_x + dx) << 2, 0, (first_quart_z + dz) << 2);
                values.push(self.sample(input, SampleContext::Point(pos))?);
            }
        }
        Ok(FlatCache::new(first_quart_x, first_quart_z, size, values))
    }

    fn sample_marker(&mut self, index: usize, marker: Marker, ctx: SampleContext) -> Result<f64, GenerationError> {
        let pos = ctx.block_pos();
        match marker.kind {
            MarkerKind::FlatCache => {
                if let Some(Wrapper::FlatCache(cache)) = &self.wrappers[index] {
                    if let Some(value) = cache.get(pos.x, pos.z) {
                        return Ok(value);
                    }
                }
                self.sample(marker.input, ctx)
            }
            MarkerKind::Cache2d => {
                if let Some(Wrapper::Cache2d(cache)) = &self.wrappers[index] {
                    if let Some(value) = cache.get(pos.x, pos.z) {
                        return Ok(value);
                    }
                }
                let value = self.sample(marker.input, ctx)?;
                if let Some(Wrapper::Cache2d(cache)) = &mut self.wrappers[index] {
                    cache.store(pos.x, pos.z, value);
                }
                Ok(value)
            }
            MarkerKind::Interpolated => {
                let SampleContext::Cursor(cursor) = ctx else {
                    return self.sample(marker.input, ctx);
                };
                if !cursor.interpolating {
                    return Err(GenerationError::SampledOutsideSweep);
                }
                let Some(Wrapper::Interpolated(interpolator)) = &self.wrappers[index] else {
                    return self.sample(marker.input, ctx);
                };
                if cursor.filling_cell {
                    let width = self.layout.cell_width as f64;
                    let height = self.layout.cell_height as f64;
                    Ok(interpolator.lerp_in_cell(
                        cursor.in_cell.x as f64 / width,
                        cursor.in_cell.y as f64 / height,
                        cursor.in_cell.z as f64 / width,
                    ))
                } else {
                    Ok(interpolator.value())
                }
            }
            MarkerKind::CacheOnce => {
                let SampleContext::Cursor(cursor) = ctx else {
                    return self.sample(marker.input, ctx);
                };
                if !cursor.interpolating {
                    return Err(GenerationError::SampledOutsideSweep);
                }
                if let Some(Wrapper::CacheOnce(cache)) = &self.wrappers[index] {
                    if let Some(value) = cache.get(
                        cursor.interpolation_counter,
                        cursor.array_counter,
                        cursor.array_index,
                    ) {
                        return Ok(value);
                    }
                }
                let value = self.sample(marker.input, ctx)?;
                if let Some(Wrapper::CacheOnce(cache)) = &mut self.wrappers[index] {
                    cache.store(cursor.interpolation_counter, value);
                }
                Ok(value)
            }
            MarkerKind::CacheAllInCell => {
                let SampleContext::Cursor(cursor) = ctx else {
                    return self.sample(marker.input, ctx);
                };
                if !cursor.interpolating {
                    return Err(GenerationError::SampledOutsideSweep);
                }
                if let Some(Wrapper::CellCache(cache)) = &self.wrappers[index] {
                    let in_cell = cursor.in_cell;
                    if let Some(value) = cache.get(in_cell.x, in_cell.y, in_cell.z) {
                        return Ok(value);
                    }
                }
                self.sample(marker.input, ctx)
            }
        }
    }

    /// Evaluates node `index` once per context into `out`.
    fn fill_each(&mut self, index: usize, out: &mut [f64], contexts: &[SampleContext]) -> Result<(), GenerationError> {
        for (value, ctx) in out.iter_mut().zip(contexts) {
            *value = self.sample(index, *ctx)?;
        }
        Ok(())
    }

    /// Batch evaluation of node `index`. Combinators fill their first argument as a
    /// whole, and cache-once nodes reuse the last array filled under the same counter.
    pub fn fill_array(&mut self, index: usize, out: &mut [f64], contexts: &[SampleContext]) -> Result<(), GenerationError> {
        let router = self.router;
        match &router.node(index).function {
            DensityFunction::Marker(marker) => match marker.kind {
                MarkerKind::Interpolated => {
                    let filling_cell = matches!(
                        contexts.first(),
                        Some(SampleContext::Cursor(cursor)) if cursor.filling_cell
                    );
                    if filling_cell {
                        self.fill_each(index, out, contexts)
                    } else {
                        self.fill_each(marker.input, out, contexts)
                    }
                }
                MarkerKind::CacheOnce => {
                    let array_counter = match contexts.first() {
                        Some(SampleContext::Cursor(cursor)) => Some(cursor.array_counter),
                        _ => None,
                    };
                    if let (Some(counter), Some(Wrapper::CacheOnce(cache))) =
                        (array_counter, &self.wrappers[index])
                    {
                        if let Some(cached) = cache.array(counter, out.len()) {
                            out.copy_from_slice(cached);
                            return Ok(());
                        }
                    }
                    self.fill_array(marker.input, out, contexts)?;
                    if let (Some(counter), Some(Wrapper::CacheOnce(cache))) =
                        (array_counter, &mut self.wrappers[index])
                    {
                        cache.store_array(counter, out);
                    }
                    Ok(())
                }
                _ => self.fill_each(index, out, contexts),
            },
            DensityFunction::Binary(binary) => {
                self.fill_array(binary.argument1, out, contexts)?;
                if binary.op == BinaryOp::Add {
                    let mut second = vec![0.0; out.len()];
                    self.fill_array(binary.argument2, &mut second, contexts)?;
                    for (value, other) in out.iter_mut().zip(second) {
                        *value += other;
                    }
                } else {
                    for (value, ctx) in out.iter_mut().zip(contexts) {
                        *value = binary.combine(
                            *value,
                            |chunk: &mut Self| chunk.sample(binary.argument2, *ctx),
                            self,
                        )?;
                    }
                }
                Ok(())
            }
            DensityFunction::Unary(unary) => {
                self.fill_array(unary.input, out, contexts)?;
                for value in out.iter_mut() {
                    *value = unary.op.apply(*value);
                }
                Ok(())
            }
            DensityFunction::Clamp(clamp) => {
                self.fill_array(clamp.input, out, contexts)?;
                for value in out.iter_mut() {
                    *value = clamp.apply(*value);
                }
                Ok(())
            }
            _ => self.fill_each(index, out, contexts),
        }
    }

    /// Fills the y column at `z` of every interpolator's first or second slice.
    pub fn fill_slice_column(&mut self, first: bool, z: usize, contexts: &[SampleContext]) -> Result<(), GenerationError> {
        let mut column = vec![0.0; contexts.len()];
        for n in 0..self.interpolators.len() {
            let index = self.interpolators[n];
            let input = self.marker_input(index);
            self.fill_array(input, &mut column, contexts)?;
            if let Some(Wrapper::Interpolated(interpolator)) = &mut self.wrappers[index] {
                interpolator.put_column(first, z, &column);
            }
        }
        Ok(())
    }

    /// Fills every cell cache for the selected cell. `contexts` walks the cell
    /// top layer first, then x, then z.
    pub fn fill_cell_caches(&mut self, contexts: &[SampleContext]) -> Result<(), GenerationError> {
        for n in 0..self.cell_caches.len() {
            let index = self.cell_caches[n];
            let input = self.marker_input(index);
            let mut values = match &mut self.wrappers[index] {
                Some(Wrapper::CellCache(cache)) => cache.take_values(),
                _ => continue,
            };
            values.resize(contexts.len(), 0.0);
            let filled = self.fill_array(input, &mut values, contexts);
            if let Some(Wrapper::CellCache(cache)) = &mut self.wrappers[index] {
                cache.put_values(values);
            }
            filled?;
        }
        Ok(())
    }

    fn marker_input(&self, index: usize) -> usize {
        match &self.router.node(index).function {
            DensityFunction::Marker(marker) => marker.input,
            _ => index,
        }
    }

    fn for_each_interpolator(&mut self, mut f: impl FnMut(&mut Interpolator)) {
        for &index in &self.interpolators {
            if let Some(Wrapper::Interpolated(interpolator)) = &mut self.wrappers[index] {
                f(interpolator);
            }
        }
    }

    pub fn select_cell_yz(&mut self, cell_y: usize, cell_z: usize) {
        self.for_each_interpolator(|interpolator| interpolator.select_cell_yz(cell_y, cell_z));
    }

    pub fn update_for_y(&mut self, delta: f64) {
        self.for_each_interpolator(|interpolator| interpolator.update_for_y(delta));
    }

    pub fn update_for_x(&mut self, delta: f64) {
        self.for_each_interpolator(|interpolator| interpolator.update_for_x(delta));
    }

    pub fn update_for_z(&mut self, delta: f64) {
        self.for_each_interpolator(|interpolator| interpolator.update_for_z(delta));
    }

    pub fn swap_slices(&mut self) {
        self.for_each_interpolator(Interpolator::swap_slices);
    }
}

impl NodeSampler<SampleContext> for ChunkNoiseRouter<'_> {
    type Error = GenerationError;

    fn sample(&mut self, index: usize, ctx: SampleContext) -> Result<f64, GenerationError> {
        let router = self.router;
        match &router.node(index).function {
            DensityFunction::Marker(marker) => self.sample_marker(index, *marker, ctx),
            function => function.compute(self, ctx),
        }
    }
}
