pub mod surface_height;

use crate::aquifer::{Aquifer, FluidKind};
use crate::chunk::surface_height::SurfaceHeightEstimator;
use crate::error::GenerationError;
use crate::proto::NoiseSettings;
use crate::router::chunk::{CellLayout, ChunkNoiseRouter, Cursor, SampleContext};
use crate::router::{NoiseRouter, RouterOutput};
use bevy_math::IVec3;
use mcrs_engine::world::chunk::ChunkPos;

/// What a block position is filled with after the density sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substance {
    Air,
    /// The generator's default block.
    Solid,
    Fluid(FluidKind),
}

/// Chunk-scoped evaluator. Owns the per-chunk wrappers and the sweep cursor,
/// and hands explicit [`SampleContext`] values to the wrapped graph.
///
/// A sweep runs `initialize_for_first_cell_x`, then per cell x `advance_cell_x`,
/// per cell `select_cell_yz` and per block `update_for_y`, `update_for_x`,
/// `update_for_z`, then `swap_slices`, and ends with `stop_interpolation`.
pub struct NoiseChunk<'a> {
    router: ChunkNoiseRouter<'a>,
    layout: CellLayout,
    heights: SurfaceHeightEstimator<'a>,
    aquifer: Option<Aquifer>,
    cell_start: IVec3,
    in_cell: IVec3,
    interpolation_counter: u64,
    array_counter: u64,
    array_index: usize,
    interpolating: bool,
    filling_cell: bool,
}

impl<'a> NoiseChunk<'a> {
    pub fn new(
        router: &'a NoiseRouter,
        settings: &NoiseSettings,
        chunk: ChunkPos,
        aquifer: Option<Aquifer>,
    ) -> Result<Self, GenerationError> {
        let layout = CellLayout::new(settings, chunk);
        Ok(Self {
            router: ChunkNoiseRouter::new(router, layout)?,
            layout,
            heights: SurfaceHeightEstimator::new(router),
            aquifer,
            cell_start: IVec3::ZERO,
            in_cell: IVec3::ZERO,
            interpolation_counter: 0,
            array_counter: 0,
            array_index: 0,
            interpolating: false,
            filling_cell: false,
        })
    }

    #[inline]
    pub fn layout(&self) -> &CellLayout {
        &self.layout
    }

    #[inline]
    pub fn is_interpolating(&self) -> bool {
        self.interpolating
    }

    #[inline]
    pub fn interpolation_counter(&self) -> u64 {
        self.interpolation_counter
    }

    #[inline]
    pub fn array_counter(&self) -> u64 {
        self.array_counter
    }

    /// Current sweep position.
    #[inline]
    pub fn block_pos(&self) -> IVec3 {
        self.cell_start + self.in_cell
    }

    pub fn cursor(&self) -> Cursor {
        Cursor {
            cell_start: self.cell_start,
            in_cell: self.in_cell,
            interpolation_counter: self.interpolation_counter,
            array_counter: self.array_counter,
            array_index: self.array_index,
            filling_cell: self.filling_cell,
            interpolating: self.interpolating,
        }
    }

    #[inline]
    pub fn context(&self) -> SampleContext {
        SampleContext::Cursor(self.cursor())
    }

    /// Evaluates a router output at the current sweep position.
    pub fn sample(&mut self, output: RouterOutput) -> Result<f64, GenerationError> {
        let ctx = self.context();
        self.router.compute(output, ctx)
    }

    /// Evaluates a router output at an arbitrary position, bypassing sweep caches.
    pub fn sample_at(&mut self, output: RouterOutput, pos: IVec3) -> Result<f64, GenerationError> {
        self.router.compute(output, SampleContext::Point(pos))
    }

    /// Estimated surface y of the quart column holding block `x`, `z`.
    pub fn preliminary_surface_level(&mut self, x: i32, z: i32) -> i32 {
        self.heights.estimate(x, z)
    }

    pub fn initialize_for_first_cell_x(&mut self) -> Result<(), GenerationError> {
        if self.interpolating {
            return Err(GenerationError::SweepAlreadyActive);
        }
        self.interpolating = true;
        self.interpolation_counter = 0;
        self.fill_slice(true, self.layout.first_cell_x)
    }

    /// Fills the far slice for cell x `cell_x` (relative to the chunk).
    pub fn advance_cell_x(&mut self, cell_x: i32) -> Result<(), GenerationError> {
        if !self.interpolating {
            return Err(GenerationError::SweepNotActive);
        }
        let first_cell_x = self.layout.first_cell_x;
        self.fill_slice(false, first_cell_x + cell_x + 1)?;
        self.cell_start.x = (first_cell_x + cell_x) * self.layout.cell_width;
        Ok(())
    }

    fn fill_slice(&mut self, first: bool, cell_x: i32) -> Result<(), GenerationError> {
        let layout = self.layout;
        self.cell_start.x = cell_x * layout.cell_width;
        self.in_cell.x = 0;
        let mut contexts = Vec::with_capacity(layout.count_y as usize + 1);
        for z in 0..=layout.count_xz {
            self.cell_start.z = (layout.first_cell_z + z) * layout.cell_width;
            self.in_cell.z = 0;
            self.array_counter += 1;
            contexts.clear();
            for y in 0..=layout.count_y {
                self.cell_start.y = (y + layout.cell_min_y) * layout.cell_height;
                self.interpolation_counter += 1;
                self.in_cell.y = 0;
                self.array_index = y as usize;
                contexts.push(self.context());
            }
            self.router.fill_slice_column(first, z as usize, &contexts)?;
        }
        self.array_counter += 1;
        Ok(())
    }

    /// Selects the cell at `cell_y`, `cell_z` (relative to the chunk) and fills
    /// every cell cache for it.
    pub fn select_cell_yz(&mut self, cell_y: i32, cell_z: i32) -> Result<(), GenerationError> {
        let layout = self.layout;
        if !(0..layout.count_y).contains(&cell_y) || !(0..layout.count_xz).contains(&cell_z) {
            return Err(GenerationError::CellOutOfRange {
                cell_y,
                cell_z,
                count_y: layout.count_y,
                count_xz: layout.count_xz,
            });
        }
        self.router.select_cell_yz(cell_y as usize, cell_z as usize);
        self.filling_cell = true;
        self.cell_start.y = (cell_y + layout.cell_min_y) * layout.cell_height;
        self.cell_start.z = (layout.first_cell_z + cell_z) * layout.cell_width;
        self.array_counter += 1;

        let (width, height) = (layout.cell_width, layout.cell_height);
        let mut contexts = Vec::with_capacity(layout.cell_volume());
        for y in (0..height).rev() {
            for x in 0..width {
                for z in 0..width {
                    self.in_cell = IVec3::new(x, y, z);
                    self.interpolation_counter += 1;
                    self.array_index = contexts.len();
                    contexts.push(self.context());
                }
            }
        }
        let filled = self.router.fill_cell_caches(&contexts);
        self.array_counter += 1;
        self.filling_cell = false;
        filled
    }

    pub fn update_for_y(&mut self, block_y: i32, delta: f64) {
        self.in_cell.y = block_y - self.cell_start.y;
        self.router.update_for_y(delta);
    }

    pub fn update_for_x(&mut self, block_x: i32, delta: f64) {
        self.in_cell.x = block_x - self.cell_start.x;
        self.router.update_for_x(delta);
    }

    pub fn update_for_z(&mut self, block_z: i32, delta: f64) {
        self.in_cell.z = block_z - self.cell_start.z;
        self.interpolation_counter += 1;
        self.router.update_for_z(delta);
    }

    pub fn swap_slices(&mut self) {
        self.router.swap_slices();
    }

    pub fn stop_interpolation(&mut self) -> Result<(), GenerationError> {
        if !self.interpolating {
            return Err(GenerationError::SweepNotActive);
        }
        self.interpolating = false;
        Ok(())
    }

    /// Decides the substance at the current sweep position. Non-positive density
    /// goes to the aquifer when there is one, and is the default block otherwise.
    pub fn substance(&mut self) -> Result<Substance, GenerationError> {
        let ctx = self.context();
        let density = self.router.compute(RouterOutput::FinalDensity, ctx)?;
        if density > 0.0 {
            return Ok(Substance::Air);
        }
        let Some(aquifer) = &mut self.aquifer else {
            return Ok(Substance::Solid);
        };
        Ok(
            match aquifer.compute_substance(&mut self.router, &mut self.heights, ctx, density)? {
                Some(fluid) => Substance::Fluid(fluid),
                None => Substance::Air,
            },
        )
    }

    /// Whether the last fluid returned by [`NoiseChunk::substance`] needs a tick.
    pub fn should_schedule_fluid_update(&self) -> bool {
        self.aquifer
            .as_ref()
            .is_some_and(Aquifer::should_schedule_fluid_update)
    }
}
