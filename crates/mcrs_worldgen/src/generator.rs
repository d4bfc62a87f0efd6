use crate::aquifer::{Aquifer, FluidKind, FluidPicker};
use crate::biome::{BiomeRegistry, BiomeSource, BiomeSourceSettings};
use crate::chunk::{NoiseChunk, Substance};
use crate::error::{BuildError, GenerationError};
use crate::proto::NoiseGeneratorSettings;
use crate::random_state::{RandomState, qualified};
use crate::router::NoiseRouter;
use crate::surface::SurfaceSystem;
use mcrs_engine::world::block::{BlockPos, BlockStateId, BlockStates};
use mcrs_engine::world::chunk::{ChunkAccess, ChunkError, ChunkPos, ProtoChunk};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Fills chunks from a bound density graph and paints their surface.
///
/// Everything inside is read-only after construction, so one generator is
/// shared by every chunk task.
pub struct NoiseBasedGenerator {
    settings: NoiseGeneratorSettings,
    random_state: RandomState,
    router: Arc<NoiseRouter>,
    biome_source: Arc<dyn BiomeSource>,
    blocks: Arc<BlockStates>,
    surface: SurfaceSystem,
    default_block: BlockStateId,
    default_fluid: BlockStateId,
    lava: BlockStateId,
}

impl NoiseBasedGenerator {
    pub fn new(
        settings: NoiseGeneratorSettings,
        seed: u64,
        biome_source: &BiomeSourceSettings,
        blocks: Arc<BlockStates>,
        biomes: Arc<BiomeRegistry>,
    ) -> Result<Self, BuildError> {
        settings.noise.validate()?;
        settings.aquifer.validate()?;
        let resolve = |name: &str| {
            blocks
                .id(&qualified(name))
                .ok_or_else(|| BuildError::UnknownBlock(name.to_owned()))
        };
        let default_block = resolve(&settings.default_block.name)?;
        let default_fluid = resolve(&settings.default_fluid.name)?;
        let lava = match blocks.id("minecraft:lava") {
            Some(lava) => lava,
            None if !settings.aquifers_enabled => default_fluid,
            None => return Err(BuildError::UnknownBlock("minecraft:lava".to_owned())),
        };

        let mut random_state = RandomState::new(
            seed,
            settings.legacy_random_source,
            settings.noises.clone(),
        );
        let router = Arc::new(NoiseRouter::new(
            &settings.noise_router,
            &settings.density_functions,
            &mut random_state,
        )?);
        let biome_source = biome_source.build(router.clone(), &biomes)?;
        let surface = SurfaceSystem::new(&settings, &mut random_state, &blocks, biomes)?;
        info!(
            "built noise generator for seed {}: {} nodes, {} noises, {} surface conditions",
            seed,
            router.len(),
            random_state.noise_count(),
            surface.rules().condition_count()
        );
        Ok(Self {
            settings,
            random_state,
            router,
            biome_source,
            blocks,
            surface,
            default_block,
            default_fluid,
            lava,
        })
    }

    #[inline]
    pub fn settings(&self) -> &NoiseGeneratorSettings {
        &self.settings
    }

    #[inline]
    pub fn router(&self) -> &Arc<NoiseRouter> {
        &self.router
    }

    #[inline]
    pub fn random_state(&self) -> &RandomState {
        &self.random_state
    }

    #[inline]
    pub fn biome_source(&self) -> &Arc<dyn BiomeSource> {
        &self.biome_source
    }

    #[inline]
    pub fn blocks(&self) -> &Arc<BlockStates> {
        &self.blocks
    }

    #[inline]
    pub fn surface(&self) -> &SurfaceSystem {
        &self.surface
    }

    /// An empty chunk shaped like this generator's world.
    pub fn new_chunk(&self, pos: ChunkPos) -> Result<ProtoChunk, ChunkError> {
        let noise = self.settings.noise;
        ProtoChunk::new(pos, noise.min_y, noise.height, self.blocks.clone())
    }

    fn check_shape(&self, chunk: &ProtoChunk) -> Result<(), GenerationError> {
        let noise = self.settings.noise;
        if chunk.min_y() != noise.min_y || chunk.height() != noise.height {
            return Err(GenerationError::ChunkMismatch {
                chunk_min_y: chunk.min_y(),
                chunk_height: chunk.height() as i32,
            });
        }
        Ok(())
    }

    /// Runs the density sweep over `chunk`, writing blocks, heightmaps and fluid ticks.
    ///
    /// On error the chunk is left partially filled and should be discarded.
    pub fn fill_from_noise(&self, chunk: &mut ProtoChunk) -> Result<(), GenerationError> {
        self.check_shape(chunk)?;
        let noise = self.settings.noise;
        let _pins = chunk.pin_sections(noise.min_y, noise.max_y() - 1);
        let start = Instant::now();
        let pos = chunk.pos();

        let aquifer = self.settings.aquifers_enabled.then(|| {
            let aquifer = self.settings.aquifer;
            Aquifer::new(
                *self.random_state.aquifer_random(),
                FluidPicker::new(self.settings.sea_level, aquifer.deep_lava_level),
                aquifer,
            )
        });
        let result = NoiseChunk::new(&self.router, &noise, pos, aquifer)
            .and_then(|mut noise_chunk| self.sweep(&mut noise_chunk, chunk));
        match result {
            Ok(written) => {
                debug!(
                    "filled chunk {} in {:?}: {} blocks, {} fluid ticks",
                    pos,
                    start.elapsed(),
                    written,
                    chunk.fluid_ticks().len()
                );
                Ok(())
            }
            Err(err) => {
                error!("aborted fill of chunk {}: {}", pos, err);
                Err(err)
            }
        }
    }

    fn sweep(
        &self,
        noise_chunk: &mut NoiseChunk,
        chunk: &mut ProtoChunk,
    ) -> Result<usize, GenerationError> {
        let layout = *noise_chunk.layout();
        let (width, height) = (layout.cell_width, layout.cell_height);
        let min_x = layout.first_cell_x * width;
        let min_z = layout.first_cell_z * width;
        let mut written = 0;

        noise_chunk.initialize_for_first_cell_x()?;
        for cell_x in 0..layout.count_xz {
            noise_chunk.advance_cell_x(cell_x)?;
            for cell_z in 0..layout.count_xz {
                for cell_y in (0..layout.count_y).rev() {
                    noise_chunk.select_cell_yz(cell_y, cell_z)?;
                    for y_in in (0..height).rev() {
                        let y = (layout.cell_min_y + cell_y) * height + y_in;
                        noise_chunk.update_for_y(y, y_in as f64 / height as f64);
                        for x_in in 0..width {
                            let x = min_x + cell_x * width + x_in;
                            noise_chunk.update_for_x(x, x_in as f64 / width as f64);
                            for z_in in 0..width {
                                let z = min_z + cell_z * width + z_in;
                                noise_chunk.update_for_z(z, z_in as f64 / width as f64);
                                let (state, fluid) = match noise_chunk.substance()? {
                                    Substance::Air => continue,
                                    Substance::Solid => (self.default_block, false),
                                    Substance::Fluid(FluidKind::Water) => (self.default_fluid, true),
                                    Substance::Fluid(FluidKind::Lava) => (self.lava, true),
                                };
                                let pos = BlockPos::new(x, y, z);
                                chunk.set_block_state(pos, state);
                                written += 1;
                                if fluid && noise_chunk.should_schedule_fluid_update() {
                                    chunk.schedule_fluid_tick(pos);
                                }
                            }
                        }
                    }
                }
            }
            noise_chunk.swap_slices();
        }
        noise_chunk.stop_interpolation()?;
        Ok(written)
    }

    /// Replaces the default block near the surface of a filled chunk.
    pub fn build_surface(&self, chunk: &mut ProtoChunk) -> Result<(), GenerationError> {
        self.check_shape(chunk)?;
        let start = Instant::now();
        self.surface
            .build_surface(chunk, self.biome_source.as_ref(), &self.router);
        debug!("built surface of chunk {} in {:?}", chunk.pos(), start.elapsed());
        Ok(())
    }

    pub fn generate(&self, chunk: &mut ProtoChunk) -> Result<(), GenerationError> {
        self.fill_from_noise(chunk)?;
        self.build_surface(chunk)
    }
}
