use crate::config::TerrainConfig;
use bevy_app::{App, AppExit, Plugin, Startup, Update};
use bevy_ecs::message::MessageWriter;
use bevy_ecs::prelude::Resource;
use bevy_ecs::schedule::IntoScheduleConfigs;
use bevy_ecs::system::{Res, ResMut};
use bevy_tasks::futures_lite::future;
use bevy_tasks::{Task, TaskPool, TaskPoolBuilder, block_on};
use mcrs_engine::world::block::BlockStateId;
use mcrs_engine::world::chunk::heightmap::HeightmapKind;
use mcrs_engine::world::chunk::{ChunkAccess, ChunkPos};
use mcrs_worldgen::generator::NoiseBasedGenerator;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Generates a square of chunks around the origin on the "ChunkGen" pool, then exits.
pub struct ChunkPlugin {
    pub generator: Arc<NoiseBasedGenerator>,
    pub config: TerrainConfig,
}

impl Plugin for ChunkPlugin {
    fn build(&self, app: &mut App) {
        let threads = self.config.threads.max(1);
        CHUNK_TASK_POOL.get_or_init(|| {
            TaskPoolBuilder::new()
                .thread_name("ChunkGen".to_string())
                .num_threads(threads)
                .build()
        });
        app.insert_resource(TerrainGenerator(self.generator.clone()));
        app.insert_resource(GenerationArea {
            radius: self.config.radius.max(0),
        });
        app.insert_resource(LoadingChunks::default());
        app.insert_resource(GenerationStats::default());
        app.add_systems(Startup, dispatch_chunks);
        app.add_systems(Update, (process_generated_chunks, exit_when_done).chain());
    }
}

static CHUNK_TASK_POOL: OnceLock<TaskPool> = OnceLock::new();

#[derive(Resource)]
struct TerrainGenerator(Arc<NoiseBasedGenerator>);

#[derive(Resource)]
struct GenerationArea {
    radius: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSummary {
    pub non_air: usize,
    pub fluid_ticks: usize,
    pub highest_surface: i32,
    pub elapsed: Duration,
}

struct GeneratedChunk {
    pos: ChunkPos,
    outcome: anyhow::Result<ChunkSummary>,
}

#[derive(Resource, Default)]
struct LoadingChunks {
    tasks: Vec<Task<GeneratedChunk>>,
}

#[derive(Resource, Default)]
struct GenerationStats {
    started: Option<Instant>,
    dispatched: usize,
    generated: usize,
    failed: usize,
}

/// Fills and paints one chunk, summarising what landed in it.
pub fn generate_chunk(generator: &NoiseBasedGenerator, pos: ChunkPos) -> anyhow::Result<ChunkSummary> {
    let start = Instant::now();
    let mut chunk = generator.new_chunk(pos)?;
    generator.generate(&mut chunk)?;
    let non_air = chunk
        .count_states()
        .iter()
        .filter(|(state, _)| *state != BlockStateId::AIR)
        .map(|(_, count)| count)
        .sum();
    let mut highest_surface = chunk.min_y();
    for x in 0..16 {
        for z in 0..16 {
            highest_surface = highest_surface.max(chunk.height_at(
                HeightmapKind::WorldSurfaceWg,
                pos.min_block_x() + x,
                pos.min_block_z() + z,
            ));
        }
    }
    Ok(ChunkSummary {
        non_air,
        fluid_ticks: chunk.fluid_ticks().len(),
        highest_surface,
        elapsed: start.elapsed(),
    })
}

fn dispatch_chunks(
    generator: Res<TerrainGenerator>,
    area: Res<GenerationArea>,
    mut loading_chunks: ResMut<LoadingChunks>,
    mut stats: ResMut<GenerationStats>,
) {
    let Some(task_pool) = CHUNK_TASK_POOL.get() else {
        error!("ChunkGen task pool is not initialised");
        return;
    };
    stats.started = Some(Instant::now());
    let radius = area.radius;

    for x in -radius..=radius {
        for z in -radius..=radius {
            let pos = ChunkPos::new(x, z);
            let generator = generator.0.clone();
            let task = task_pool.spawn(async move {
                let _span = tracing::info_span!("ChunkGen").entered();
                GeneratedChunk {
                    pos,
                    outcome: generate_chunk(&generator, pos),
                }
            });
            loading_chunks.tasks.push(task);
            stats.dispatched += 1;
        }
    }

    if stats.dispatched > 0 {
        info!("Dispatched generation tasks for {} chunks", stats.dispatched);
    }
}

fn process_generated_chunks(
    mut loading_chunks: ResMut<LoadingChunks>,
    mut stats: ResMut<GenerationStats>,
) {
    loading_chunks.tasks.retain_mut(|task| {
        let Some(generated) = block_on(future::poll_once(task)) else {
            return true;
        };
        match generated.outcome {
            Ok(summary) => {
                info!(
                    "Generated chunk {} in {:?}: {} blocks, {} fluid ticks, surface up to y {}",
                    generated.pos,
                    summary.elapsed,
                    summary.non_air,
                    summary.fluid_ticks,
                    summary.highest_surface
                );
                stats.generated += 1;
            }
            Err(err) => {
                error!("Chunk {} failed: {:#}", generated.pos, err);
                stats.failed += 1;
            }
        }
        false
    });
}

fn exit_when_done(
    loading_chunks: Res<LoadingChunks>,
    stats: Res<GenerationStats>,
    mut exit: MessageWriter<AppExit>,
) {
    if !loading_chunks.tasks.is_empty() {
        return;
    }
    let elapsed = stats.started.map(|started| started.elapsed()).unwrap_or_default();
    info!(
        "Generated {} of {} chunks in {:?}",
        stats.generated, stats.dispatched, elapsed
    );
    if stats.failed > 0 {
        exit.write(AppExit::error());
    } else {
        exit.write(AppExit::Success);
    }
}
