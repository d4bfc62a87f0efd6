use crate::chunk::ChunkPlugin;
use crate::config::TerrainConfig;
use anyhow::Context;
use bevy_app::{App, AppExit, ScheduleRunnerPlugin, TaskPoolPlugin};
use bevy_log::LogPlugin;
use mcrs_worldgen::generator::NoiseBasedGenerator;
use mcrs_worldgen::preset;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod chunk;
mod config;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = TerrainConfig::load(config_path.as_deref())?;
    let settings = config.settings()?;

    let mut app = App::new();
    // Installed first so generator construction is already logged.
    app.add_plugins(LogPlugin::default());
    let generator = NoiseBasedGenerator::new(
        settings,
        config.seed,
        &preset::biome_source(),
        Arc::new(preset::block_states()),
        Arc::new(preset::biome_registry()),
    )
    .context("building the terrain generator")?;

    let exit = app
        .add_plugins(TaskPoolPlugin::default())
        .add_plugins(ScheduleRunnerPlugin::run_loop(Duration::from_millis(5)))
        .add_plugins(ChunkPlugin {
            generator: Arc::new(generator),
            config,
        })
        .run();
    match exit {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => anyhow::bail!("terrain generation failed with exit code {}", code),
    }
}
