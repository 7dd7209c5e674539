//! Headless globe viewer.
//!
//! Streams elevation tiles from a directory (meshing the flat ellipsoid where
//! there are none) while a scripted camera descends from orbit, and logs the
//! engine's frame statistics along the way.
//!
//! Run with: `cargo run -p globe-viewer -- --tiles ./tiles --frames 900`
//! Generate test data with: `cargo run -p globe-viewer -- --write-synthetic ./tiles --max-depth 4`

mod flight;
mod gpu;
mod source;
mod synthetic;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use globe_config::{CliArgs, Config, TerrainSource, default_config_dir};
use globe_engine::{
    EngineContext, EngineSettings, FetchService, FrameStats, FrameView, NoElevation,
    TerrainEngine,
};
use globe_render::{DrawList, GpuAllocator, TextureCache};
use tracing::{error, info};

use flight::Flight;
use gpu::Uploads;
use source::{DirectoryFetcher, FileTextures};

/// Wall-clock pacing between simulated frames.
const FRAME_PACE: Duration = Duration::from_millis(16);

const FRAME_SECS: f64 = 1.0 / 60.0;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(default_config_dir)
        .unwrap_or_else(|| PathBuf::from(".globe"));

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    globe_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    // Overrides bypass the checks made on load.
    if let Err(e) = config.validate() {
        error!(error = %e, "invalid configuration");
        return ExitCode::FAILURE;
    }

    let settings = match EngineSettings::from_config(&config) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "invalid LOD configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.write_synthetic {
        return match synthetic::write_tile_set(dir, config.lod.max_depth, settings.projection) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "synthetic tile set not written");
                ExitCode::FAILURE
            }
        };
    }

    let fetcher: Arc<dyn FetchService> = match config.tiles.source {
        TerrainSource::Elevation => Arc::new(DirectoryFetcher::new(&config.tiles.root)),
        TerrainSource::Virtual => Arc::new(NoElevation),
    };
    let mut engine = match TerrainEngine::from_config(&config, fetcher) {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "engine not created");
            return ExitCode::FAILURE;
        }
    };

    let mut uploads = Uploads::select(args.headless);
    let mut textures = FileTextures::new(&config.tiles.root);
    let mut draws = DrawList::new();
    let flight = Flight {
        frames: args.frames,
        ..Flight::default()
    };
    info!(
        tiles = %config.tiles.root,
        source = ?config.tiles.source,
        buffers = uploads.name(),
        frames = flight.frames,
        "starting descent"
    );

    let last = fly(
        &mut engine,
        &flight,
        &mut uploads,
        &mut textures,
        &mut draws,
        config.debug.stats_interval_frames,
        FRAME_PACE,
    );
    info!(
        %last,
        bytes_in_use = uploads.bytes_in_use(),
        "descent finished"
    );

    land(&mut engine, &mut uploads, &mut textures, &mut draws);
    if uploads.live_count() > 0 {
        error!(leaked = uploads.live_count(), "buffers still live after shutdown");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Run the engine along `flight`, logging stats every `stats_interval` frames.
fn fly(
    engine: &mut TerrainEngine,
    flight: &Flight,
    gpu: &mut dyn GpuAllocator,
    textures: &mut dyn TextureCache,
    draws: &mut DrawList,
    stats_interval: u32,
    pace: Duration,
) -> FrameStats {
    let mut last = FrameStats::default();
    for frame in 0..flight.frames {
        draws.clear();
        let view = FrameView::at(flight.position_at(frame), f64::from(frame) * FRAME_SECS);
        let mut ctx = EngineContext {
            gpu: &mut *gpu,
            textures: &mut *textures,
            backend: &mut *draws,
        };
        last = engine.frame(&mut ctx, &view);

        if stats_interval > 0 && last.frame % u64::from(stats_interval) == 0 {
            info!(
                altitude_km = flight.altitude_at(frame) / 1000.0,
                draw_calls = draws.draw_count(),
                %last,
                "frame"
            );
        }
        if !pace.is_zero() {
            std::thread::sleep(pace);
        }
    }
    last
}

/// Release everything the engine holds.
fn land(
    engine: &mut TerrainEngine,
    gpu: &mut dyn GpuAllocator,
    textures: &mut dyn TextureCache,
    draws: &mut DrawList,
) {
    draws.clear();
    let mut ctx = EngineContext {
        gpu,
        textures,
        backend: draws,
    };
    engine.shutdown(&mut ctx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use globe_engine::{TileState, TileWorkers};
    use globe_geo::{TileKey, TileProjection};
    use gpu::HostBuffers;

    #[test]
    fn test_descent_over_synthetic_tiles() {
        let dir = tempfile::tempdir().unwrap();
        synthetic::write_tile_set(dir.path(), 2, TileProjection::WebMercator).unwrap();

        let mut config = Config::default();
        config.lod.max_depth = 2;
        let settings = EngineSettings::from_config(&config).unwrap();
        let fetcher = Arc::new(DirectoryFetcher::new(dir.path()));
        let mut engine = TerrainEngine::new(settings, TileWorkers::inline(fetcher));

        let mut gpu = HostBuffers::default();
        let mut textures = FileTextures::new(dir.path());
        let mut draws = DrawList::new();
        let flight = Flight {
            frames: 150,
            ..Flight::default()
        };
        let last = fly(
            &mut engine,
            &flight,
            &mut gpu,
            &mut textures,
            &mut draws,
            0,
            Duration::ZERO,
        );
        assert!(last.drawn > 0);
        assert_eq!(last.uncovered, 0);
        assert_eq!(last.failed, 0);
        let Some(TileState::Renderable { mesh, .. }) = engine.state_of(TileKey::ROOT) else {
            panic!("root not renderable");
        };
        assert_eq!(mesh.vertices.len(), 81);

        land(&mut engine, &mut gpu, &mut textures, &mut draws);
        assert_eq!(gpu.live_count(), 0);
        assert_eq!(gpu.bytes_in_use(), 0);
    }

    #[test]
    fn test_virtual_descent_without_tiles() {
        let mut config = Config::default();
        config.tiles.source = TerrainSource::Virtual;
        config.lod.max_depth = 3;
        let settings = EngineSettings::from_config(&config).unwrap();
        let mut engine = TerrainEngine::new(settings, TileWorkers::inline(Arc::new(NoElevation)));

        let mut gpu = HostBuffers::default();
        let mut textures = FileTextures::new("unused");
        let mut draws = DrawList::new();
        let flight = Flight {
            frames: 90,
            ..Flight::default()
        };
        let last = fly(
            &mut engine,
            &flight,
            &mut gpu,
            &mut textures,
            &mut draws,
            30,
            Duration::ZERO,
        );
        assert!(last.nodes > 1);
        assert_eq!(last.uncovered, 0);
        assert!(draws.draw_count() > 0);
    }
}
