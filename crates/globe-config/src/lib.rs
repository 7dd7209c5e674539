//! Configuration system for the globe terrain viewer.
//!
//! Tile source, LOD, mesh, queue and render settings persist to disk as a RON
//! file. CLI overrides are applied on top via clap, and `reload` reports when
//! the file on disk has diverged from the running configuration.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE, Config, DebugConfig, ImageryLayerConfig, LodConfig, MAX_TILE_DEPTH, MeshConfig,
    Projection, QueueConfig, RenderConfig, TerrainSource, TilesConfig, default_config_dir,
};
pub use error::ConfigError;
