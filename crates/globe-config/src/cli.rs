//! Command-line argument parsing for the globe viewer.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, TerrainSource};

/// Globe viewer command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "globe", about = "Quadtree terrain streaming viewer")]
pub struct CliArgs {
    /// Directory holding `{depth}/{x}/{y}.terrain` files.
    #[arg(long)]
    pub tiles: Option<String>,

    /// Deepest quadtree level to refine to.
    #[arg(long)]
    pub max_depth: Option<u8>,

    /// Ignore elevation tiles and render the flat ellipsoid.
    #[arg(long)]
    pub virtual_only: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of frames to simulate before exiting.
    #[arg(long, default_value_t = 600)]
    pub frames: u32,

    /// Write a synthetic tile set to this directory and exit.
    #[arg(long)]
    pub write_synthetic: Option<PathBuf>,

    /// Keep tile buffers in host memory instead of looking for a GPU adapter.
    #[arg(long)]
    pub headless: bool,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref root) = args.tiles {
            self.tiles.root = root.clone();
        }
        if let Some(depth) = args.max_depth {
            self.lod.max_depth = depth;
        }
        if args.virtual_only {
            self.tiles.source = TerrainSource::Virtual;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            tiles: Some("/srv/dem".to_string()),
            max_depth: Some(9),
            virtual_only: true,
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.tiles.root, "/srv/dem");
        assert_eq!(config.lod.max_depth, 9);
        assert_eq!(config.tiles.source, TerrainSource::Virtual);
        // Non-overridden fields retain defaults
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from(["globe", "--max-depth", "4", "--virtual-only", "--headless"]);
        assert_eq!(args.max_depth, Some(4));
        assert!(args.virtual_only);
        assert!(args.headless);
        assert_eq!(args.frames, 600);
    }

    #[test]
    fn test_cli_depth_override_is_validated() {
        let mut config = Config::default();
        let args = CliArgs::parse_from(["globe", "--max-depth", "32"]);
        config.apply_cli_overrides(&args);
        assert!(config.validate().is_err());
    }
}
