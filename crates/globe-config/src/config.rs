//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level viewer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where tiles come from and how they are projected.
    pub tiles: TilesConfig,
    /// Level-of-detail selection.
    pub lod: LodConfig,
    /// Mesh synthesis parameters.
    pub mesh: MeshConfig,
    /// Work queue limits.
    pub queues: QueueConfig,
    /// Rendering policy.
    pub render: RenderConfig,
    /// Imagery layers draped over the terrain, in draw order.
    pub imagery: Vec<ImageryLayerConfig>,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Source of elevation data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TerrainSource {
    /// Fetch binary elevation tiles from `TilesConfig::root`.
    Elevation,
    /// No elevation source; every tile uses the flat ellipsoid mesh.
    Virtual,
}

/// Projection of the imagery pyramid the terrain is textured with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Projection {
    /// Spherical mercator (EPSG:3857).
    WebMercator,
    /// Equirectangular longitude/latitude (CRS84).
    Crs84,
}

/// Tile source configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TilesConfig {
    /// Elevation source kind.
    pub source: TerrainSource,
    /// Directory or URL prefix tile paths are resolved against.
    pub root: String,
    /// Projection used for quadrant bisection and texture coordinates.
    pub projection: Projection,
}

/// LOD selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Deepest quadtree level that will ever be created.
    pub max_depth: u8,
    /// Threshold at depth 0 in meters; halved for every deeper level.
    pub base_threshold_m: f64,
    /// Explicit per-depth thresholds; overrides `base_threshold_m` when non-empty.
    pub thresholds: Vec<f64>,
}

/// Mesh synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeshConfig {
    /// Longitude segments of the virtual grid.
    pub virtual_lon_segments: u32,
    /// Latitude segments of the virtual grid.
    pub virtual_lat_segments: u32,
    /// Altitude of the virtual grid above the ellipsoid, in meters.
    pub virtual_altitude_m: f64,
    /// How far skirts hang below the tile edge, in meters.
    pub skirt_depth_m: f64,
}

/// Work queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum byte fetches in flight at once.
    pub max_concurrent_fetches: usize,
    /// Maximum decode/mesh jobs in flight at once.
    pub max_concurrent_parses: usize,
    /// Maximum imagery requests in flight at once.
    pub max_concurrent_textures: usize,
    /// Worker thread count (0 = number of CPUs minus one).
    pub worker_threads: usize,
    /// Upper bound on subtree deletions performed per frame.
    pub max_deletions_per_frame: usize,
}

/// Rendering policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Seconds for a freshly drawn tile to blend from 0.1 to fully opaque.
    pub fade_in_secs: f32,
    /// Draw a tile only when all four siblings are ready; otherwise draw the parent.
    pub require_complete_siblings: bool,
    /// Replace a tile whose elevation failed with the flat virtual mesh.
    pub virtual_fallback_on_failure: bool,
    /// Skip tiles whose bounding sphere lies outside the view frustum.
    pub frustum_culling: bool,
}

/// One imagery layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageryLayerConfig {
    /// Stable identifier used as the texture slot key.
    pub id: String,
    /// URL template with `{x}`, `{y}` and `{z}` placeholders.
    pub url_template: String,
    /// Shallowest depth the layer applies to.
    pub min_zoom: u8,
    /// Deepest depth the layer applies to.
    pub max_zoom: u8,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log a one-line frame summary every N frames (0 = never).
    pub stats_interval_frames: u32,
}

// --- Default implementations ---

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            source: TerrainSource::Elevation,
            root: "tiles".to_string(),
            projection: Projection::WebMercator,
        }
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            max_depth: 18,
            base_threshold_m: 20_000_000.0,
            thresholds: Vec::new(),
        }
    }
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            virtual_lon_segments: 20,
            virtual_lat_segments: 20,
            virtual_altitude_m: 0.0,
            skirt_depth_m: 50_000.0,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 2,
            max_concurrent_parses: 2,
            max_concurrent_textures: 2,
            worker_threads: 0,
            max_deletions_per_frame: 32,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fade_in_secs: 1.0,
            require_complete_siblings: true,
            virtual_fallback_on_failure: true,
            frustum_culling: false,
        }
    }
}

impl Default for ImageryLayerConfig {
    fn default() -> Self {
        Self {
            id: "base".to_string(),
            url_template: "imagery/{z}/{x}/{y}.png".to_string(),
            min_zoom: 0,
            max_zoom: 18,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_interval_frames: 60,
        }
    }
}

/// Platform config directory for the viewer (`<config>/globe`), if one exists.
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("globe"))
}

/// File name inside the config directory.
pub const CONFIG_FILE: &str = "config.ron";

/// Deepest quadtree level a tile key can address (`x`, `y` are `u32`).
pub const MAX_TILE_DEPTH: u8 = 31;

// --- Load / Save / Reload ---

impl Config {
    /// Load `config.ron` from `config_dir`, writing the defaults there first if
    /// the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Wrote default config to {}", path.display());
            return Ok(config);
        }
        let config = Self::read(&path)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write this config to `config_dir/config.ron`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let write_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ConfigError::Write { path, source }
        };
        std::fs::create_dir_all(config_dir).map_err(write_err(config_dir))?;

        let path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;
        std::fs::write(&path, text).map_err(write_err(&path))
    }

    /// Re-read the file on disk. `Some` carries the new config when it
    /// differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read(&config_dir.join(CONFIG_FILE))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Config changed on disk");
        Ok(Some(fresh))
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lod.max_depth > MAX_TILE_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "lod.max_depth {} exceeds {MAX_TILE_DEPTH}",
                self.lod.max_depth
            )));
        }
        let q = &self.queues;
        if q.max_concurrent_fetches == 0 || q.max_concurrent_parses == 0 {
            return Err(ConfigError::Invalid(
                "queue concurrency limits must be at least 1".to_string(),
            ));
        }
        if self.mesh.virtual_lon_segments == 0 || self.mesh.virtual_lat_segments == 0 {
            return Err(ConfigError::Invalid(
                "virtual mesh needs at least one segment per axis".to_string(),
            ));
        }
        if let Some(layer) = self.imagery.iter().find(|l| l.min_zoom > l.max_zoom) {
            return Err(ConfigError::Invalid(format!(
                "imagery layer '{}' has min_zoom {} above max_zoom {}",
                layer.id, layer.min_zoom, layer.max_zoom
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("max_depth: 18"));
        assert!(ron_str.contains("skirt_depth_m: 50000.0"));
        assert!(ron_str.contains("WebMercator"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.imagery.push(ImageryLayerConfig::default());
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let ron_str = "(tiles: (root: \"/data/dem\"), lod: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.tiles.root, "/data/dem");
        assert_eq!(config.tiles.projection, Projection::WebMercator);
        assert_eq!(config.queues, QueueConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let ron_str = "(future_setting: true)";
        let result: Result<Config, _> = ron::from_str(ron_str);
        assert!(result.is_ok());
    }

    #[test]
    fn test_default_queue_limits_are_two() {
        let q = QueueConfig::default();
        assert_eq!(q.max_concurrent_fetches, 2);
        assert_eq!(q.max_concurrent_parses, 2);
        assert_eq!(q.max_concurrent_textures, 2);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.tiles.source = TerrainSource::Virtual;
        config.lod.max_depth = 12;
        config.lod.thresholds = vec![1.0e7, 5.0e6];

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.render.fade_in_secs = 0.25;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().render.fade_in_secs, 0.25);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn test_validate_rejects_zero_fetch_limit() {
        let mut config = Config::default();
        config.queues.max_concurrent_fetches = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_zoom_range() {
        let mut config = Config::default();
        config.imagery.push(ImageryLayerConfig {
            id: "sat".to_string(),
            min_zoom: 10,
            max_zoom: 3,
            ..Default::default()
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_bounds_max_depth() {
        let mut config = Config::default();
        config.lod.max_depth = MAX_TILE_DEPTH;
        assert!(config.validate().is_ok());
        config.lod.max_depth = MAX_TILE_DEPTH + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
