//! Engine settings resolved from the viewer configuration.

use globe_config::{Config, ImageryLayerConfig, Projection, TerrainSource};
use globe_geo::TileProjection;
use globe_lod::{DistanceThresholds, LodError};

/// Everything the engine reads from [`Config`], validated and in engine types.
#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub source: TerrainSource,
    pub projection: TileProjection,
    pub max_depth: u8,
    pub thresholds: DistanceThresholds,
    pub virtual_lon_segments: u32,
    pub virtual_lat_segments: u32,
    pub virtual_altitude_m: f64,
    pub skirt_depth_m: f64,
    pub max_concurrent_fetches: usize,
    pub max_concurrent_parses: usize,
    pub max_concurrent_textures: usize,
    pub max_deletions_per_frame: usize,
    pub fade_in_secs: f32,
    pub require_complete_siblings: bool,
    pub virtual_fallback_on_failure: bool,
    pub frustum_culling: bool,
    pub imagery: Vec<ImageryLayerConfig>,
}

impl EngineSettings {
    /// Resolve settings from a loaded config.
    ///
    /// An explicit threshold table wins over the halving default.
    pub fn from_config(config: &Config) -> Result<Self, LodError> {
        let thresholds = if config.lod.thresholds.is_empty() {
            DistanceThresholds::halving(config.lod.base_threshold_m, config.lod.max_depth)
        } else {
            DistanceThresholds::custom(config.lod.thresholds.clone())?
        };
        Ok(Self::with_thresholds(config, thresholds))
    }

    fn with_thresholds(config: &Config, thresholds: DistanceThresholds) -> Self {
        let projection = match config.tiles.projection {
            Projection::WebMercator => TileProjection::WebMercator,
            Projection::Crs84 => TileProjection::Crs84,
        };

        Self {
            source: config.tiles.source,
            projection,
            max_depth: config.lod.max_depth,
            thresholds,
            virtual_lon_segments: config.mesh.virtual_lon_segments,
            virtual_lat_segments: config.mesh.virtual_lat_segments,
            virtual_altitude_m: config.mesh.virtual_altitude_m,
            skirt_depth_m: config.mesh.skirt_depth_m,
            max_concurrent_fetches: config.queues.max_concurrent_fetches.max(1),
            max_concurrent_parses: config.queues.max_concurrent_parses.max(1),
            max_concurrent_textures: config.queues.max_concurrent_textures.max(1),
            max_deletions_per_frame: config.queues.max_deletions_per_frame,
            fade_in_secs: config.render.fade_in_secs,
            require_complete_siblings: config.render.require_complete_siblings,
            virtual_fallback_on_failure: config.render.virtual_fallback_on_failure,
            frustum_culling: config.render.frustum_culling,
            imagery: config.imagery.clone(),
        }
    }

    /// Imagery layers covering `depth`, in configured order.
    pub fn layers_at(&self, depth: u8) -> impl Iterator<Item = &ImageryLayerConfig> {
        self.imagery
            .iter()
            .filter(move |l| l.min_zoom <= depth && depth <= l.max_zoom)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        let config = Config::default();
        let thresholds =
            DistanceThresholds::halving(config.lod.base_threshold_m, config.lod.max_depth);
        Self::with_thresholds(&config, thresholds)
    }
}
