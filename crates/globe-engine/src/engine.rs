//! The terrain engine facade and its frame loop.
//!
//! One call to [`TerrainEngine::frame`] per rendered frame:
//!
//! 1. seed the root with a flat mesh so something always covers the globe
//! 2. apply worker results as state transitions
//! 3. run LOD selection and update the delete queue
//! 4. advance the pipeline of every selected tile (or the ancestor gating it)
//! 5. dispatch queued fetch and decode/mesh jobs up to the in-flight caps
//! 6. draw, substituting ancestors for tiles that are not ready
//! 7. remove subtrees the selection no longer needs

use std::sync::Arc;

use globe_geo::TileKey;
use globe_lod::{Frustum, LodError, LodSelector};
use globe_mesh::{MeshParams, NormalMode, TileMesh};
use globe_render::GpuAllocator;

use crate::node::{SurfaceSource, TileBuffers, TileNode, TileState};
use crate::pipeline::upload_mesh;
use crate::queue::{DeleteQueue, WorkQueue};
use crate::tree::TileTree;
use crate::worker::{JobOutput, JobQueue, MeshSpec, TileWorkers, build_mesh};
use crate::{EngineContext, EngineSettings, FetchService, FrameStats, FrameView};

/// Streams, meshes and draws the terrain quadtree.
pub struct TerrainEngine {
    pub(crate) settings: EngineSettings,
    pub(crate) tree: TileTree,
    pub(crate) selector: LodSelector,
    pub(crate) workers: TileWorkers,
    pub(crate) loads: WorkQueue,
    pub(crate) parses: WorkQueue,
    pub(crate) deletes: DeleteQueue,
    /// Flat root mesh drawn until the real root is renderable.
    pub(crate) root_seed: Option<(Arc<TileMesh>, TileBuffers)>,
    pub(crate) frame: u64,
}

impl TerrainEngine {
    pub fn new(settings: EngineSettings, workers: TileWorkers) -> Self {
        let selector = LodSelector::new(settings.thresholds.clone(), settings.max_depth);
        let loads = WorkQueue::new("load", settings.max_concurrent_fetches);
        let parses = WorkQueue::new("parse", settings.max_concurrent_parses);
        tracing::info!(
            max_depth = settings.max_depth,
            source = ?settings.source,
            projection = ?settings.projection,
            workers = workers.threads(),
            "terrain engine created"
        );
        Self {
            tree: TileTree::new(settings.projection),
            settings,
            selector,
            workers,
            loads,
            parses,
            deletes: DeleteQueue::new(),
            root_seed: None,
            frame: 0,
        }
    }

    /// Engine with a worker pool sized from the config.
    pub fn from_config(
        config: &globe_config::Config,
        fetcher: Arc<dyn FetchService>,
    ) -> Result<Self, LodError> {
        let settings = EngineSettings::from_config(config)?;
        let capacity = (settings.max_concurrent_fetches + settings.max_concurrent_parses) * 2;
        let workers = TileWorkers::with_threads(config.queues.worker_threads, capacity, fetcher);
        Ok(Self::new(settings, workers))
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn tree(&self) -> &TileTree {
        &self.tree
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    #[must_use]
    pub fn state_of(&self, key: TileKey) -> Option<&TileState> {
        self.tree.get(key).map(|n| n.state())
    }

    /// Terrain height in meters at (`lon`°, `lat`°).
    ///
    /// Sampled from the deepest tile under the point that holds decoded
    /// elevation, so ancestors answer until deeper tiles finish decoding.
    /// `None` when no decoded tile covers the point.
    #[must_use]
    pub fn height_at(&self, lon: f64, lat: f64) -> Option<f64> {
        let covers = |node: &&TileNode| node.extent.geographic.contains(lon, lat);
        let mut node = self.tree.get(TileKey::ROOT).filter(covers)?;
        let mut path = vec![node];
        while let Some(child) = node
            .children
            .and_then(|keys| keys.into_iter().filter_map(|k| self.tree.get(k)).find(covers))
        {
            path.push(child);
            node = child;
        }

        path.iter().rev().find_map(|node| {
            let tile = node.elevation.as_ref()?;
            let e = &node.extent.geographic;
            tile.height_at(
                (lon - e.min_lon) / e.lon_range(),
                (lat - e.min_lat) / e.lat_range(),
            )
        })
    }

    #[must_use]
    pub fn delete_queue(&self) -> &DeleteQueue {
        &self.deletes
    }

    /// Whether the root is currently drawn from its flat seed mesh.
    #[must_use]
    pub fn root_seeded(&self) -> bool {
        self.root_seed.is_some()
    }

    /// Run one frame.
    pub fn frame(&mut self, ctx: &mut EngineContext<'_>, view: &FrameView) -> FrameStats {
        self.frame += 1;
        let mut stats = FrameStats {
            frame: self.frame,
            ..FrameStats::default()
        };

        self.maintain_root_seed(ctx.gpu);
        self.apply_results(&mut stats);

        let frustum = if self.settings.frustum_culling {
            view.view_projection
                .map(|vp| Frustum::from_view_projection(&vp))
        } else {
            None
        };
        let selection = self
            .selector
            .select(&mut self.tree, TileKey::ROOT, view.camera, frustum.as_ref());
        stats.selected = selection.render.len();
        stats.culled = selection.culled;

        self.schedule_deletions(&selection);
        self.run_pipeline(ctx, &selection.render, view.camera, &mut stats);
        self.dispatch(view.camera);
        self.render(ctx.backend, &selection.render, view.time_secs, &mut stats);
        self.process_deletions(ctx, &mut stats);

        stats.nodes = self.tree.len();
        stats.created = self.tree.take_created();
        stats.renderable = self
            .tree
            .nodes()
            .filter(|n| n.state().is_renderable())
            .count();
        stats.pending_deletions = self.deletes.len();
        stats.pending_loads = self.loads.len();
        stats.pending_parses = self.parses.len();
        stats.loads_in_flight = self.loads.in_flight();
        stats.parses_in_flight = self.parses.in_flight();
        tracing::trace!(%stats, "frame done");
        stats
    }

    /// Put a failed tile back to `Unrequested` so its pipeline restarts.
    pub fn retry(&mut self, key: TileKey) -> bool {
        let Some(node) = self.tree.get_mut(key) else {
            return false;
        };
        if !node.state.is_failed() {
            return false;
        }
        node.state = TileState::Unrequested;
        node.force_virtual = false;
        tracing::debug!(tile = %key, "retrying failed tile");
        true
    }

    /// Release every GPU buffer and texture the engine holds.
    pub fn shutdown(&mut self, ctx: &mut EngineContext<'_>) {
        if let Some((_, seed)) = self.root_seed.take() {
            seed.release(ctx.gpu);
        }
        for node in self.tree.nodes_mut() {
            node.release_resources(ctx.gpu, ctx.textures);
        }
        tracing::info!(frames = self.frame, "terrain engine shut down");
    }

    pub(crate) fn mesh_spec(&self, depth: u8, surface: &SurfaceSource) -> MeshSpec {
        let normals = match surface {
            SurfaceSource::Elevation(_) => NormalMode::Accumulated,
            SurfaceSource::Virtual => NormalMode::Radial,
        };
        MeshSpec {
            params: MeshParams {
                depth,
                projection: self.settings.projection,
                skirt_depth: self.settings.skirt_depth_m,
                normals,
            },
            virtual_lon_segments: self.settings.virtual_lon_segments,
            virtual_lat_segments: self.settings.virtual_lat_segments,
            virtual_altitude_m: self.settings.virtual_altitude_m,
        }
    }

    /// Keep a flat root mesh uploaded until the real root can be drawn.
    fn maintain_root_seed(&mut self, gpu: &mut dyn GpuAllocator) {
        if self.tree.is_renderable(TileKey::ROOT) {
            if let Some((_, seed)) = self.root_seed.take() {
                seed.release(gpu);
                tracing::debug!("root seed released");
            }
            return;
        }
        if self.root_seed.is_some() {
            return;
        }
        let Some(root) = self.tree.get(TileKey::ROOT) else {
            return;
        };
        let spec = self.mesh_spec(0, &SurfaceSource::Virtual);
        let mesh = Arc::new(build_mesh(&SurfaceSource::Virtual, root.extent(), &spec));
        match upload_mesh(gpu, TileKey::ROOT, &mesh) {
            Ok(buffers) => {
                tracing::info!(vertices = mesh.vertices.len(), "root seeded with flat mesh");
                self.root_seed = Some((mesh, buffers));
            }
            Err(e) => tracing::warn!(error = %e, "root seed upload failed"),
        }
    }

    /// Turn drained worker results into state transitions.
    ///
    /// Results for deleted or recreated nodes, or for a node that has since
    /// moved on, are dropped.
    fn apply_results(&mut self, stats: &mut FrameStats) {
        for result in self.workers.drain_results() {
            match result.queue {
                JobQueue::Load => self.loads.finish(),
                JobQueue::Parse => self.parses.finish(),
            }
            let Some(node) = self.tree.get_mut(result.key) else {
                tracing::debug!(tile = %result.key, "result for deleted tile discarded");
                continue;
            };
            if node.id != result.node {
                tracing::debug!(tile = %result.key, "stale result discarded");
                continue;
            }
            node.busy = false;

            let key = result.key;
            let next = match (result.output, &node.state) {
                (JobOutput::Fetched(Ok(bytes)), TileState::Requested) => TileState::BytesReady {
                    bytes: Arc::from(bytes),
                },
                (JobOutput::Fetched(Err(e)), TileState::Requested) if e.is_missing() => {
                    tracing::debug!(tile = %key, "no elevation, meshing flat");
                    node.force_virtual = true;
                    TileState::Decoded {
                        surface: SurfaceSource::Virtual,
                    }
                }
                (JobOutput::Fetched(Err(e)), TileState::Requested) => {
                    failed(key, e.to_string(), stats)
                }
                (JobOutput::Decoded(Ok(tile)), TileState::BytesReady { .. }) => {
                    node.elevation = Some(Arc::clone(&tile));
                    TileState::Decoded {
                        surface: SurfaceSource::Elevation(tile),
                    }
                }
                (JobOutput::Decoded(Err(e)), TileState::BytesReady { .. }) => {
                    failed(key, e.to_string(), stats)
                }
                (JobOutput::Meshed(mesh), TileState::Decoded { .. }) => {
                    TileState::MeshBuilt { mesh }
                }
                _ => continue,
            };
            tracing::debug!(
                tile = %key,
                from = node.state.name(),
                to = next.name(),
                elapsed_us = result.elapsed_us,
                "tile advanced"
            );
            node.state = next;
        }
    }
}

fn failed(key: TileKey, reason: String, stats: &mut FrameStats) -> TileState {
    tracing::warn!(tile = %key, %reason, "tile failed");
    stats.failed += 1;
    TileState::Failed { reason }
}
