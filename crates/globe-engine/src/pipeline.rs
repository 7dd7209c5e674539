//! Per-tile pipeline steps and job dispatch.
//!
//! A tile only advances once its parent is renderable; until then the step
//! runs on the nearest ancestor whose own parent is, so work proceeds
//! coarse to fine and nothing finer than its ancestors is ever prepared.

use glam::DVec3;
use globe_geo::TileKey;
use globe_mesh::TileMesh;
use globe_render::{BufferKind, GpuAllocator, TextureCache, TextureStatus, UploadError};
use rustc_hash::FxHashSet;

use crate::node::{SurfaceSource, TextureSlot, TextureState, TileBuffers, TileState};
use crate::worker::{JobKind, TileJob};
use crate::{EngineContext, FrameStats, TerrainEngine};

/// Upper bound on synchronous transitions a node makes in one step.
const MAX_TRANSITIONS_PER_STEP: usize = 4;

enum Action {
    /// Nothing to do until a job or texture finishes.
    Wait,
    MeshFlat,
    Request,
    Load,
    Parse,
    RequestTextures,
    PollTextures,
    FallBack,
}

impl TerrainEngine {
    /// Advance every selected tile, plus the root.
    pub(crate) fn run_pipeline(
        &mut self,
        ctx: &mut EngineContext<'_>,
        selected: &[TileKey],
        camera: DVec3,
        stats: &mut FrameStats,
    ) {
        let loading = self
            .tree
            .nodes()
            .flat_map(|n| n.textures())
            .filter(|s| matches!(s.state, TextureState::Loading(_)))
            .count();
        let mut texture_budget = self.settings.max_concurrent_textures.saturating_sub(loading);
        stats.textures_loading = loading;

        let mut stepped = FxHashSet::default();
        for key in std::iter::once(TileKey::ROOT).chain(selected.iter().copied()) {
            let target = self.gate(key);
            if stepped.insert(target) {
                self.step(target, ctx, camera, &mut texture_budget, stats);
            }
        }
    }

    /// Whether children of `key` may advance.
    pub(crate) fn ready_for_children(&self, key: TileKey) -> bool {
        self.tree.is_renderable(key) || (key == TileKey::ROOT && self.root_seed.is_some())
    }

    /// The node that should take `key`'s pipeline step this frame.
    pub(crate) fn gate(&self, key: TileKey) -> TileKey {
        let mut target = key;
        while let Some(parent) = target.parent() {
            if self.ready_for_children(parent) {
                break;
            }
            target = parent;
        }
        target
    }

    fn step(
        &mut self,
        key: TileKey,
        ctx: &mut EngineContext<'_>,
        camera: DVec3,
        texture_budget: &mut usize,
        stats: &mut FrameStats,
    ) {
        for _ in 0..MAX_TRANSITIONS_PER_STEP {
            let Some(node) = self.tree.get_mut(key) else {
                return;
            };
            if node.busy {
                return;
            }
            let distance = node.bounding_sphere().distance_to(camera);
            let flat = node.force_virtual
                || self.settings.source == globe_config::TerrainSource::Virtual;

            let action = match &node.state {
                TileState::Unrequested if flat => Action::MeshFlat,
                TileState::Unrequested => Action::Request,
                TileState::Requested => Action::Load,
                TileState::BytesReady { .. } | TileState::Decoded { .. } => Action::Parse,
                TileState::MeshBuilt { .. } => Action::RequestTextures,
                TileState::TexturesPending { .. } => Action::PollTextures,
                TileState::Renderable { .. } => Action::Wait,
                TileState::Failed { .. } if self.settings.virtual_fallback_on_failure => {
                    Action::FallBack
                }
                TileState::Failed { .. } => Action::Wait,
            };

            match action {
                Action::Wait => return,
                Action::MeshFlat => {
                    node.state = TileState::Decoded {
                        surface: SurfaceSource::Virtual,
                    };
                }
                Action::Request => {
                    node.state = TileState::Requested;
                    self.loads.push(key, distance);
                    return;
                }
                Action::Load => {
                    self.loads.push(key, distance);
                    return;
                }
                Action::Parse => {
                    self.parses.push(key, distance);
                    return;
                }
                Action::RequestTextures => {
                    let TileState::MeshBuilt { mesh } =
                        std::mem::replace(&mut node.state, TileState::Unrequested)
                    else {
                        return;
                    };
                    node.textures = self
                        .settings
                        .layers_at(key.depth)
                        .map(|layer| TextureSlot {
                            layer_id: layer.id.clone(),
                            url: key.fill_template(&layer.url_template),
                            state: TextureState::Unrequested,
                        })
                        .collect();
                    node.state = TileState::TexturesPending { mesh };
                }
                Action::PollTextures => {
                    if !poll_textures(&mut node.textures, ctx.textures, texture_budget) {
                        return;
                    }
                    let TileState::TexturesPending { mesh } = &node.state else {
                        return;
                    };
                    match upload_mesh(ctx.gpu, key, mesh) {
                        Ok(buffers) => {
                            let mesh = mesh.clone();
                            node.state = TileState::Renderable { mesh, buffers };
                            tracing::debug!(tile = %key, "tile renderable");
                        }
                        Err(e) => {
                            stats.upload_failures += 1;
                            tracing::warn!(tile = %key, error = %e, "upload failed, will retry");
                        }
                    }
                    return;
                }
                Action::FallBack => {
                    tracing::debug!(tile = %key, "failed tile falls back to flat mesh");
                    node.force_virtual = true;
                    node.state = TileState::Decoded {
                        surface: SurfaceSource::Virtual,
                    };
                }
            }
        }
    }

    /// Hand queued work to the workers, up to each queue's in-flight cap.
    pub(crate) fn dispatch(&mut self, camera: DVec3) {
        while let Some(key) = self.loads.pop_ready() {
            let Some(node) = self.tree.get_mut(key) else {
                self.loads.finish();
                continue;
            };
            if node.busy || !matches!(node.state, TileState::Requested) {
                self.loads.finish();
                continue;
            }
            let job = TileJob {
                key,
                node: node.id,
                kind: JobKind::Fetch { path: key.path() },
            };
            node.busy = true;
            if self.workers.submit(job).is_err() {
                node.busy = false;
                let distance = node.bounding_sphere().distance_to(camera);
                self.loads.finish();
                self.loads.push(key, distance);
                break;
            }
        }

        while let Some(key) = self.parses.pop_ready() {
            let Some(node) = self.tree.get(key) else {
                self.parses.finish();
                continue;
            };
            let kind = match &node.state {
                TileState::BytesReady { bytes } if !node.busy => JobKind::Decode {
                    bytes: bytes.clone(),
                },
                TileState::Decoded { surface } if !node.busy => JobKind::Mesh {
                    spec: self.mesh_spec(key.depth, surface),
                    surface: surface.clone(),
                    extent: *node.extent(),
                },
                _ => {
                    self.parses.finish();
                    continue;
                }
            };
            let job = TileJob {
                key,
                node: node.id,
                kind,
            };
            let submitted = self.workers.submit(job).is_ok();
            let Some(node) = self.tree.get_mut(key) else {
                continue;
            };
            if submitted {
                node.busy = true;
            } else {
                let distance = node.bounding_sphere().distance_to(camera);
                self.parses.finish();
                self.parses.push(key, distance);
                break;
            }
        }
    }
}

/// Request and poll a tile's imagery. Returns `true` once every slot has
/// settled, ready or failed.
fn poll_textures(
    slots: &mut [TextureSlot],
    cache: &mut dyn TextureCache,
    budget: &mut usize,
) -> bool {
    for slot in slots.iter_mut() {
        slot.state = match slot.state {
            TextureState::Unrequested if *budget > 0 => {
                *budget -= 1;
                TextureState::Loading(cache.request_texture(&slot.url))
            }
            TextureState::Loading(handle) => match cache.status(handle) {
                TextureStatus::Loading => TextureState::Loading(handle),
                TextureStatus::Ready => TextureState::Ready(handle),
                TextureStatus::Failed => {
                    tracing::warn!(layer = %slot.layer_id, url = %slot.url, "imagery failed");
                    cache.release(handle);
                    TextureState::Failed
                }
            },
            other => other,
        };
    }
    slots.iter().all(|s| s.state.is_settled())
}

/// Upload a mesh's surface, index and skirt buffers. Nothing stays allocated
/// on failure.
pub(crate) fn upload_mesh(
    gpu: &mut dyn GpuAllocator,
    key: TileKey,
    mesh: &TileMesh,
) -> Result<TileBuffers, UploadError> {
    let label = format!("tile {key}");
    let vertices = gpu.upload(BufferKind::Vertex, &label, bytemuck::cast_slice(&mesh.vertices))?;
    let indices = match gpu.upload(BufferKind::Index, &label, bytemuck::cast_slice(&mesh.indices)) {
        Ok(h) => h,
        Err(e) => {
            gpu.release(vertices);
            return Err(e);
        }
    };
    let skirt = if mesh.skirt.is_empty() {
        None
    } else {
        match gpu.upload(BufferKind::Vertex, &label, bytemuck::cast_slice(&mesh.skirt)) {
            Ok(h) => Some((h, mesh.skirt.len() as u32)),
            Err(e) => {
                gpu.release(vertices);
                gpu.release(indices);
                return Err(e);
            }
        }
    };
    Ok(TileBuffers {
        vertices,
        indices,
        index_count: mesh.indices.len() as u32,
        skirt,
    })
}
