//! Tile nodes and their per-state payloads.
//!
//! Each [`TileState`] variant carries exactly the data valid in that state:
//! raw bytes only while waiting for decode, GPU handles only once renderable.

use std::sync::Arc;

use globe_codec::DecodedTile;
use globe_geo::{BoundingSphere, TileExtent, TileKey};
use globe_mesh::TileMesh;
use globe_render::{GpuAllocator, GpuBufferHandle, TextureCache, TextureHandle};

/// Unique per created node; results for a deleted node never match a new one.
pub type NodeId = u64;

/// Blend factor of a tile on its first drawn frame.
pub const INITIAL_BLEND: f32 = 0.1;

/// Where a tile's geometry comes from.
#[derive(Clone, Debug)]
pub enum SurfaceSource {
    /// Decoded elevation payload.
    Elevation(Arc<DecodedTile>),
    /// Flat ellipsoid grid; no elevation available.
    Virtual,
}

/// GPU buffers owned by a renderable tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileBuffers {
    pub vertices: GpuBufferHandle,
    pub indices: GpuBufferHandle,
    pub index_count: u32,
    /// Skirt strip, absent when the surface has no edge vertices.
    pub skirt: Option<(GpuBufferHandle, u32)>,
}

impl TileBuffers {
    #[must_use]
    pub fn handles(&self) -> Vec<GpuBufferHandle> {
        let mut out = vec![self.vertices, self.indices];
        out.extend(self.skirt.map(|(h, _)| h));
        out
    }

    /// Return every handle to the allocator.
    pub fn release(self, gpu: &mut dyn GpuAllocator) {
        for handle in self.handles() {
            gpu.release(handle);
        }
    }
}

/// Load state of a tile.
#[derive(Clone, Debug)]
pub enum TileState {
    Unrequested,
    /// Waiting in the load queue or being fetched.
    Requested,
    BytesReady { bytes: Arc<[u8]> },
    Decoded { surface: SurfaceSource },
    MeshBuilt { mesh: Arc<TileMesh> },
    TexturesPending { mesh: Arc<TileMesh> },
    Renderable { mesh: Arc<TileMesh>, buffers: TileBuffers },
    Failed { reason: String },
}

impl TileState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TileState::Unrequested => "unrequested",
            TileState::Requested => "requested",
            TileState::BytesReady { .. } => "bytes-ready",
            TileState::Decoded { .. } => "decoded",
            TileState::MeshBuilt { .. } => "mesh-built",
            TileState::TexturesPending { .. } => "textures-pending",
            TileState::Renderable { .. } => "renderable",
            TileState::Failed { .. } => "failed",
        }
    }

    #[must_use]
    pub fn is_renderable(&self) -> bool {
        matches!(self, TileState::Renderable { .. })
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, TileState::Failed { .. })
    }
}

/// Progress of one imagery layer on one tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureState {
    Unrequested,
    Loading(TextureHandle),
    Ready(TextureHandle),
    Failed,
}

impl TextureState {
    /// Ready or failed; either way nothing more will happen.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, TextureState::Ready(_) | TextureState::Failed)
    }

    #[must_use]
    pub fn handle(&self) -> Option<TextureHandle> {
        match *self {
            TextureState::Loading(h) | TextureState::Ready(h) => Some(h),
            _ => None,
        }
    }
}

/// One imagery layer slot on a tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureSlot {
    pub layer_id: String,
    pub url: String,
    pub state: TextureState,
}

/// A node of the terrain quadtree.
#[derive(Debug)]
pub struct TileNode {
    pub(crate) id: NodeId,
    pub(crate) key: TileKey,
    pub(crate) children: Option<[TileKey; 4]>,
    pub(crate) extent: TileExtent,
    pub(crate) sphere: Option<BoundingSphere>,
    pub(crate) state: TileState,
    pub(crate) textures: Vec<TextureSlot>,
    /// A worker job for this node has been submitted and not yet applied.
    pub(crate) busy: bool,
    /// Mesh flat regardless of the configured source.
    pub(crate) force_virtual: bool,
    /// Decoded elevation, kept past meshing for height queries.
    pub(crate) elevation: Option<Arc<DecodedTile>>,
    pub(crate) first_drawn: Option<f64>,
    pub(crate) last_drawn_frame: Option<u64>,
}

impl TileNode {
    pub(crate) fn new(id: NodeId, key: TileKey, extent: TileExtent) -> Self {
        Self {
            id,
            key,
            children: None,
            extent,
            sphere: None,
            state: TileState::Unrequested,
            textures: Vec::new(),
            busy: false,
            force_virtual: false,
            elevation: None,
            first_drawn: None,
            last_drawn_frame: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn key(&self) -> TileKey {
        self.key
    }

    /// Back-reference to the parent; `None` only for the root.
    #[must_use]
    pub fn parent(&self) -> Option<TileKey> {
        self.key.parent()
    }

    #[must_use]
    pub fn children(&self) -> Option<[TileKey; 4]> {
        self.children
    }

    #[must_use]
    pub fn extent(&self) -> &TileExtent {
        &self.extent
    }

    #[must_use]
    pub fn state(&self) -> &TileState {
        &self.state
    }

    #[must_use]
    pub fn textures(&self) -> &[TextureSlot] {
        &self.textures
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Bounding sphere, computed on first use.
    pub fn bounding_sphere(&mut self) -> BoundingSphere {
        *self
            .sphere
            .get_or_insert_with(|| BoundingSphere::from_extent(&self.extent.geographic))
    }

    /// Fade-in blend for a draw at `now` seconds.
    ///
    /// Starts at [`INITIAL_BLEND`] the first time the node is drawn and ramps
    /// linearly to 1 over `fade_in_secs`.
    pub fn blend_at(&mut self, now: f64, fade_in_secs: f32) -> f32 {
        let born = *self.first_drawn.get_or_insert(now);
        if fade_in_secs <= 0.0 {
            return 1.0;
        }
        let t = ((now - born) / f64::from(fade_in_secs)).clamp(0.0, 1.0) as f32;
        INITIAL_BLEND + (1.0 - INITIAL_BLEND) * t
    }

    /// Release every GPU buffer and texture the node holds and drop its payload.
    pub(crate) fn release_resources(
        &mut self,
        gpu: &mut dyn GpuAllocator,
        textures: &mut dyn TextureCache,
    ) {
        if let TileState::Renderable { buffers, .. } =
            std::mem::replace(&mut self.state, TileState::Unrequested)
        {
            buffers.release(gpu);
        }
        self.elevation = None;
        for slot in self.textures.drain(..) {
            if let Some(handle) = slot.state.handle() {
                textures.release(handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globe_geo::TileProjection;

    fn node() -> TileNode {
        TileNode::new(1, TileKey::ROOT, TileExtent::root(TileProjection::Crs84))
    }

    #[test]
    fn test_new_node_is_unrequested() {
        let n = node();
        assert_eq!(n.state().name(), "unrequested");
        assert!(n.children().is_none());
        assert!(n.parent().is_none());
        assert!(!n.is_busy());
    }

    #[test]
    fn test_bounding_sphere_cached() {
        let mut n = node();
        assert!(n.sphere.is_none());
        let a = n.bounding_sphere();
        assert_eq!(n.sphere, Some(a));
        assert_eq!(n.bounding_sphere(), a);
    }

    #[test]
    fn test_fade_in_ramp() {
        let mut n = node();
        assert_eq!(n.blend_at(10.0, 1.0), INITIAL_BLEND);
        assert!((n.blend_at(10.5, 1.0) - 0.55).abs() < 1e-6);
        assert_eq!(n.blend_at(11.0, 1.0), 1.0);
        assert_eq!(n.blend_at(30.0, 1.0), 1.0);
    }

    #[test]
    fn test_zero_fade_is_opaque() {
        let mut n = node();
        assert_eq!(n.blend_at(0.0, 0.0), 1.0);
    }

    #[test]
    fn test_buffer_handles_include_skirt() {
        let buffers = TileBuffers {
            vertices: GpuBufferHandle(1),
            indices: GpuBufferHandle(2),
            index_count: 6,
            skirt: Some((GpuBufferHandle(3), 8)),
        };
        assert_eq!(buffers.handles().len(), 3);
    }

    #[test]
    fn test_texture_state_settled() {
        assert!(!TextureState::Unrequested.is_settled());
        assert!(!TextureState::Loading(TextureHandle(1)).is_settled());
        assert!(TextureState::Ready(TextureHandle(1)).is_settled());
        assert!(TextureState::Failed.is_settled());
        assert_eq!(TextureState::Failed.handle(), None);
    }
}
