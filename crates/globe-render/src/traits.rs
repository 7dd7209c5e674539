//! Collaborator interfaces the tile engine renders through.
//!
//! All three are driven from the render thread only. Handles are opaque
//! integers so fakes and real backends can share the engine code.

use globe_geo::TileKey;
use globe_mesh::SplitCenter;

use crate::UploadError;

/// Opaque reference to an uploaded GPU buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuBufferHandle(pub u64);

/// Opaque reference to an imagery texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Usage of an uploaded buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

impl BufferKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BufferKind::Vertex => "vertex",
            BufferKind::Index => "index",
        }
    }
}

/// Shared GPU buffer service.
pub trait GpuAllocator {
    /// Copy `bytes` into a new buffer of the given kind.
    fn upload(
        &mut self,
        kind: BufferKind,
        label: &str,
        bytes: &[u8],
    ) -> Result<GpuBufferHandle, UploadError>;

    /// Give a buffer back. Each handle is released exactly once.
    fn release(&mut self, handle: GpuBufferHandle);
}

/// Progress of a texture request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureStatus {
    Loading,
    Ready,
    Failed,
}

/// Shared imagery cache.
pub trait TextureCache {
    /// Start (or join) a request for the image at `url`.
    fn request_texture(&mut self, url: &str) -> TextureHandle;

    /// Current state of a requested texture.
    fn status(&self, handle: TextureHandle) -> TextureStatus;

    /// Drop one reference to a texture.
    fn release(&mut self, handle: TextureHandle);
}

/// Receiver of draw calls for one frame.
pub trait RenderBackend {
    /// Start a tile: set its re-basing origin and fade-in blend factor.
    fn begin_tile(&mut self, key: TileKey, origin: SplitCenter, blend: f32);

    /// Bind an imagery texture to a layer slot for the current tile.
    fn bind_texture(&mut self, handle: TextureHandle, slot: u32);

    /// Indexed triangle-list draw of the tile surface.
    fn draw_indexed(&mut self, vertices: GpuBufferHandle, indices: GpuBufferHandle, index_count: u32);

    /// Triangle-strip draw of the tile skirt.
    fn draw_strip(&mut self, vertices: GpuBufferHandle, vertex_count: u32);
}
