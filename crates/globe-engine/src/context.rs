//! Per-frame inputs: the camera and the shared collaborators.

use glam::{DMat4, DVec3};
use globe_render::{GpuAllocator, RenderBackend, TextureCache};

/// Camera state for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameView {
    /// Camera position, earth-centered meters.
    pub camera: DVec3,
    /// View-projection matrix, used only when frustum culling is enabled.
    pub view_projection: Option<DMat4>,
    /// Frame timestamp in seconds, for fade-in.
    pub time_secs: f64,
}

impl FrameView {
    #[must_use]
    pub fn at(camera: DVec3, time_secs: f64) -> Self {
        Self {
            camera,
            view_projection: None,
            time_secs,
        }
    }
}

/// The shared services every pipeline step and draw goes through.
///
/// Owned by the application and lent to the engine for one frame.
pub struct EngineContext<'a> {
    pub gpu: &'a mut dyn GpuAllocator,
    pub textures: &'a mut dyn TextureCache,
    pub backend: &'a mut dyn RenderBackend,
}
