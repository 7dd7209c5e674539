//! Rendering seams for the terrain engine.
//!
//! The engine never talks to the GPU directly. It uploads through a
//! [`GpuAllocator`], asks a [`TextureCache`] for imagery, and issues draws to a
//! [`RenderBackend`]. The viewer uploads through [`WgpuBufferAllocator`] and
//! records draws into a [`DrawList`].

mod buffer_pool;
mod draw_list;
mod error;
mod traits;

pub use buffer_pool::{WgpuBufferAllocator, class_size, size_class_for};
pub use draw_list::{DrawCommand, DrawList};
pub use error::UploadError;
pub use traits::{
    BufferKind, GpuAllocator, GpuBufferHandle, RenderBackend, TextureCache, TextureHandle,
    TextureStatus,
};
