//! `wgpu` buffer allocator that recycles tile buffers by size class.
//!
//! Tiles stream in and out constantly as the camera moves, so instead of
//! creating and destroying a buffer per upload, released buffers go back into
//! a per-kind bucket for their size class. Uploads larger than the biggest
//! class get a dedicated buffer that is dropped on release.

use rustc_hash::FxHashMap;

use crate::{BufferKind, GpuAllocator, GpuBufferHandle, UploadError};

/// Number of size classes in the pool.
const NUM_SIZE_CLASSES: usize = 9;

/// Size class thresholds in bytes: 4 KB doubling up to 1 MB.
const SIZE_CLASSES: [u64; NUM_SIZE_CLASSES] = [
    4096, 8192, 16384, 32768, 65536, 131_072, 262_144, 524_288, 1_048_576,
];

/// Smallest size class holding `min_size` bytes, or `None` when it needs a
/// dedicated buffer.
#[must_use]
pub fn size_class_for(min_size: u64) -> Option<usize> {
    SIZE_CLASSES.iter().position(|&s| s >= min_size)
}

/// Byte size of a size class.
#[must_use]
pub fn class_size(class: usize) -> u64 {
    SIZE_CLASSES[class.min(NUM_SIZE_CLASSES - 1)]
}

struct LiveBuffer {
    buffer: wgpu::Buffer,
    kind: BufferKind,
    class: Option<usize>,
}

/// Pooled [`GpuAllocator`] over a `wgpu` device.
pub struct WgpuBufferAllocator {
    device: wgpu::Device,
    queue: wgpu::Queue,
    vertex_pool: [Vec<wgpu::Buffer>; NUM_SIZE_CLASSES],
    index_pool: [Vec<wgpu::Buffer>; NUM_SIZE_CLASSES],
    live: FxHashMap<GpuBufferHandle, LiveBuffer>,
    next_handle: u64,
    /// Total bytes currently allocated (in-use + pooled).
    total_allocated: u64,
    /// Total bytes currently handed out.
    in_use: u64,
}

impl WgpuBufferAllocator {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            vertex_pool: Default::default(),
            index_pool: Default::default(),
            live: FxHashMap::default(),
            next_handle: 1,
            total_allocated: 0,
            in_use: 0,
        }
    }

    /// Current GPU memory handed out to tiles.
    #[must_use]
    pub fn gpu_memory_in_use(&self) -> u64 {
        self.in_use
    }

    /// Total GPU memory allocated, including pooled free buffers.
    #[must_use]
    pub fn gpu_memory_allocated(&self) -> u64 {
        self.total_allocated
    }

    /// Number of buffers currently handed out.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of free buffers of `kind` across all size classes.
    #[must_use]
    pub fn free_count(&self, kind: BufferKind) -> usize {
        self.pool(kind).iter().map(Vec::len).sum()
    }

    fn pool(&self, kind: BufferKind) -> &[Vec<wgpu::Buffer>; NUM_SIZE_CLASSES] {
        match kind {
            BufferKind::Vertex => &self.vertex_pool,
            BufferKind::Index => &self.index_pool,
        }
    }

    fn pool_mut(&mut self, kind: BufferKind) -> &mut [Vec<wgpu::Buffer>; NUM_SIZE_CLASSES] {
        match kind {
            BufferKind::Vertex => &mut self.vertex_pool,
            BufferKind::Index => &mut self.index_pool,
        }
    }

    fn create(&mut self, kind: BufferKind, label: &str, size: u64) -> wgpu::Buffer {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;
        self.total_allocated += size;
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }
}

/// Round a byte count up to the copy alignment.
fn aligned_len(len: usize) -> u64 {
    let align = wgpu::COPY_BUFFER_ALIGNMENT;
    (len as u64).div_ceil(align) * align
}

impl GpuAllocator for WgpuBufferAllocator {
    fn upload(
        &mut self,
        kind: BufferKind,
        label: &str,
        bytes: &[u8],
    ) -> Result<GpuBufferHandle, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty(kind.name()));
        }
        let len = aligned_len(bytes.len());
        let limit = self.device.limits().max_buffer_size;
        if len > limit {
            return Err(UploadError::TooLarge { size: len, limit });
        }

        let class = size_class_for(len);
        let (buffer, size) = match class {
            Some(class) => {
                let size = SIZE_CLASSES[class];
                let pooled = self.pool_mut(kind)[class].pop();
                match pooled {
                    Some(buffer) => (buffer, size),
                    None => (self.create(kind, "pooled_tile_buffer", size), size),
                }
            }
            None => (self.create(kind, label, len), len),
        };

        if len == bytes.len() as u64 {
            self.queue.write_buffer(&buffer, 0, bytes);
        } else {
            let mut padded = bytes.to_vec();
            padded.resize(len as usize, 0);
            self.queue.write_buffer(&buffer, 0, &padded);
        }
        self.in_use += size;

        let handle = GpuBufferHandle(self.next_handle);
        self.next_handle += 1;
        self.live.insert(
            handle,
            LiveBuffer {
                buffer,
                kind,
                class,
            },
        );
        tracing::trace!(label, kind = kind.name(), bytes = len, "buffer uploaded");
        Ok(handle)
    }

    fn release(&mut self, handle: GpuBufferHandle) {
        let Some(live) = self.live.remove(&handle) else {
            tracing::warn!(handle = handle.0, "release of unknown gpu buffer");
            return;
        };
        match live.class {
            Some(class) => {
                self.in_use = self.in_use.saturating_sub(SIZE_CLASSES[class]);
                self.pool_mut(live.kind)[class].push(live.buffer);
            }
            None => {
                let size = live.buffer.size();
                self.in_use = self.in_use.saturating_sub(size);
                self.total_allocated = self.total_allocated.saturating_sub(size);
                live.buffer.destroy();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_allocator() -> Option<WgpuBufferAllocator> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok()?;
            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor::default())
                .await
                .ok()?;
            Some(WgpuBufferAllocator::new(device, queue))
        })
    }

    #[test]
    fn test_size_class_selection() {
        assert_eq!(size_class_for(100), Some(0));
        assert_eq!(size_class_for(4096), Some(0));
        assert_eq!(size_class_for(4097), Some(1));
        assert_eq!(size_class_for(1_048_576), Some(8));
        assert_eq!(size_class_for(1_048_577), None);
        assert_eq!(class_size(3), 32768);
    }

    #[test]
    fn test_aligned_len_rounds_up() {
        assert_eq!(aligned_len(28), 28);
        assert_eq!(aligned_len(30), 32);
        assert_eq!(aligned_len(1), 4);
    }

    /// A 20×20 virtual tile fits comfortably in a pooled class.
    #[test]
    fn test_virtual_tile_uses_pooled_class() {
        let bytes = 441 * size_of::<globe_mesh::TerrainVertex>() as u64;
        assert_eq!(size_class_for(bytes), Some(2));
    }

    #[test]
    fn test_empty_upload_rejected() {
        let Some(mut alloc) = test_allocator() else {
            return;
        };
        assert_eq!(
            alloc.upload(BufferKind::Vertex, "empty", &[]),
            Err(UploadError::Empty("vertex"))
        );
    }

    #[test]
    fn test_released_buffers_are_reused() {
        let Some(mut alloc) = test_allocator() else {
            return;
        };
        let handle = alloc.upload(BufferKind::Vertex, "tile", &[0u8; 1000]).unwrap();
        let allocated = alloc.gpu_memory_allocated();
        alloc.release(handle);
        assert_eq!(alloc.free_count(BufferKind::Vertex), 1);

        let again = alloc.upload(BufferKind::Vertex, "tile", &[1u8; 900]).unwrap();
        assert_ne!(handle, again);
        assert_eq!(alloc.gpu_memory_allocated(), allocated);
        assert_eq!(alloc.free_count(BufferKind::Vertex), 0);
    }

    #[test]
    fn test_kinds_do_not_share_buffers() {
        let Some(mut alloc) = test_allocator() else {
            return;
        };
        let v = alloc.upload(BufferKind::Vertex, "tile", &[0u8; 64]).unwrap();
        alloc.release(v);
        let before = alloc.gpu_memory_allocated();
        let _i = alloc.upload(BufferKind::Index, "tile", &[0u8; 64]).unwrap();
        assert!(alloc.gpu_memory_allocated() > before);
        assert_eq!(alloc.free_count(BufferKind::Vertex), 1);
    }

    #[test]
    fn test_memory_tracking() {
        let Some(mut alloc) = test_allocator() else {
            return;
        };
        assert_eq!(alloc.gpu_memory_in_use(), 0);
        let handle = alloc.upload(BufferKind::Index, "tile", &[0u8; 30]).unwrap();
        assert_eq!(alloc.gpu_memory_in_use(), 4096);
        assert_eq!(alloc.live_count(), 1);
        alloc.release(handle);
        assert_eq!(alloc.gpu_memory_in_use(), 0);
        assert_eq!(alloc.live_count(), 0);
    }
}
