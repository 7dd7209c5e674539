//! Where tile buffers live: a wgpu device when one is available, host memory
//! otherwise.

use globe_render::{BufferKind, GpuAllocator, GpuBufferHandle, UploadError, WgpuBufferAllocator};
use rustc_hash::FxHashMap;

/// Host-memory stand-in for a GPU, for headless runs and machines without an
/// adapter.
#[derive(Debug, Default)]
pub struct HostBuffers {
    buffers: FxHashMap<GpuBufferHandle, (BufferKind, Vec<u8>)>,
    next: u64,
    in_use: u64,
}

impl HostBuffers {
    #[must_use]
    pub fn bytes_in_use(&self) -> u64 {
        self.in_use
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.buffers.len()
    }
}

impl GpuAllocator for HostBuffers {
    fn upload(
        &mut self,
        kind: BufferKind,
        _label: &str,
        bytes: &[u8],
    ) -> Result<GpuBufferHandle, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty(kind.name()));
        }
        self.next += 1;
        let handle = GpuBufferHandle(self.next);
        self.in_use += bytes.len() as u64;
        self.buffers.insert(handle, (kind, bytes.to_vec()));
        Ok(handle)
    }

    fn release(&mut self, handle: GpuBufferHandle) {
        match self.buffers.remove(&handle) {
            Some((_, bytes)) => self.in_use -= bytes.len() as u64,
            None => tracing::warn!(?handle, "release of unknown buffer"),
        }
    }
}

/// The allocator the viewer runs with.
pub enum Uploads {
    Device(Box<WgpuBufferAllocator>),
    Host(HostBuffers),
}

impl Uploads {
    /// Pick a wgpu device unless `headless`, falling back to host memory.
    pub fn select(headless: bool) -> Self {
        if headless {
            return Self::Host(HostBuffers::default());
        }
        match request_device() {
            Some(allocator) => Self::Device(Box::new(allocator)),
            None => {
                tracing::warn!("no GPU adapter found, keeping tile buffers in host memory");
                Self::Host(HostBuffers::default())
            }
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Device(_) => "wgpu",
            Self::Host(_) => "host",
        }
    }

    /// Bytes currently held by live buffers.
    #[must_use]
    pub fn bytes_in_use(&self) -> u64 {
        match self {
            Self::Device(a) => a.gpu_memory_in_use(),
            Self::Host(h) => h.bytes_in_use(),
        }
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        match self {
            Self::Device(a) => a.live_count(),
            Self::Host(h) => h.live_count(),
        }
    }
}

impl GpuAllocator for Uploads {
    fn upload(
        &mut self,
        kind: BufferKind,
        label: &str,
        bytes: &[u8],
    ) -> Result<GpuBufferHandle, UploadError> {
        match self {
            Self::Device(a) => a.upload(kind, label, bytes),
            Self::Host(h) => h.upload(kind, label, bytes),
        }
    }

    fn release(&mut self, handle: GpuBufferHandle) {
        match self {
            Self::Device(a) => a.release(handle),
            Self::Host(h) => h.release(handle),
        }
    }
}

fn request_device() -> Option<WgpuBufferAllocator> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;
        tracing::info!(adapter = %adapter.get_info().name, "GPU adapter selected");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("globe device"),
                ..Default::default()
            })
            .await
            .ok()?;
        Some(WgpuBufferAllocator::new(device, queue))
    })
}
