//! Recording collaborator fakes for engine tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use globe_codec::{DecodedTile, EdgeIndices, QUANTIZED_MAX, TileHeader, encode_tile};
use globe_geo::TileKey;
use globe_render::{
    BufferKind, DrawList, GpuAllocator, GpuBufferHandle, TextureCache, TextureHandle,
    TextureStatus, UploadError,
};
use rustc_hash::FxHashMap;

use crate::{EngineContext, FetchError, FetchService, FrameStats, FrameView, TerrainEngine};

/// Tiles served from memory; anything else is missing.
#[derive(Default)]
pub struct MemoryFetcher {
    tiles: DashMap<String, Result<Vec<u8>, FetchError>>,
    requests: AtomicUsize,
}

impl MemoryFetcher {
    pub fn insert(&self, key: TileKey, bytes: Vec<u8>) {
        self.tiles.insert(key.path(), Ok(bytes));
    }

    pub fn fail(&self, key: TileKey) {
        let path = key.path();
        self.tiles.insert(
            path.clone(),
            Err(FetchError::Io {
                path,
                message: "connection reset".into(),
            }),
        );
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

impl FetchService for MemoryFetcher {
    fn request_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        match self.tiles.get(path) {
            Some(entry) => entry.value().clone(),
            None => Err(FetchError::NotFound(path.to_string())),
        }
    }
}

/// Allocator that tracks live handles and flags double releases.
#[derive(Default)]
pub struct RecordingAllocator {
    pub live: FxHashMap<GpuBufferHandle, (BufferKind, usize)>,
    pub uploads: usize,
    pub releases: usize,
    pub bad_releases: usize,
    /// Fail this many upcoming uploads.
    pub fail_next: usize,
    next: u64,
}

impl GpuAllocator for RecordingAllocator {
    fn upload(
        &mut self,
        kind: BufferKind,
        _label: &str,
        bytes: &[u8],
    ) -> Result<GpuBufferHandle, UploadError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(UploadError::Unavailable("injected".into()));
        }
        if bytes.is_empty() {
            return Err(UploadError::Empty(kind.name()));
        }
        self.next += 1;
        let handle = GpuBufferHandle(self.next);
        self.live.insert(handle, (kind, bytes.len()));
        self.uploads += 1;
        Ok(handle)
    }

    fn release(&mut self, handle: GpuBufferHandle) {
        if self.live.remove(&handle).is_some() {
            self.releases += 1;
        } else {
            self.bad_releases += 1;
        }
    }
}

/// Texture cache whose requests finish when the test says so.
#[derive(Default)]
pub struct FakeTextures {
    pub requests: Vec<String>,
    pub status: FxHashMap<TextureHandle, TextureStatus>,
    pub released: Vec<TextureHandle>,
    /// New requests start `Ready` instead of `Loading`.
    pub instant: bool,
}

impl FakeTextures {
    pub fn finish_all(&mut self, status: TextureStatus) {
        for s in self.status.values_mut() {
            if *s == TextureStatus::Loading {
                *s = status;
            }
        }
    }
}

impl TextureCache for FakeTextures {
    fn request_texture(&mut self, url: &str) -> TextureHandle {
        self.requests.push(url.to_string());
        let handle = TextureHandle(self.requests.len() as u64);
        let status = if self.instant {
            TextureStatus::Ready
        } else {
            TextureStatus::Loading
        };
        self.status.insert(handle, status);
        handle
    }

    fn status(&self, handle: TextureHandle) -> TextureStatus {
        self.status
            .get(&handle)
            .copied()
            .unwrap_or(TextureStatus::Failed)
    }

    fn release(&mut self, handle: TextureHandle) {
        self.released.push(handle);
    }
}

/// The three collaborators plus a clock.
#[derive(Default)]
pub struct Harness {
    pub gpu: RecordingAllocator,
    pub textures: FakeTextures,
    pub draws: DrawList,
    pub time: f64,
}

impl Harness {
    /// Run one frame at 60 Hz with a fresh draw list.
    pub fn frame(&mut self, engine: &mut TerrainEngine, camera: glam::DVec3) -> FrameStats {
        self.time += 1.0 / 60.0;
        self.draws.clear();
        let view = FrameView::at(camera, self.time);
        let mut ctx = EngineContext {
            gpu: &mut self.gpu,
            textures: &mut self.textures,
            backend: &mut self.draws,
        };
        engine.frame(&mut ctx, &view)
    }

    pub fn run(
        &mut self,
        engine: &mut TerrainEngine,
        camera: glam::DVec3,
        frames: usize,
    ) -> FrameStats {
        let mut last = FrameStats::default();
        for _ in 0..frames {
            last = self.frame(engine, camera);
        }
        last
    }

    pub fn shutdown(&mut self, engine: &mut TerrainEngine) {
        let mut ctx = EngineContext {
            gpu: &mut self.gpu,
            textures: &mut self.textures,
            backend: &mut self.draws,
        };
        engine.shutdown(&mut ctx);
    }
}

/// A two-triangle elevation tile with a raised north-east corner.
pub fn quad_tile_bytes() -> Vec<u8> {
    let q = QUANTIZED_MAX;
    let tile = DecodedTile {
        header: TileHeader {
            min_height: 0.0,
            max_height: 1000.0,
            ..TileHeader::default()
        },
        u: vec![0, q, q, 0],
        v: vec![0, 0, q, q],
        h: vec![0, 0, q, 0],
        indices: vec![0, 1, 2, 0, 2, 3],
        edges: EdgeIndices {
            west: vec![3, 0],
            south: vec![0, 1],
            east: vec![1, 2],
            north: vec![2, 3],
        },
        extension: None,
    };
    encode_tile(&tile).expect("fixture encodes")
}
