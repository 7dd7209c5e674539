//! Tiles and imagery read from a local directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use globe_engine::{FetchError, FetchService};
use globe_render::{TextureCache, TextureHandle, TextureStatus};
use rustc_hash::FxHashMap;

/// Serves `{depth}/{x}/{y}.terrain` files under a root directory.
#[derive(Clone, Debug)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FetchService for DirectoryFetcher {
    fn request_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let full = self.root.join(path);
        std::fs::read(&full).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::NotFound(path.to_string()),
            _ => FetchError::Io {
                path: full.display().to_string(),
                message: e.to_string(),
            },
        })
    }
}

/// Imagery resolved against a directory. A layer tile is ready when its file
/// exists and failed otherwise; pixels are never decoded.
#[derive(Debug)]
pub struct FileTextures {
    root: PathBuf,
    status: FxHashMap<TextureHandle, TextureStatus>,
    next: u64,
}

impl FileTextures {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            status: FxHashMap::default(),
            next: 0,
        }
    }

    /// Handles requested and not yet released.
    #[must_use]
    pub fn live(&self) -> usize {
        self.status.len()
    }
}

impl TextureCache for FileTextures {
    fn request_texture(&mut self, url: &str) -> TextureHandle {
        self.next += 1;
        let handle = TextureHandle(self.next);
        let status = if self.root.join(url).is_file() {
            TextureStatus::Ready
        } else {
            tracing::debug!(url, "imagery tile missing");
            TextureStatus::Failed
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
        self.status.remove(&handle);
    }
}
