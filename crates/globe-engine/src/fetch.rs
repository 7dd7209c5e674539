//! Byte source for elevation tiles.

use crate::FetchError;

/// Blocking byte fetch, called from worker threads.
///
/// `path` is the tile's relative path (`{depth}/{x}/{y}.terrain`); the
/// service resolves it against its own root.
pub trait FetchService: Send + Sync {
    fn request_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError>;
}

/// A source with no tiles at all. Every request reports the tile missing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoElevation;

impl FetchService for NoElevation {
    fn request_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::NotFound(path.to_string()))
    }
}
