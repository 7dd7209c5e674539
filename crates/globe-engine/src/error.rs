//! Engine-side error types.

/// Failure to obtain a tile's bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The source has no tile at this path; the tile is meshed flat instead.
    #[error("no tile at {0}")]
    NotFound(String),
    /// The tile exists but could not be read.
    #[error("reading {path} failed: {message}")]
    Io {
        /// Path requested.
        path: String,
        /// Underlying error text.
        message: String,
    },
}

impl FetchError {
    /// Whether this only means the source has no elevation for the tile.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}
