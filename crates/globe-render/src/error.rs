//! Upload error type.

/// Reasons a buffer upload can be refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// Zero-length uploads have no buffer to bind.
    #[error("refusing to upload an empty {0} buffer")]
    Empty(&'static str),
    /// The device cannot create a buffer this large.
    #[error("{size} byte buffer exceeds the device limit of {limit} bytes")]
    TooLarge {
        /// Requested size in bytes.
        size: u64,
        /// `max_buffer_size` of the device.
        limit: u64,
    },
    /// The allocator has no backing device (e.g. it was lost).
    #[error("gpu allocator unavailable: {0}")]
    Unavailable(String),
}
