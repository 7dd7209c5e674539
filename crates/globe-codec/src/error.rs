//! Codec error types.

/// Errors produced while decoding a tile payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The payload ended before a field could be read.
    #[error("tile truncated reading {field}: expected {expected} bytes at offset {offset}, got {actual}")]
    Truncated {
        /// Field being read when the data ran out.
        field: &'static str,
        /// Byte offset of the field.
        offset: usize,
        /// Bytes the field needs.
        expected: usize,
        /// Bytes actually remaining.
        actual: usize,
    },
    /// A triangle or edge index points past the vertex arrays.
    #[error("{list} index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Which list held the bad index.
        list: &'static str,
        /// The offending index.
        index: u32,
        /// Number of decoded vertices.
        vertex_count: usize,
    },
    /// A delta-decoded coordinate left the quantization range.
    #[error("quantized {stream} value {value} at vertex {vertex} outside [0, 32767]")]
    QuantizedOutOfRange {
        /// `u`, `v` or `h`.
        stream: &'static str,
        /// Vertex position in stream order.
        vertex: usize,
        /// Decoded value.
        value: i32,
    },
    /// A count field is too large to address in memory.
    #[error("{field} count {count} overflows the payload size")]
    CountOverflow {
        /// Field holding the count.
        field: &'static str,
        /// The count read.
        count: u32,
    },
}

/// Errors produced while encoding a tile payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// U, V and H arrays differ in length.
    #[error("vertex streams differ in length: u={u}, v={v}, h={h}")]
    StreamLengthMismatch {
        /// Length of the U stream.
        u: usize,
        /// Length of the V stream.
        v: usize,
        /// Length of the H stream.
        h: usize,
    },
    /// Index count is not a multiple of three.
    #[error("index count {0} is not a multiple of 3")]
    PartialTriangle(usize),
    /// A quantized coordinate exceeds the range.
    #[error("quantized value {0} exceeds 32767")]
    QuantizedOutOfRange(u16),
    /// Indices must first reference each vertex in ascending order.
    #[error("index {index} skips ahead of high-water mark {highest}")]
    NotHighWaterOrdered {
        /// The offending index.
        index: u32,
        /// Next index allowed to appear for the first time.
        highest: u32,
    },
    /// A code does not fit the index width chosen for this vertex count.
    #[error("index code {0} does not fit in 16 bits")]
    IndexTooWide(u32),
}
