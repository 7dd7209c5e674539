//! Binary elevation tile codec.
//!
//! Decodes the quantized-mesh style `.terrain` payload into quantized U/V/H
//! vertex streams, triangle indices and edge index lists, and encodes the same
//! layout for fixtures and tile tooling.

mod encoding;
mod error;
mod reader;
mod tile;

pub use encoding::{
    decode_high_water_mark, encode_high_water_mark, zigzag_decode, zigzag_encode,
};
pub use error::{DecodeError, EncodeError};
pub use tile::{
    DecodedTile, EdgeIndices, Extension, HEADER_SIZE, QUANTIZED_MAX, TileHeader, decode_tile,
    encode_tile,
};
