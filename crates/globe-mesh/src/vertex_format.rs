//! GPU vertex layout shared by tile surfaces and skirts.
//!
//! ## Attribute Packing
//!
//! | Location | Offset | Format    | Field                         |
//! |----------|--------|-----------|-------------------------------|
//! | 0        | 0      | Float32x3 | position relative to center   |
//! | 1        | 12     | Snorm8x4  | normal xyz + pad              |
//! | 2        | 16     | Float32x2 | texture coordinate            |
//! | 3        | 24     | Float32   | surface altitude (m)          |

use std::mem;

use wgpu::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

/// One interleaved terrain vertex, 28 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    /// Position relative to the tile center, meters.
    pub position: [f32; 3],
    /// Unit normal scaled to `i8`, `w` unused.
    pub normal: [i8; 4],
    /// Imagery texture coordinate.
    pub texcoord: [f32; 2],
    /// Altitude of the surface point this vertex came from.
    pub altitude: f32,
}

static_assertions::assert_eq_size!(TerrainVertex, [u8; 28]);

impl TerrainVertex {
    #[must_use]
    pub fn new(position: [f32; 3], normal: [i8; 3], texcoord: [f32; 2], altitude: f32) -> Self {
        Self {
            position,
            normal: [normal[0], normal[1], normal[2], 0],
            texcoord,
            altitude,
        }
    }
}

/// Vertex attributes of [`TerrainVertex`].
pub const TERRAIN_VERTEX_ATTRIBUTES: [VertexAttribute; 4] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Snorm8x4,
        offset: 12,
        shader_location: 1,
    },
    VertexAttribute {
        format: VertexFormat::Float32x2,
        offset: 16,
        shader_location: 2,
    },
    VertexAttribute {
        format: VertexFormat::Float32,
        offset: 24,
        shader_location: 3,
    },
];

/// Buffer layout for terrain surface and skirt pipelines.
pub const TERRAIN_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: mem::size_of::<TerrainVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &TERRAIN_VERTEX_ATTRIBUTES,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_offsets_match_struct() {
        assert_eq!(mem::offset_of!(TerrainVertex, normal), 12);
        assert_eq!(mem::offset_of!(TerrainVertex, texcoord), 16);
        assert_eq!(mem::offset_of!(TerrainVertex, altitude), 24);
        assert_eq!(TERRAIN_VERTEX_LAYOUT.array_stride, 28);
    }

    #[test]
    fn test_vertex_casts_to_bytes() {
        let v = [TerrainVertex::new([1.0, 2.0, 3.0], [0, 0, 127], [0.5, 0.5], 12.0)];
        let bytes: &[u8] = bytemuck::cast_slice(&v);
        assert_eq!(bytes.len(), 28);
        assert_eq!(bytes[14], 127);
    }
}
