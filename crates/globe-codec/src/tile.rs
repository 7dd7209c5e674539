//! The `.terrain` tile payload.
//!
//! ## Binary Layout
//!
//! All fields little-endian, read sequentially:
//!
//! | Size | Field |
//! |------|-------|
//! | 3×8 | tile center (`f64` ECEF) |
//! | 2×4 | minimum / maximum height (`f32`) |
//! | 4×8 | bounding sphere center and radius (`f64`) |
//! | 3×8 | horizon occlusion point (`f64`) |
//! | 4 | vertex count `n` (`u32`) |
//! | 3×n×2 | zig-zag delta coded U, V, H streams (`u16`) |
//! | 4 | triangle count `t` (`u32`) |
//! | 3×t×w | high-water-mark coded indices |
//! | 4 × (4 + k×w) | west, south, east, north edge lists, each count-prefixed |
//! | 1 + 4 + m | optional extension: id (`u8`), length (`u32`), payload |
//!
//! The index width `w` is 4 bytes when `n > 65536` and 2 bytes otherwise; it
//! applies to both triangle and edge indices.

use glam::DVec3;
use globe_geo::{BoundingSphere, GeographicExtent};

use crate::encoding::{
    decode_high_water_mark, encode_high_water_mark, zigzag_decode, zigzag_encode,
};
use crate::reader::Reader;
use crate::{DecodeError, EncodeError};

/// Largest quantized coordinate; U/V/H span `[0, QUANTIZED_MAX]`.
pub const QUANTIZED_MAX: u16 = 32767;

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 88;

/// Above this vertex count indices are stored as `u32`.
const NARROW_INDEX_LIMIT: usize = 65536;

/// Fixed-size tile header.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileHeader {
    /// Tile center in earth-centered coordinates.
    pub center: DVec3,
    /// Lowest height in the tile, meters.
    pub min_height: f32,
    /// Highest height in the tile, meters.
    pub max_height: f32,
    /// Sphere enclosing every vertex.
    pub bounding_sphere: BoundingSphere,
    /// Point used for horizon culling.
    pub horizon_occlusion: DVec3,
}

impl Default for TileHeader {
    fn default() -> Self {
        Self {
            center: DVec3::ZERO,
            min_height: 0.0,
            max_height: 0.0,
            bounding_sphere: BoundingSphere::new(DVec3::ZERO, 0.0),
            horizon_occlusion: DVec3::ZERO,
        }
    }
}

/// Vertex indices lying on each tile border.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EdgeIndices {
    pub west: Vec<u32>,
    pub south: Vec<u32>,
    pub east: Vec<u32>,
    pub north: Vec<u32>,
}

impl EdgeIndices {
    /// Total number of edge vertices across all four borders.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.west.len() + self.south.len() + self.east.len() + self.north.len()
    }

    /// The four lists in wire order: west, south, east, north.
    #[must_use]
    pub fn in_order(&self) -> [&[u32]; 4] {
        [&self.west, &self.south, &self.east, &self.north]
    }
}

/// Trailing extension block; its payload is carried but not interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extension {
    pub id: u8,
    pub payload: Vec<u8>,
}

/// A fully decoded tile: absolute quantized coordinates and plain indices.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedTile {
    pub header: TileHeader,
    /// Longitude fraction per vertex, `0..=32767` west to east.
    pub u: Vec<u16>,
    /// Latitude fraction per vertex, `0..=32767` south to north.
    pub v: Vec<u16>,
    /// Height fraction per vertex, `0..=32767` from min to max height.
    pub h: Vec<u16>,
    /// Triangle list, three indices per triangle.
    pub indices: Vec<u32>,
    pub edges: EdgeIndices,
    pub extension: Option<Extension>,
}

impl DecodedTile {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.u.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Reconstruct (longitude°, latitude°, height m) per vertex.
    ///
    /// Longitude and latitude interpolate across `extent`; height
    /// interpolates between the header's min and max height.
    #[must_use]
    pub fn geographic_coords(&self, extent: &GeographicExtent) -> Vec<DVec3> {
        let q = f64::from(QUANTIZED_MAX);
        let min_h = f64::from(self.header.min_height);
        let h_range = f64::from(self.header.max_height) - min_h;
        self.u
            .iter()
            .zip(&self.v)
            .zip(&self.h)
            .map(|((&u, &v), &h)| {
                DVec3::new(
                    extent.min_lon + f64::from(u) * extent.lon_range() / q,
                    extent.min_lat + f64::from(v) * extent.lat_range() / q,
                    min_h + f64::from(h) * h_range / q,
                )
            })
            .collect()
    }

    /// Height in meters at tile-local fractions `s` (west to east) and `t`
    /// (south to north), interpolated inside the covering triangle.
    ///
    /// `None` when no triangle covers the point.
    #[must_use]
    pub fn height_at(&self, s: f64, t: f64) -> Option<f64> {
        const SLACK: f64 = -1e-9;
        let q = f64::from(QUANTIZED_MAX);
        let (px, py) = (s * q, t * q);
        let at = |i: u32| {
            let i = i as usize;
            (f64::from(self.u[i]), f64::from(self.v[i]), f64::from(self.h[i]))
        };

        for tri in self.indices.chunks_exact(3) {
            let (ax, ay, ah) = at(tri[0]);
            let (bx, by, bh) = at(tri[1]);
            let (cx, cy, ch) = at(tri[2]);
            let det = (by - cy) * (ax - cx) + (cx - bx) * (ay - cy);
            if det.abs() < f64::EPSILON {
                continue;
            }
            let wa = ((by - cy) * (px - cx) + (cx - bx) * (py - cy)) / det;
            let wb = ((cy - ay) * (px - cx) + (ax - cx) * (py - cy)) / det;
            let wc = 1.0 - wa - wb;
            if wa >= SLACK && wb >= SLACK && wc >= SLACK {
                let h = wa * ah + wb * bh + wc * ch;
                let min_h = f64::from(self.header.min_height);
                let range = f64::from(self.header.max_height) - min_h;
                return Some(min_h + h * range / q);
            }
        }
        None
    }
}

/// Decode one tile payload.
///
/// Fails on any short read, on coordinates that leave the quantization
/// range, and on triangle or edge indices that do not name a vertex.
pub fn decode_tile(data: &[u8]) -> Result<DecodedTile, DecodeError> {
    let mut r = Reader::new(data);

    let header = TileHeader {
        center: read_dvec3(&mut r, "center")?,
        min_height: r.f32("min height")?,
        max_height: r.f32("max height")?,
        bounding_sphere: BoundingSphere::new(
            read_dvec3(&mut r, "bounding sphere")?,
            r.f64("bounding sphere radius")?,
        ),
        horizon_occlusion: read_dvec3(&mut r, "horizon occlusion point")?,
    };

    let vertex_count = r.u32("vertex count")?;
    let u = accumulate(r.u16_array(vertex_count, "u stream")?, "u")?;
    let v = accumulate(r.u16_array(vertex_count, "v stream")?, "v")?;
    let h = accumulate(r.u16_array(vertex_count, "h stream")?, "h")?;
    let n = u.len();
    let wide = n > NARROW_INDEX_LIMIT;

    let triangle_count = r.u32("triangle count")?;
    let index_count = triangle_count
        .checked_mul(3)
        .ok_or(DecodeError::CountOverflow {
            field: "triangle",
            count: triangle_count,
        })?;
    let codes = r.index_array(index_count, wide, "indices")?;
    let indices = decode_high_water_mark(&codes);
    check_indices(&indices, n, "triangle")?;

    let mut edge = |name: &'static str| -> Result<Vec<u32>, DecodeError> {
        let count = r.u32(name)?;
        let list = r.index_array(count, wide, name)?;
        check_indices(&list, n, name)?;
        Ok(list)
    };
    let edges = EdgeIndices {
        west: edge("west edge")?,
        south: edge("south edge")?,
        east: edge("east edge")?,
        north: edge("north edge")?,
    };

    let extension = if r.remaining() == 0 {
        None
    } else {
        let id = r.u8("extension id")?;
        let len = r.u32("extension length")?;
        let len = usize::try_from(len).map_err(|_| DecodeError::CountOverflow {
            field: "extension",
            count: len,
        })?;
        Some(Extension {
            id,
            payload: r.take(len, "extension payload")?.to_vec(),
        })
    };

    Ok(DecodedTile {
        header,
        u,
        v,
        h,
        indices,
        edges,
        extension,
    })
}

/// Encode a tile in the wire layout [`decode_tile`] reads.
///
/// Indices must be high-water ordered: every vertex is first referenced
/// after all lower-numbered vertices.
pub fn encode_tile(tile: &DecodedTile) -> Result<Vec<u8>, EncodeError> {
    let n = tile.u.len();
    if tile.v.len() != n || tile.h.len() != n {
        return Err(EncodeError::StreamLengthMismatch {
            u: n,
            v: tile.v.len(),
            h: tile.h.len(),
        });
    }
    if tile.indices.len() % 3 != 0 {
        return Err(EncodeError::PartialTriangle(tile.indices.len()));
    }
    let wide = n > NARROW_INDEX_LIMIT;

    let mut buf = Vec::with_capacity(HEADER_SIZE + 4 + n * 6 + tile.indices.len() * 4);
    let hd = &tile.header;
    put_dvec3(&mut buf, hd.center);
    buf.extend_from_slice(&hd.min_height.to_le_bytes());
    buf.extend_from_slice(&hd.max_height.to_le_bytes());
    put_dvec3(&mut buf, hd.bounding_sphere.center);
    buf.extend_from_slice(&hd.bounding_sphere.radius.to_le_bytes());
    put_dvec3(&mut buf, hd.horizon_occlusion);

    buf.extend_from_slice(&(n as u32).to_le_bytes());
    for stream in [&tile.u, &tile.v, &tile.h] {
        let mut prev = 0i32;
        for &value in stream.iter() {
            if value > QUANTIZED_MAX {
                return Err(EncodeError::QuantizedOutOfRange(value));
            }
            let value = i32::from(value);
            buf.extend_from_slice(&zigzag_encode(value - prev).to_le_bytes());
            prev = value;
        }
    }

    buf.extend_from_slice(&((tile.indices.len() / 3) as u32).to_le_bytes());
    let codes = encode_high_water_mark(&tile.indices)?;
    put_indices(&mut buf, &codes, wide)?;

    for list in tile.edges.in_order() {
        buf.extend_from_slice(&(list.len() as u32).to_le_bytes());
        put_indices(&mut buf, list, wide)?;
    }

    if let Some(ext) = &tile.extension {
        buf.push(ext.id);
        buf.extend_from_slice(&(ext.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&ext.payload);
    }

    Ok(buf)
}

fn read_dvec3(r: &mut Reader<'_>, field: &'static str) -> Result<DVec3, DecodeError> {
    Ok(DVec3::new(r.f64(field)?, r.f64(field)?, r.f64(field)?))
}

fn put_dvec3(buf: &mut Vec<u8>, v: DVec3) {
    for c in [v.x, v.y, v.z] {
        buf.extend_from_slice(&c.to_le_bytes());
    }
}

fn put_indices(buf: &mut Vec<u8>, values: &[u32], wide: bool) -> Result<(), EncodeError> {
    for &value in values {
        if wide {
            buf.extend_from_slice(&value.to_le_bytes());
        } else {
            let narrow = u16::try_from(value).map_err(|_| EncodeError::IndexTooWide(value))?;
            buf.extend_from_slice(&narrow.to_le_bytes());
        }
    }
    Ok(())
}

/// Running-sum the zig-zag deltas of one stream into absolute values.
fn accumulate(deltas: Vec<u16>, stream: &'static str) -> Result<Vec<u16>, DecodeError> {
    let mut value = 0i32;
    deltas
        .into_iter()
        .enumerate()
        .map(|(vertex, delta)| {
            value += zigzag_decode(delta);
            if !(0..=i32::from(QUANTIZED_MAX)).contains(&value) {
                return Err(DecodeError::QuantizedOutOfRange {
                    stream,
                    vertex,
                    value,
                });
            }
            Ok(value as u16)
        })
        .collect()
}

fn check_indices(list: &[u32], vertex_count: usize, name: &'static str) -> Result<(), DecodeError> {
    match list.iter().find(|&&i| i as usize >= vertex_count) {
        Some(&index) => Err(DecodeError::IndexOutOfRange {
            list: name,
            index,
            vertex_count,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 8×8 grid of vertices, three triangles in one corner, two vertices per edge.
    fn fixture_64() -> DecodedTile {
        let mut u = Vec::new();
        let mut v = Vec::new();
        let mut h = Vec::new();
        for row in 0..8u16 {
            for col in 0..8u16 {
                u.push((u32::from(col) * u32::from(QUANTIZED_MAX) / 7) as u16);
                v.push((u32::from(row) * u32::from(QUANTIZED_MAX) / 7) as u16);
                h.push((row * 8 + col) * 500);
            }
        }
        let center = DVec3::new(4_000_000.0, 1_000_000.0, 4_800_000.0);
        DecodedTile {
            header: TileHeader {
                center,
                min_height: -20.0,
                max_height: 1200.0,
                bounding_sphere: BoundingSphere::new(center, 9000.0),
                horizon_occlusion: DVec3::new(0.6, 0.15, 0.75),
            },
            u,
            v,
            h,
            indices: vec![0, 1, 2, 1, 3, 2, 2, 3, 4],
            edges: EdgeIndices {
                west: vec![0, 8],
                south: vec![0, 1],
                east: vec![7, 15],
                north: vec![56, 57],
            },
            extension: None,
        }
    }

    #[test]
    fn test_decode_64_vertex_tile() {
        let tile = fixture_64();
        let bytes = encode_tile(&tile).unwrap();
        let decoded = decode_tile(&bytes).unwrap();
        assert_eq!(decoded.vertex_count(), 64);
        assert_eq!(decoded.indices.len(), 9);
        assert_eq!(decoded.edges.total_len(), 8);
        assert_eq!(decoded, tile);
    }

    #[test]
    fn test_hand_built_payload() {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[24..28].copy_from_slice(&10.0f32.to_le_bytes());
        bytes[28..32].copy_from_slice(&20.0f32.to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        // u: 0, 32767, 0 as deltas +0, +32767, -32767
        for d in [0u16, 65534, 65533] {
            bytes.extend_from_slice(&d.to_le_bytes());
        }
        // v: 0, 0, 32767
        for d in [0u16, 0, 65534] {
            bytes.extend_from_slice(&d.to_le_bytes());
        }
        // h: 5, 5, 5
        for d in [10u16, 0, 0] {
            bytes.extend_from_slice(&d.to_le_bytes());
        }
        bytes.extend_from_slice(&1u32.to_le_bytes());
        for code in [0u16, 0, 0] {
            bytes.extend_from_slice(&code.to_le_bytes());
        }
        for _ in 0..4 {
            bytes.extend_from_slice(&0u32.to_le_bytes());
        }

        let tile = decode_tile(&bytes).unwrap();
        assert_eq!(tile.u, vec![0, 32767, 0]);
        assert_eq!(tile.v, vec![0, 0, 32767]);
        assert_eq!(tile.h, vec![5, 5, 5]);
        assert_eq!(tile.indices, vec![0, 1, 2]);
        assert_eq!(tile.header.min_height, 10.0);
        assert!(tile.extension.is_none());
    }

    #[test]
    fn test_truncated_payload_fails() {
        let bytes = encode_tile(&fixture_64()).unwrap();
        for cut in [0, 40, HEADER_SIZE + 2, HEADER_SIZE + 200, bytes.len() - 1] {
            let err = decode_tile(&bytes[..cut]).unwrap_err();
            assert!(matches!(err, DecodeError::Truncated { .. }), "cut {cut}: {err}");
        }
    }

    #[test]
    fn test_header_fields_survive() {
        let tile = fixture_64();
        let decoded = decode_tile(&encode_tile(&tile).unwrap()).unwrap();
        assert_eq!(decoded.header, tile.header);
    }

    #[test]
    fn test_extension_block_carried() {
        let mut tile = fixture_64();
        tile.extension = Some(Extension {
            id: 4,
            payload: vec![1, 2, 3],
        });
        let decoded = decode_tile(&encode_tile(&tile).unwrap()).unwrap();
        assert_eq!(decoded.extension, tile.extension);
    }

    #[test]
    fn test_short_extension_fails() {
        let mut bytes = encode_tile(&fixture_64()).unwrap();
        bytes.push(1);
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.push(0);
        assert!(matches!(
            decode_tile(&bytes),
            Err(DecodeError::Truncated {
                field: "extension payload",
                ..
            })
        ));
    }

    #[test]
    fn test_edge_index_out_of_range_fails() {
        let mut tile = fixture_64();
        tile.edges.north = vec![64];
        let err = decode_tile(&encode_tile(&tile).unwrap()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::IndexOutOfRange {
                list: "north edge",
                index: 64,
                vertex_count: 64,
            }
        );
    }

    #[test]
    fn test_negative_running_sum_fails() {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // u delta -1
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        assert!(matches!(
            decode_tile(&bytes),
            Err(DecodeError::QuantizedOutOfRange { stream: "u", .. })
        ));
    }

    #[test]
    fn test_geographic_reconstruction_within_quantization() {
        let tile = fixture_64();
        let extent = GeographicExtent::new(10.0, 40.0, 0.0, 11.0, 41.0, 0.0);
        let coords = tile.geographic_coords(&extent);
        assert_eq!(coords.len(), 64);

        let step = 1.0 / f64::from(QUANTIZED_MAX);
        assert!((coords[0].x - 10.0).abs() < 1e-12);
        assert!((coords[63].x - 11.0).abs() <= step);
        assert!((coords[63].y - 41.0).abs() <= step);
        assert!((coords[0].z + 20.0).abs() < 1e-9);
        for c in &coords {
            assert!(extent.contains(c.x, c.y));
        }
    }

    #[test]
    fn test_encoder_rejects_out_of_order_indices() {
        let mut tile = fixture_64();
        tile.indices = vec![0, 5, 1];
        assert_eq!(
            encode_tile(&tile),
            Err(EncodeError::NotHighWaterOrdered {
                index: 5,
                highest: 1
            })
        );
    }

    #[test]
    fn test_height_at_interpolates_covering_triangle() {
        let q = QUANTIZED_MAX;
        let tile = DecodedTile {
            header: TileHeader {
                min_height: 100.0,
                max_height: 1100.0,
                ..Default::default()
            },
            u: vec![0, q, q, 0],
            v: vec![0, 0, q, q],
            // Rises west to east.
            h: vec![0, q, q, 0],
            indices: vec![0, 1, 2, 0, 2, 3],
            edges: EdgeIndices::default(),
            extension: None,
        };
        assert!((tile.height_at(0.5, 0.5).unwrap() - 600.0).abs() < 1e-6);
        assert!((tile.height_at(0.25, 0.9).unwrap() - 350.0).abs() < 1e-6);
        assert!((tile.height_at(1.0, 0.0).unwrap() - 1100.0).abs() < 1e-6);
        assert_eq!(tile.height_at(1.5, 0.5), None);
    }

    #[test]
    fn test_wide_indices_above_65536_vertices() {
        let n = 65_537usize;
        let tile = DecodedTile {
            header: TileHeader::default(),
            u: vec![0; n],
            v: vec![0; n],
            h: vec![0; n],
            indices: vec![0, 1, 2],
            edges: EdgeIndices {
                west: vec![65_536],
                ..Default::default()
            },
            extension: None,
        };
        let bytes = encode_tile(&tile).unwrap();
        // header + count + streams + tri count + 3 wide indices + 4 counts + 1 wide edge
        assert_eq!(bytes.len(), HEADER_SIZE + 4 + n * 6 + 4 + 12 + 16 + 4);
        assert_eq!(decode_tile(&bytes).unwrap().edges.west, vec![65_536]);
    }
}
