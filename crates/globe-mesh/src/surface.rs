//! Geographic vertex data, decoded or virtual, in one shape.

use glam::DVec3;
use globe_codec::{DecodedTile, EdgeIndices};
use globe_geo::GeographicExtent;

use crate::regular_grid;

/// Tile surface in geographic coordinates.
///
/// `coords` hold (longitude°, latitude°, altitude m) per vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceData {
    pub coords: Vec<DVec3>,
    pub indices: Vec<u32>,
    pub edges: EdgeIndices,
}

impl SurfaceData {
    /// Dequantize a decoded tile over its extent.
    #[must_use]
    pub fn from_decoded(tile: &DecodedTile, extent: &GeographicExtent) -> Self {
        Self {
            coords: tile.geographic_coords(extent),
            indices: tile.indices.clone(),
            edges: tile.edges.clone(),
        }
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.coords.len()
    }
}

/// Grid of `(lon_segments + 1) × (lat_segments + 1)` vertices spanning
/// `extent`.
///
/// Vertices take their height from `altitudes`, row-major from the south-west
/// corner, and fall back to the constant `altitude` where none is given.
#[must_use]
pub fn virtual_surface(
    extent: &GeographicExtent,
    lon_segments: u32,
    lat_segments: u32,
    altitude: f64,
    altitudes: Option<&[f64]>,
) -> SurfaceData {
    let grid = regular_grid(lon_segments, lat_segments, false);
    let lon_step = extent.lon_range() / f64::from(lon_segments.max(1));
    let lat_step = extent.lat_range() / f64::from(lat_segments.max(1));

    let mut coords =
        Vec::with_capacity(((lon_segments + 1) * (lat_segments + 1)) as usize);
    for j in 0..=lat_segments {
        // Pin the last row/column to the extent so accumulated steps never overshoot.
        let lat = if j == lat_segments {
            extent.max_lat
        } else {
            extent.min_lat + lat_step * f64::from(j)
        };
        for i in 0..=lon_segments {
            let lon = if i == lon_segments {
                extent.max_lon
            } else {
                extent.min_lon + lon_step * f64::from(i)
            };
            let alt = altitudes
                .and_then(|a| a.get(coords.len()))
                .copied()
                .unwrap_or(altitude);
            coords.push(DVec3::new(lon, lat, alt));
        }
    }

    SurfaceData {
        coords,
        indices: grid.indices,
        edges: grid.edges,
    }
}
