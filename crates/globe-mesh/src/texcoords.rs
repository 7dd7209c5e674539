//! Imagery texture coordinates.
//!
//! Mercator coordinates follow the spherical-mercator tile pyramid at the
//! tile's depth, so a tile's `[0, 1]` square lines up with the imagery tile of
//! the same `{z}/{x}/{y}`. Equirectangular (CRS84) coordinates are a plain
//! linear map of the extent.

use std::f64::consts::{FRAC_PI_4, PI};

use glam::DVec3;
use globe_codec::EdgeIndices;
use globe_geo::GeographicExtent;

/// Inset applied at tile borders so linear filtering does not sample the
/// neighboring imagery tile.
#[must_use]
pub fn border_correction_factor(depth: u8) -> f32 {
    0.003 + f32::from(depth) * 1.0e-7
}

/// Mercator Y in tile units at `depth`, growing northward.
fn mercator_t(a: f64, lat_rad: f64) -> f64 {
    1.0 - a * (PI - (FRAC_PI_4 + lat_rad * 0.5).tan().ln())
}

/// Spherical-mercator S/T for each (lon°, lat°, alt) coordinate.
#[must_use]
pub fn mercator_texcoords(coords: &[DVec3], extent: &GeographicExtent, depth: u8) -> Vec<[f32; 2]> {
    let a = 2f64.powi(i32::from(depth)) / (2.0 * PI);
    let min_t = mercator_t(a, extent.min_lat.to_radians());
    let floor_min_s = (a * (extent.min_lon.to_radians() + PI)).floor();

    coords
        .iter()
        .map(|c| {
            let s = a * (c.x.to_radians() + PI) - floor_min_s;
            let t = mercator_t(a, c.y.to_radians()) - min_t;
            [s as f32, t as f32]
        })
        .collect()
}

/// Equirectangular S/T for each (lon°, lat°, alt) coordinate.
#[must_use]
pub fn crs84_texcoords(coords: &[DVec3], extent: &GeographicExtent) -> Vec<[f32; 2]> {
    let lon_range = extent.lon_range();
    let lat_range = extent.lat_range();
    coords
        .iter()
        .map(|c| {
            [
                ((c.x - extent.min_lon) / lon_range) as f32,
                ((c.y - extent.min_lat) / lat_range) as f32,
            ]
        })
        .collect()
}

/// Pull border texture coordinates inward by `factor`.
///
/// West and east vertices move half the factor horizontally, once each even
/// when listed twice; south and north vertices are pinned to `factor` and
/// `1 - factor`.
pub fn apply_border_correction(texcoords: &mut [[f32; 2]], edges: &EdgeIndices, factor: f32) {
    for i in unique(&edges.west) {
        texcoords[i as usize][0] += factor * 0.5;
    }
    for &i in &edges.south {
        texcoords[i as usize][1] = factor;
    }
    for i in unique(&edges.east) {
        texcoords[i as usize][0] -= factor * 0.5;
    }
    for &i in &edges.north {
        texcoords[i as usize][1] = 1.0 - factor;
    }
}

fn unique(edge: &[u32]) -> Vec<u32> {
    let mut out = edge.to_vec();
    out.sort_unstable();
    out.dedup();
    out
}
