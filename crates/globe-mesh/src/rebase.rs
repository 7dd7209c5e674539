//! Relative-to-center positions for single-precision GPU buffers.
//!
//! Planet-scale coordinates lose centimeters in `f32`. Each tile stores its
//! center in `f64`, writes vertices relative to it, and hands the renderer the
//! center as a high/low `f32` pair so the shader can rebuild the difference to
//! the camera without cancellation.

use glam::DVec3;
use globe_geo::{GeographicExtent, geographic_to_cartesian};

const SPLIT: f64 = 65536.0;

/// A double-precision point as two `f32` triples whose sum is the point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SplitCenter {
    pub high: [f32; 3],
    pub low: [f32; 3],
}

impl SplitCenter {
    #[must_use]
    pub fn from_dvec3(v: DVec3) -> Self {
        let (hx, lx) = split_double(v.x);
        let (hy, ly) = split_double(v.y);
        let (hz, lz) = split_double(v.z);
        Self {
            high: [hx, hy, hz],
            low: [lx, ly, lz],
        }
    }

    /// Recombine in `f64`.
    #[must_use]
    pub fn to_dvec3(&self) -> DVec3 {
        DVec3::new(
            f64::from(self.high[0]) + f64::from(self.low[0]),
            f64::from(self.high[1]) + f64::from(self.low[1]),
            f64::from(self.high[2]) + f64::from(self.low[2]),
        )
    }
}

/// Split a value into a multiple of 65536 and the remainder, both exact-ish in `f32`.
#[must_use]
pub fn split_double(value: f64) -> (f32, f32) {
    let high = (value.abs() / SPLIT).floor() * SPLIT * value.signum();
    (high as f32, (value - high) as f32)
}

/// Re-basing center of a tile: the ellipsoid point under the extent midpoint.
///
/// The depth-0 tile wraps the whole planet and uses the planet center.
#[must_use]
pub fn tile_center(extent: &GeographicExtent, depth: u8) -> DVec3 {
    if depth == 0 {
        return DVec3::ZERO;
    }
    let (lon, lat, _) = extent.midpoint();
    geographic_to_cartesian(lon, lat, 0.0)
}
