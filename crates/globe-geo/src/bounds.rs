//! Bounding spheres for camera-distance tests.

use glam::DVec3;

use crate::{GeographicExtent, geographic_to_cartesian};

/// Samples per axis when fitting a sphere around an extent.
const FIT_SAMPLES: u32 = 4;

/// A bounding sphere in earth-centered coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    /// Center of the sphere.
    pub center: DVec3,
    /// Radius of the sphere.
    pub radius: f64,
}

impl BoundingSphere {
    /// Create a sphere from center and radius.
    #[must_use]
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Fit a sphere around a geographic extent.
    ///
    /// The center is the ellipsoid point under the extent's midpoint at the
    /// middle altitude; the radius is the farthest of a `(FIT_SAMPLES+1)²` grid
    /// of surface samples taken at both the minimum and maximum altitude.
    #[must_use]
    pub fn from_extent(extent: &GeographicExtent) -> Self {
        let (mid_lon, mid_lat, mid_alt) = extent.midpoint();
        let center = geographic_to_cartesian(mid_lon, mid_lat, mid_alt);

        let mut max_dist_sq: f64 = 0.0;
        for i in 0..=FIT_SAMPLES {
            let lon = extent.min_lon + extent.lon_range() * f64::from(i) / f64::from(FIT_SAMPLES);
            for j in 0..=FIT_SAMPLES {
                let lat =
                    extent.min_lat + extent.lat_range() * f64::from(j) / f64::from(FIT_SAMPLES);
                for alt in [extent.min_alt, extent.max_alt] {
                    let p = geographic_to_cartesian(lon, lat, alt);
                    max_dist_sq = max_dist_sq.max((p - center).length_squared());
                }
            }
        }

        Self {
            center,
            radius: max_dist_sq.sqrt(),
        }
    }

    /// Distance from `point` to the sphere surface; zero when inside.
    #[must_use]
    pub fn distance_to(&self, point: DVec3) -> f64 {
        ((point - self.center).length() - self.radius).max(0.0)
    }

    /// Whether `point` lies inside or on the sphere.
    #[must_use]
    pub fn contains(&self, point: DVec3) -> bool {
        (point - self.center).length_squared() <= self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WGS84_SEMI_MAJOR_AXIS;

    #[test]
    fn test_sphere_contains_extent_corners() {
        let extent = GeographicExtent::new(10.0, 40.0, -50.0, 11.0, 41.0, 3000.0);
        let sphere = BoundingSphere::from_extent(&extent);
        for (lon, lat) in [(10.0, 40.0), (11.0, 40.0), (10.0, 41.0), (11.0, 41.0)] {
            for alt in [-50.0, 3000.0] {
                let p = geographic_to_cartesian(lon, lat, alt);
                assert!(sphere.contains(p), "corner ({lon},{lat},{alt}) outside");
            }
        }
    }

    #[test]
    fn test_smaller_extent_smaller_sphere() {
        let big = BoundingSphere::from_extent(&GeographicExtent::new(0.0, 0.0, 0.0, 10.0, 10.0, 0.0));
        let small = BoundingSphere::from_extent(&GeographicExtent::new(0.0, 0.0, 0.0, 5.0, 5.0, 0.0));
        assert!(small.radius < big.radius);
    }

    #[test]
    fn test_distance_is_zero_inside() {
        let sphere = BoundingSphere::new(DVec3::ZERO, 10.0);
        assert_eq!(sphere.distance_to(DVec3::new(3.0, 0.0, 0.0)), 0.0);
        assert!((sphere.distance_to(DVec3::new(0.0, 25.0, 0.0)) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_whole_globe_sphere_spans_diameter() {
        let extent = GeographicExtent::new(-180.0, -90.0, 0.0, 180.0, 90.0, 0.0);
        let sphere = BoundingSphere::from_extent(&extent);
        assert!(sphere.radius > 1.9 * WGS84_SEMI_MAJOR_AXIS);
    }
}
