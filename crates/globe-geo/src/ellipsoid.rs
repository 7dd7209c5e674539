//! WGS84 reference ellipsoid.

use glam::DVec3;

/// Equatorial radius in meters.
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// First eccentricity squared.
pub const WGS84_ECCENTRICITY_SQ: f64 = 0.006_694_379_990_14;

/// Earth-centered, earth-fixed position of a geodetic coordinate.
///
/// `lon_deg`/`lat_deg` are in degrees, `alt` in meters above the ellipsoid.
#[must_use]
pub fn geographic_to_cartesian(lon_deg: f64, lat_deg: f64, alt: f64) -> DVec3 {
    let lon = lon_deg.to_radians();
    let lat = lat_deg.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    // Prime vertical radius of curvature.
    let n = WGS84_SEMI_MAJOR_AXIS / (1.0 - WGS84_ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();

    DVec3::new(
        (n + alt) * cos_lat * cos_lon,
        (n + alt) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_ECCENTRICITY_SQ) + alt) * sin_lat,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equator_prime_meridian() {
        let p = geographic_to_cartesian(0.0, 0.0, 0.0);
        assert!((p.x - WGS84_SEMI_MAJOR_AXIS).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn test_north_pole_uses_polar_radius() {
        let p = geographic_to_cartesian(0.0, 90.0, 0.0);
        // Semi-minor axis b = a * sqrt(1 - e^2).
        let b = WGS84_SEMI_MAJOR_AXIS * (1.0 - WGS84_ECCENTRICITY_SQ).sqrt();
        assert!((p.z - b).abs() < 1e-3);
        assert!(p.x.abs() < 1e-6);
    }

    #[test]
    fn test_altitude_moves_along_normal_at_equator() {
        let base = geographic_to_cartesian(90.0, 0.0, 0.0);
        let raised = geographic_to_cartesian(90.0, 0.0, 1000.0);
        assert!(((raised - base).length() - 1000.0).abs() < 1e-6);
        assert!((raised.y - base.y - 1000.0).abs() < 1e-6);
    }
}
