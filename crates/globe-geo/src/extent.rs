//! Geographic and projected tile extents with exact quadrant bisection.

use serde::{Deserialize, Serialize};

use crate::Quadrant;

/// Latitude limit of the square web-mercator world, in degrees.
pub const WEB_MERCATOR_MAX_LAT_DEG: f64 = 85.051_128_779_806_59;

/// How a tile's latitude range is split between its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileProjection {
    /// Split at the mercator mid-Y, so children are square in mercator space.
    WebMercator,
    /// Split at the arithmetic mid-latitude.
    Crs84,
}

/// Axis-aligned box in longitude/latitude (degrees) and altitude (meters).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeographicExtent {
    pub min_lon: f64,
    pub min_lat: f64,
    pub min_alt: f64,
    pub max_lon: f64,
    pub max_lat: f64,
    pub max_alt: f64,
}

impl GeographicExtent {
    /// Create an extent from corners in degrees and meters.
    #[must_use]
    pub fn new(
        min_lon: f64,
        min_lat: f64,
        min_alt: f64,
        max_lon: f64,
        max_lat: f64,
        max_alt: f64,
    ) -> Self {
        Self {
            min_lon,
            min_lat,
            min_alt,
            max_lon,
            max_lat,
            max_alt,
        }
    }

    #[must_use]
    pub fn lon_range(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    #[must_use]
    pub fn lat_range(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Center (lon, lat, alt).
    #[must_use]
    pub fn midpoint(&self) -> (f64, f64, f64) {
        (
            (self.min_lon + self.max_lon) * 0.5,
            (self.min_lat + self.max_lat) * 0.5,
            (self.min_alt + self.max_alt) * 0.5,
        )
    }

    /// Same horizontal box with a new altitude range.
    #[must_use]
    pub fn with_altitudes(&self, min_alt: f64, max_alt: f64) -> Self {
        Self {
            min_alt,
            max_alt,
            ..*self
        }
    }

    /// Whether `(lon, lat)` lies inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    fn quadrant(&self, quadrant: Quadrant, mid_lon: f64, mid_lat: f64) -> Self {
        let (min_lon, max_lon) = if quadrant.is_east() {
            (mid_lon, self.max_lon)
        } else {
            (self.min_lon, mid_lon)
        };
        let (min_lat, max_lat) = if quadrant.is_south() {
            (self.min_lat, mid_lat)
        } else {
            (mid_lat, self.max_lat)
        };
        Self::new(min_lon, min_lat, self.min_alt, max_lon, max_lat, self.max_alt)
    }
}

/// Axis-aligned box in spherical-mercator space, in radians of arc on the unit sphere.
///
/// The root spans `[-π, π]` on both axes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectedExtent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ProjectedExtent {
    #[must_use]
    pub fn mid_x(&self) -> f64 {
        (self.min_x + self.max_x) * 0.5
    }

    #[must_use]
    pub fn mid_y(&self) -> f64 {
        (self.min_y + self.max_y) * 0.5
    }

    /// Latitude in radians at the mercator mid-Y of this box.
    #[must_use]
    pub fn mid_latitude_rad(&self) -> f64 {
        2.0 * self.mid_y().exp().atan() - std::f64::consts::FRAC_PI_2
    }

    fn quadrant(&self, quadrant: Quadrant) -> Self {
        let (mx, my) = (self.mid_x(), self.mid_y());
        let (min_x, max_x) = if quadrant.is_east() {
            (mx, self.max_x)
        } else {
            (self.min_x, mx)
        };
        let (min_y, max_y) = if quadrant.is_south() {
            (self.min_y, my)
        } else {
            (my, self.max_y)
        };
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

/// The pair of extents every tile carries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileExtent {
    pub geographic: GeographicExtent,
    pub projected: ProjectedExtent,
}

impl TileExtent {
    /// Extent of the depth-0 tile.
    ///
    /// Web mercator clips the poles at ±85.05°; CRS84 covers the full sphere.
    #[must_use]
    pub fn root(projection: TileProjection) -> Self {
        use std::f64::consts::PI;
        let max_lat = match projection {
            TileProjection::WebMercator => WEB_MERCATOR_MAX_LAT_DEG,
            TileProjection::Crs84 => 90.0,
        };
        Self {
            geographic: GeographicExtent::new(-180.0, -max_lat, 0.0, 180.0, max_lat, 0.0),
            projected: ProjectedExtent {
                min_x: -PI,
                min_y: -PI,
                max_x: PI,
                max_y: PI,
            },
        }
    }

    /// Extent of the child in `quadrant`.
    ///
    /// Longitude always splits at its midpoint. Latitude splits at the
    /// arithmetic midpoint for CRS84 and at the latitude of the projected
    /// mid-Y for web mercator, so a child is exactly one quadrant of its
    /// parent in the projection its imagery uses.
    #[must_use]
    pub fn child(&self, quadrant: Quadrant, projection: TileProjection) -> Self {
        let g = &self.geographic;
        let mid_lon = (g.min_lon + g.max_lon) * 0.5;
        let mid_lat = match projection {
            TileProjection::Crs84 => (g.min_lat + g.max_lat) * 0.5,
            TileProjection::WebMercator => self.projected.mid_latitude_rad().to_degrees(),
        };
        Self {
            geographic: g.quadrant(quadrant, mid_lon, mid_lat),
            projected: self.projected.quadrant(quadrant),
        }
    }

    /// All four children in [`Quadrant::ALL`] order.
    #[must_use]
    pub fn children(&self, projection: TileProjection) -> [TileExtent; 4] {
        Quadrant::ALL.map(|q| self.child(q, projection))
    }
}
