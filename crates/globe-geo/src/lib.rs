//! Geographic foundations for the quadtree terrain.
//!
//! Tile keys and quadrant naming, geographic and projected extents with exact
//! quadrant bisection, the WGS84 ellipsoid, and bounding spheres used for
//! camera-distance tests.

mod bounds;
mod ellipsoid;
mod extent;
mod key;

pub use bounds::BoundingSphere;
pub use ellipsoid::{WGS84_ECCENTRICITY_SQ, WGS84_SEMI_MAJOR_AXIS, geographic_to_cartesian};
pub use extent::{
    GeographicExtent, ProjectedExtent, TileExtent, TileProjection, WEB_MERCATOR_MAX_LAT_DEG,
};
pub use key::{Quadrant, TileKey};
