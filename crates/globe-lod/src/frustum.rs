//! View frustum in earth-centered double precision, for optional culling
//! ahead of distance refinement.

use glam::{DMat4, DVec3, DVec4};
use globe_geo::BoundingSphere;

const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// Six inward-facing planes `(a, b, c, d)` with unit normals.
#[derive(Clone, Debug)]
pub struct Frustum {
    planes: [DVec4; 6],
}

impl Frustum {
    /// Extract planes from a view-projection matrix with `[0, 1]` clip depth
    /// (Griggs-Hartmann).
    #[must_use]
    pub fn from_view_projection(vp: &DMat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [DVec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        planes[NEAR] = rows[2];
        planes[FAR] = rows[3] - rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Whether any part of the sphere may be inside.
    #[must_use]
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|p| p.truncate().dot(sphere.center) + p.w >= -sphere.radius)
    }

    /// Whether a point is inside.
    #[must_use]
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.planes
            .iter()
            .all(|p| p.truncate().dot(point) + p.w >= 0.0)
    }
}
