//! Skirts: vertical curtains hanging from tile borders.
//!
//! Neighboring tiles at different depths do not share border vertices, so
//! hairline cracks open between them. Each tile drops a strip from every
//! border vertex straight down by `skirt_depth`; the strip fills the crack
//! from below.

use glam::DVec3;
use globe_codec::EdgeIndices;

/// Default skirt length in meters.
pub const DEFAULT_SKIRT_DEPTH: f64 = 50_000.0;

/// Triangle-strip skirt in geographic coordinates.
///
/// Vertices alternate surface, lowered, surface, lowered... walking the west,
/// south, east and north edge lists in that order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkirtGeometry {
    /// (lon°, lat°, alt m) per strip vertex.
    pub coords: Vec<DVec3>,
    /// Texture coordinates copied from the source border vertex.
    pub texcoords: Vec<[f32; 2]>,
    /// Surface altitude of the source border vertex, for both strip vertices.
    pub altitudes: Vec<f32>,
}

impl SkirtGeometry {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.coords.len()
    }
}

/// Build the skirt strip for a surface.
///
/// `texcoords` should already carry any border correction, since the skirt
/// copies them verbatim.
#[must_use]
pub fn build_skirt(
    coords: &[DVec3],
    texcoords: &[[f32; 2]],
    edges: &EdgeIndices,
    skirt_depth: f64,
) -> SkirtGeometry {
    let n = edges.total_len() * 2;
    let mut skirt = SkirtGeometry {
        coords: Vec::with_capacity(n),
        texcoords: Vec::with_capacity(n),
        altitudes: Vec::with_capacity(n),
    };

    for list in edges.in_order() {
        for &idx in list {
            let surface = coords[idx as usize];
            let st = texcoords[idx as usize];
            let lowered = DVec3::new(surface.x, surface.y, surface.z - skirt_depth);
            for p in [surface, lowered] {
                skirt.coords.push(p);
                skirt.texcoords.push(st);
                skirt.altitudes.push(surface.z as f32);
            }
        }
    }
    skirt
}
