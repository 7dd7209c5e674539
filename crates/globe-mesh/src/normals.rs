//! Per-vertex normals quantized to signed bytes.

use glam::DVec3;

/// Radial normals: the unit vector from the planet center through each vertex.
///
/// Exact for a sphere, close for the ellipsoid, and blind to terrain relief.
#[must_use]
pub fn radial_normals(positions: &[DVec3]) -> Vec<[i8; 3]> {
    positions
        .iter()
        .map(|p| quantize(p.normalize_or_zero(), 126.0))
        .collect()
}

/// Area-weighted vertex normals from the triangle list.
///
/// Each counter-clockwise triangle's face normal is added to its three
/// vertices, and the sums are normalized. Vertices no triangle touches fall
/// back to the radial direction.
#[must_use]
pub fn accumulated_normals(positions: &[DVec3], indices: &[u32]) -> Vec<[i8; 3]> {
    let mut sums = vec![DVec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        sums[a] += face;
        sums[b] += face;
        sums[c] += face;
    }
    sums.iter()
        .zip(positions)
        .map(|(sum, p)| {
            let n = sum.try_normalize().unwrap_or_else(|| p.normalize_or_zero());
            quantize(n, 127.0)
        })
        .collect()
}

fn quantize(n: DVec3, scale: f64) -> [i8; 3] {
    [
        (n.x * scale).round() as i8,
        (n.y * scale).round() as i8,
        (n.z * scale).round() as i8,
    ]
}
