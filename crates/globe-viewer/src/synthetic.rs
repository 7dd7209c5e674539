//! Synthetic elevation tile sets, for running the viewer without real data.

use std::path::Path;

use globe_codec::{
    DecodedTile, EdgeIndices, EncodeError, QUANTIZED_MAX, TileHeader, encode_tile,
};
use globe_geo::{
    BoundingSphere, GeographicExtent, TileExtent, TileKey, TileProjection, geographic_to_cartesian,
};

/// Vertices along each side of a synthetic tile.
const GRID: u32 = 9;

const MAX_HEIGHT_M: f32 = 4_000.0;

#[derive(Debug, thiserror::Error)]
pub enum SyntheticError {
    #[error("writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Write every tile down to `max_depth` under `dir`. Returns the tile count.
pub fn write_tile_set(
    dir: &Path,
    max_depth: u8,
    projection: TileProjection,
) -> Result<usize, SyntheticError> {
    let mut written = 0;
    let mut stack = vec![(TileKey::ROOT, TileExtent::root(projection))];
    while let Some((key, extent)) = stack.pop() {
        let bytes = encode_tile(&synthetic_tile(&extent.geographic))?;
        let path = dir.join(key.path());
        let io = |source| SyntheticError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        std::fs::write(&path, bytes).map_err(io)?;
        written += 1;

        if key.depth < max_depth {
            stack.extend(key.children().into_iter().zip(extent.children(projection)));
        }
    }
    tracing::info!(tiles = written, dir = %dir.display(), "synthetic tile set written");
    Ok(written)
}

/// Rolling hills in `[0, 1]`, continuous across tile borders.
fn relief(lon_deg: f64, lat_deg: f64) -> f64 {
    let wave = (lon_deg.to_radians() * 6.0).sin() * (lat_deg.to_radians() * 4.0).cos();
    (wave + 1.0) * 0.5
}

/// A `GRID` x `GRID` tile covering `extent`, vertices numbered in first-use
/// order so the index stream is high-water encodable.
fn synthetic_tile(extent: &GeographicExtent) -> DecodedTile {
    let n = GRID as usize;
    let step = f64::from(GRID - 1);
    let raw = |i: u32, j: u32| (j * GRID + i) as usize;

    let mut indices = Vec::with_capacity((n - 1) * (n - 1) * 6);
    for j in 0..GRID - 1 {
        for i in 0..GRID - 1 {
            let (a, b) = (raw(i, j), raw(i + 1, j));
            let (c, d) = (raw(i + 1, j + 1), raw(i, j + 1));
            indices.extend([a, b, c, a, c, d].map(|x| x as u32));
        }
    }

    let mut order = vec![u32::MAX; n * n];
    let mut next = 0;
    for index in &mut indices {
        let slot = &mut order[*index as usize];
        if *slot == u32::MAX {
            *slot = next;
            next += 1;
        }
        *index = *slot;
    }

    let (mut u, mut v, mut h) = (vec![0; n * n], vec![0; n * n], vec![0; n * n]);
    let q = f64::from(QUANTIZED_MAX);
    for j in 0..GRID {
        for i in 0..GRID {
            let (fu, fv) = (f64::from(i) / step, f64::from(j) / step);
            let lon = extent.min_lon + extent.lon_range() * fu;
            let lat = extent.min_lat + extent.lat_range() * fv;
            let at = order[raw(i, j)] as usize;
            u[at] = (fu * q).round() as u16;
            v[at] = (fv * q).round() as u16;
            h[at] = (relief(lon, lat) * q).round() as u16;
        }
    }

    let edge = |f: &dyn Fn(u32) -> usize| (0..GRID).map(|k| order[f(k)]).collect::<Vec<_>>();
    let edges = EdgeIndices {
        west: edge(&|j| raw(0, j)),
        south: edge(&|i| raw(i, 0)),
        east: edge(&|j| raw(GRID - 1, j)),
        north: edge(&|i| raw(i, GRID - 1)),
    };

    let (lon, lat, _) = extent.midpoint();
    let center = geographic_to_cartesian(lon, lat, 0.0);
    DecodedTile {
        header: TileHeader {
            center,
            min_height: 0.0,
            max_height: MAX_HEIGHT_M,
            bounding_sphere: BoundingSphere::from_extent(
                &extent.with_altitudes(0.0, f64::from(MAX_HEIGHT_M)),
            ),
            horizon_occlusion: center,
        },
        u,
        v,
        h,
        indices,
        edges,
        extension: None,
    }
}
