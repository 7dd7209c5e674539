//! Triangulation of regular lon/lat grids.
//!
//! Vertices are numbered row-major from the south-west corner: row `j`
//! (south to north) and column `i` (west to east) map to `j * (cols + 1) + i`.

use globe_codec::EdgeIndices;

/// Triangle indices of a grid plus the vertices on each border.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridIndices {
    /// Triangle list, two counter-clockwise triangles per cell.
    pub indices: Vec<u32>,
    /// Border vertices, each list walking the tile outline in one direction:
    /// west runs north to south, south west to east, east south to north,
    /// north east to west.
    pub edges: EdgeIndices,
}

/// Triangulate a `cols × rows` cell grid.
///
/// With `border_only`, only the ring of cells touching the tile border is
/// emitted; the edge lists are the same either way.
#[must_use]
pub fn regular_grid(cols: u32, rows: u32, border_only: bool) -> GridIndices {
    if cols == 0 || rows == 0 {
        return GridIndices::default();
    }

    let stride = cols + 1;
    let vertex = |i: u32, j: u32| j * stride + i;

    let mut indices = Vec::with_capacity((cols * rows * 6) as usize);
    for j in 0..rows {
        for i in 0..cols {
            let on_border = i == 0 || j == 0 || i == cols - 1 || j == rows - 1;
            if border_only && !on_border {
                continue;
            }
            let a = vertex(i, j);
            let b = vertex(i + 1, j);
            let d = vertex(i, j + 1);
            let e = vertex(i + 1, j + 1);
            indices.extend_from_slice(&[a, b, e, a, e, d]);
        }
    }

    let edges = EdgeIndices {
        west: (0..=rows).rev().map(|j| vertex(0, j)).collect(),
        south: (0..=cols).map(|i| vertex(i, 0)).collect(),
        east: (0..=rows).map(|j| vertex(cols, j)).collect(),
        north: (0..=cols).rev().map(|i| vertex(i, rows)).collect(),
    };

    GridIndices { indices, edges }
}
