//! Surface data to GPU-ready tile meshes.

use glam::DVec3;
use globe_geo::{GeographicExtent, TileProjection, geographic_to_cartesian};

use crate::normals::{accumulated_normals, radial_normals};
use crate::rebase::{SplitCenter, tile_center};
use crate::skirt::build_skirt;
use crate::surface::SurfaceData;
use crate::texcoords::{
    apply_border_correction, border_correction_factor, crs84_texcoords, mercator_texcoords,
};
use crate::vertex_format::TerrainVertex;

/// How surface normals are derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NormalMode {
    /// Planet-center radial direction; right for the flat virtual mesh.
    Radial,
    /// Face normals accumulated per vertex; follows real relief.
    Accumulated,
}

/// Per-tile synthesis parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshParams {
    pub depth: u8,
    pub projection: TileProjection,
    pub skirt_depth: f64,
    pub normals: NormalMode,
}

/// Output of mesh synthesis, ready for upload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileMesh {
    /// Surface vertices relative to `center`.
    pub vertices: Vec<TerrainVertex>,
    /// Surface triangle list.
    pub indices: Vec<u32>,
    /// Skirt triangle strip relative to `center`.
    pub skirt: Vec<TerrainVertex>,
    /// Double-precision re-basing center.
    pub center: DVec3,
    /// `center` split for the shader.
    pub center_split: SplitCenter,
}

impl TileMesh {
    /// Bytes the mesh occupies once uploaded.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        (self.vertices.len() + self.skirt.len()) * size_of::<TerrainVertex>()
            + self.indices.len() * size_of::<u32>()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Build surface and skirt vertex buffers for one tile.
///
/// Texture coordinates are computed for the imagery projection, pulled in at
/// the borders, and copied into the skirt before positions are converted to
/// ECEF and re-based on the tile center.
#[must_use]
pub fn synthesize(surface: &SurfaceData, extent: &GeographicExtent, params: &MeshParams) -> TileMesh {
    let mut texcoords = match params.projection {
        TileProjection::WebMercator => mercator_texcoords(&surface.coords, extent, params.depth),
        TileProjection::Crs84 => crs84_texcoords(&surface.coords, extent),
    };
    apply_border_correction(
        &mut texcoords,
        &surface.edges,
        border_correction_factor(params.depth),
    );
    let skirt = build_skirt(&surface.coords, &texcoords, &surface.edges, params.skirt_depth);

    let center = tile_center(extent, params.depth);
    let positions = to_cartesian(&surface.coords);
    let normals = match params.normals {
        NormalMode::Radial => radial_normals(&positions),
        NormalMode::Accumulated => accumulated_normals(&positions, &surface.indices),
    };

    let vertices = positions
        .iter()
        .zip(&normals)
        .zip(&texcoords)
        .zip(&surface.coords)
        .map(|(((p, n), st), geo)| TerrainVertex::new(relative(*p, center), *n, *st, geo.z as f32))
        .collect();

    let skirt_positions = to_cartesian(&skirt.coords);
    let skirt_normals = radial_normals(&skirt_positions);
    let skirt = skirt_positions
        .iter()
        .zip(&skirt_normals)
        .zip(&skirt.texcoords)
        .zip(&skirt.altitudes)
        .map(|(((p, n), st), alt)| TerrainVertex::new(relative(*p, center), *n, *st, *alt))
        .collect();

    TileMesh {
        vertices,
        indices: surface.indices.clone(),
        skirt,
        center,
        center_split: SplitCenter::from_dvec3(center),
    }
}

fn to_cartesian(coords: &[DVec3]) -> Vec<DVec3> {
    coords
        .iter()
        .map(|c| geographic_to_cartesian(c.x, c.y, c.z))
        .collect()
}

fn relative(p: DVec3, center: DVec3) -> [f32; 3] {
    (p - center).as_vec3().to_array()
}
