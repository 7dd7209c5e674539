//! Mesh synthesis for terrain tiles: regular grids, virtual ellipsoid meshes,
//! imagery texture coordinates, double-precision re-basing, normals and skirts.

pub mod grid;
pub mod normals;
pub mod rebase;
pub mod skirt;
pub mod surface;
pub mod synth;
pub mod texcoords;
pub mod vertex_format;

pub use grid::{GridIndices, regular_grid};
pub use normals::{accumulated_normals, radial_normals};
pub use rebase::{SplitCenter, split_double, tile_center};
pub use skirt::{DEFAULT_SKIRT_DEPTH, SkirtGeometry, build_skirt};
pub use surface::{SurfaceData, virtual_surface};
pub use synth::{MeshParams, NormalMode, TileMesh, synthesize};
pub use texcoords::{
    apply_border_correction, border_correction_factor, crs84_texcoords, mercator_texcoords,
};
pub use vertex_format::{TERRAIN_VERTEX_ATTRIBUTES, TERRAIN_VERTEX_LAYOUT, TerrainVertex};
