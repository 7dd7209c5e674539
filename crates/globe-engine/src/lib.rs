//! Quadtree terrain streaming engine.
//!
//! Owns the tile tree and drives every tile through fetch, decode, mesh,
//! texture and upload, with work capped per queue and run on a worker pool.
//! Each frame it selects tiles by camera distance, draws them (substituting
//! the nearest ready ancestor where needed) and deletes subtrees the camera
//! has moved away from.

mod context;
mod engine;
mod error;
mod eviction;
mod fetch;
mod node;
mod pipeline;
mod queue;
mod render;
mod settings;
mod stats;
mod tree;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{EngineContext, FrameView};
pub use engine::TerrainEngine;
pub use error::FetchError;
pub use eviction::PERMANENT_DEPTH;
pub use fetch::{FetchService, NoElevation};
pub use node::{
    INITIAL_BLEND, NodeId, SurfaceSource, TextureSlot, TextureState, TileBuffers, TileNode,
    TileState,
};
pub use queue::{DeleteQueue, WorkQueue};
pub use render::DrawSet;
pub use settings::EngineSettings;
pub use stats::FrameStats;
pub use tree::TileTree;
pub use worker::{
    JobKind, JobOutput, JobQueue, JobResult, MeshSpec, TileJob, TileWorkers, build_mesh, execute,
};
