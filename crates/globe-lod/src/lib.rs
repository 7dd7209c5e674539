//! Level-of-detail selection over the tile quadtree: per-depth distance
//! thresholds, the recursive refinement walk, and an optional frustum layer.

mod frustum;
mod selector;
mod thresholds;

pub use frustum::Frustum;
pub use selector::{LodSelector, LodTree, Selection};
pub use thresholds::{DistanceThresholds, LodError};
