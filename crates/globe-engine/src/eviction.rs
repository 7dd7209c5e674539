//! Removing subtrees the selection no longer needs.
//!
//! The selector reports the children of every tile that turned coarse enough.
//! Their parent enters the delete queue; if any of those children is needed
//! again before the deletion runs, the entry is erased. Deletion happens at
//! the end of the frame, releases GPU resources deepest first, and only then
//! unlinks the four children. Tiles shallower than [`PERMANENT_DEPTH`] are
//! never deleted, so a candidate directly below the root queues itself and
//! loses only its own children.

use globe_geo::TileKey;
use globe_lod::Selection;
use rustc_hash::FxHashSet;

use crate::{EngineContext, FrameStats, TerrainEngine};

/// Tiles above this depth stay for the life of the engine.
pub const PERMANENT_DEPTH: u8 = 2;

impl TerrainEngine {
    pub(crate) fn schedule_deletions(&mut self, selection: &Selection) {
        for candidate in &selection.delete_candidates {
            let Some(parent) = candidate.parent() else {
                continue;
            };
            let entry = if parent.depth + 1 < PERMANENT_DEPTH {
                *candidate
            } else {
                parent
            };
            let has_children = self.tree.get(entry).and_then(|n| n.children()).is_some();
            if has_children && self.deletes.push(entry) {
                tracing::trace!(tile = %entry, "children queued for deletion");
            }
        }

        // Anything on the path to a selected tile is live again.
        let mut live = FxHashSet::default();
        for key in &selection.render {
            let mut current = Some(*key);
            while let Some(k) = current {
                if !live.insert(k) {
                    break;
                }
                current = k.parent();
            }
        }
        for key in live {
            if let Some(parent) = key.parent()
                && self.deletes.erase(parent)
            {
                tracing::trace!(tile = %parent, "deletion cancelled, children needed again");
            }
        }
    }

    pub(crate) fn process_deletions(&mut self, ctx: &mut EngineContext<'_>, stats: &mut FrameStats) {
        let mut deferred = Vec::new();
        for _ in 0..self.settings.max_deletions_per_frame {
            let Some(parent) = self.deletes.pop() else {
                break;
            };
            if self.tree.get(parent).and_then(|n| n.children()).is_none() {
                continue;
            }
            if self.drawn_below(parent) {
                deferred.push(parent);
                continue;
            }
            stats.deleted += self.collapse(parent, ctx);
        }
        stats.deferred_deletions = deferred.len();
        for parent in deferred {
            self.deletes.push(parent);
        }
    }

    /// Whether any strict descendant of `parent` was drawn this frame.
    fn drawn_below(&self, parent: TileKey) -> bool {
        self.tree
            .subtree_post_order(parent)
            .into_iter()
            .filter(|k| *k != parent)
            .filter_map(|k| self.tree.get(k))
            .any(|n| n.last_drawn_frame == Some(self.frame))
    }

    /// Delete every removable descendant of `parent`. Returns nodes removed.
    fn collapse(&mut self, parent: TileKey, ctx: &mut EngineContext<'_>) -> usize {
        if parent.depth + 1 < PERMANENT_DEPTH {
            return 0;
        }

        let Self {
            tree,
            workers,
            loads,
            parses,
            deletes,
            ..
        } = self;
        let removed = tree.remove_descendants(parent, |node| {
            if node.busy {
                workers.cancel(node.id);
            }
            loads.remove(node.key);
            parses.remove(node.key);
            deletes.erase(node.key);
            node.release_resources(ctx.gpu, ctx.textures);
        });
        tracing::debug!(tile = %parent, removed, "subtree deleted");
        removed
    }
}
