//! Drawing the selected tiles with ancestor fallback.
//!
//! Each selected tile resolves to the nearest drawable node on its ancestor
//! chain (itself included). The walk is iterative and bounded by depth, and
//! the root is always drawable thanks to its flat seed mesh, so the globe is
//! always covered. Duplicate substitutes collapse to one draw, and a node is
//! dropped when one of its ancestors is drawn so tiles never overlap.

use globe_geo::TileKey;
use globe_render::RenderBackend;
use rustc_hash::FxHashSet;

use crate::node::{TextureState, TileState};
use crate::{FrameStats, TerrainEngine};

/// Resolved draws for one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrawSet {
    /// Tiles to draw, in selection order.
    pub tiles: Vec<TileKey>,
    /// Selected tiles drawn through an ancestor.
    pub substituted: usize,
    /// Selected tiles with nothing drawable above them.
    pub uncovered: usize,
}

impl TerrainEngine {
    /// Whether `key` can be drawn as itself this frame.
    ///
    /// With `require_complete_siblings`, a tile draws only when all four
    /// children of its parent are renderable; otherwise the parent covers them.
    #[must_use]
    pub fn is_drawable(&self, key: TileKey) -> bool {
        if key == TileKey::ROOT {
            return self.tree.is_renderable(key) || self.root_seed.is_some();
        }
        if !self.tree.is_renderable(key) {
            return false;
        }
        !self.settings.require_complete_siblings
            || key.siblings().iter().all(|s| self.tree.is_renderable(*s))
    }

    /// Nearest drawable node on the chain from `key` up to the root.
    #[must_use]
    pub fn resolve_drawable(&self, key: TileKey) -> Option<TileKey> {
        let mut current = Some(key);
        while let Some(k) = current {
            if self.is_drawable(k) {
                return Some(k);
            }
            current = k.parent();
        }
        None
    }

    /// The tiles that will be drawn for `selected`, in draw order.
    #[must_use]
    pub fn draw_set(&self, selected: &[TileKey]) -> DrawSet {
        let mut set = DrawSet::default();
        let mut seen = FxHashSet::default();
        for &key in selected {
            match self.resolve_drawable(key) {
                Some(target) => {
                    if target != key {
                        set.substituted += 1;
                    }
                    if seen.insert(target) {
                        set.tiles.push(target);
                    }
                }
                None => set.uncovered += 1,
            }
        }
        set.tiles
            .retain(|k| !ancestors(*k).any(|a| seen.contains(&a)));
        set
    }

    pub(crate) fn render(
        &mut self,
        backend: &mut dyn RenderBackend,
        selected: &[TileKey],
        now: f64,
        stats: &mut FrameStats,
    ) {
        let set = self.draw_set(selected);
        stats.substituted = set.substituted;
        stats.uncovered = set.uncovered;
        if set.uncovered > 0 {
            tracing::warn!(uncovered = set.uncovered, "tiles with nothing drawable above them");
        }

        let fade_in = self.settings.fade_in_secs;
        for key in set.tiles {
            let Some(node) = self.tree.get_mut(key) else {
                continue;
            };
            let (mesh, buffers) = match &node.state {
                TileState::Renderable { mesh, buffers } => (mesh, buffers),
                _ => match &self.root_seed {
                    Some((mesh, buffers)) if key == TileKey::ROOT => (mesh, buffers),
                    _ => continue,
                },
            };
            let (origin, buffers) = (mesh.center_split, buffers.clone());

            let blend = node.blend_at(now, fade_in);
            node.last_drawn_frame = Some(self.frame);

            backend.begin_tile(key, origin, blend);
            let ready = node.textures.iter().filter_map(|s| match s.state {
                TextureState::Ready(h) => Some(h),
                _ => None,
            });
            for (slot, handle) in ready.enumerate() {
                backend.bind_texture(handle, slot as u32);
            }
            backend.draw_indexed(buffers.vertices, buffers.indices, buffers.index_count);
            if let Some((skirt, count)) = buffers.skirt {
                backend.draw_strip(skirt, count);
            }
            stats.drawn += 1;
        }
    }
}

/// Strict ancestors of `key`, nearest first.
fn ancestors(key: TileKey) -> impl Iterator<Item = TileKey> {
    std::iter::successors(key.parent(), |k| k.parent())
}
