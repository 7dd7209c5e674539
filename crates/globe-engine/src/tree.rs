//! Arena quadtree of tile nodes keyed by [`TileKey`].
//!
//! Parents own their children through the arena: a node's `children` lists
//! keys, and the child's back-reference is its key's parent. Children are
//! always created and removed as a batch of four.

use globe_geo::{BoundingSphere, TileExtent, TileKey, TileProjection};
use globe_lod::LodTree;
use rustc_hash::FxHashMap;

use crate::node::{NodeId, TileNode};

/// The tile quadtree.
#[derive(Debug)]
pub struct TileTree {
    nodes: FxHashMap<TileKey, TileNode>,
    projection: TileProjection,
    next_id: NodeId,
    created: usize,
}

impl TileTree {
    /// A tree holding only the root tile.
    #[must_use]
    pub fn new(projection: TileProjection) -> Self {
        let mut nodes = FxHashMap::default();
        nodes.insert(
            TileKey::ROOT,
            TileNode::new(0, TileKey::ROOT, TileExtent::root(projection)),
        );
        Self {
            nodes,
            projection,
            next_id: 1,
            created: 0,
        }
    }

    #[must_use]
    pub fn projection(&self) -> TileProjection {
        self.projection
    }

    #[must_use]
    pub fn get(&self, key: TileKey) -> Option<&TileNode> {
        self.nodes.get(&key)
    }

    pub fn get_mut(&mut self, key: TileKey) -> Option<&mut TileNode> {
        self.nodes.get_mut(&key)
    }

    #[must_use]
    pub fn contains(&self, key: TileKey) -> bool {
        self.nodes.contains_key(&key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TileNode> {
        self.nodes.values()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut TileNode> {
        self.nodes.values_mut()
    }

    #[must_use]
    pub fn is_renderable(&self, key: TileKey) -> bool {
        self.nodes
            .get(&key)
            .is_some_and(|n| n.state.is_renderable())
    }

    /// Nodes created since the last call.
    pub fn take_created(&mut self) -> usize {
        std::mem::take(&mut self.created)
    }

    /// Keys of the subtree under `key` (inclusive), children before parents.
    #[must_use]
    pub fn subtree_post_order(&self, key: TileKey) -> Vec<TileKey> {
        let mut out = Vec::new();
        let mut stack = vec![(key, false)];
        while let Some((k, expanded)) = stack.pop() {
            if expanded {
                out.push(k);
                continue;
            }
            let Some(node) = self.nodes.get(&k) else {
                continue;
            };
            stack.push((k, true));
            if let Some(children) = node.children {
                stack.extend(children.iter().rev().map(|c| (*c, false)));
            }
        }
        out
    }

    /// Remove every descendant of `key`, deepest first, then unlink them.
    ///
    /// `release` sees each node before it leaves the arena. Returns the number
    /// of nodes removed.
    pub(crate) fn remove_descendants<F: FnMut(&mut TileNode)>(
        &mut self,
        key: TileKey,
        mut release: F,
    ) -> usize {
        let Some(children) = self.nodes.get(&key).and_then(|n| n.children) else {
            return 0;
        };
        let mut removed = 0;
        for child in children {
            for k in self.subtree_post_order(child) {
                if let Some(mut node) = self.nodes.remove(&k) {
                    release(&mut node);
                    removed += 1;
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(&key) {
            node.children = None;
        }
        removed
    }
}

impl LodTree for TileTree {
    fn bounding_sphere(&mut self, key: TileKey) -> Option<BoundingSphere> {
        self.nodes.get_mut(&key).map(TileNode::bounding_sphere)
    }

    fn children(&self, key: TileKey) -> Option<[TileKey; 4]> {
        self.nodes.get(&key).and_then(|n| n.children)
    }

    fn ensure_children(&mut self, key: TileKey) -> bool {
        let Some(parent) = self.nodes.get(&key) else {
            return false;
        };
        if parent.children.is_some() {
            return false;
        }
        let extent = parent.extent;
        let keys = key.children();
        for (child, child_extent) in keys.into_iter().zip(extent.children(self.projection)) {
            let id = self.next_id;
            self.next_id += 1;
            self.nodes.insert(child, TileNode::new(id, child, child_extent));
        }
        if let Some(parent) = self.nodes.get_mut(&key) {
            parent.children = Some(keys);
        }
        self.created += 4;
        tracing::debug!(tile = %key, "children created");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refined_tree() -> TileTree {
        let mut tree = TileTree::new(TileProjection::WebMercator);
        tree.ensure_children(TileKey::ROOT);
        tree.ensure_children(TileKey::new(1, 1, 0));
        tree.ensure_children(TileKey::new(2, 2, 1));
        tree
    }

    #[test]
    fn test_new_tree_has_root_only() {
        let tree = TileTree::new(TileProjection::Crs84);
        assert_eq!(tree.len(), 1);
        assert!(tree.contains(TileKey::ROOT));
    }

    #[test]
    fn test_children_created_in_batches_of_four() {
        let mut tree = refined_tree();
        assert_eq!(tree.len(), 13);
        assert_eq!(tree.take_created(), 12);
        assert_eq!(tree.take_created(), 0);
        for node in tree.nodes() {
            if let Some(children) = node.children() {
                for c in children {
                    assert_eq!(tree.get(c).unwrap().parent(), Some(node.key()));
                }
            }
        }
    }

    #[test]
    fn test_ensure_children_is_lazy() {
        let mut tree = refined_tree();
        assert!(!tree.ensure_children(TileKey::ROOT));
        assert_eq!(tree.len(), 13);
    }

    #[test]
    fn test_child_extents_follow_parent() {
        let tree = refined_tree();
        let parent = tree.get(TileKey::new(1, 1, 0)).unwrap();
        let child = tree.get(TileKey::new(2, 3, 1)).unwrap();
        assert_eq!(child.extent().geographic.max_lon, parent.extent().geographic.max_lon);
        assert_eq!(child.extent().geographic.min_lat, parent.extent().geographic.min_lat);
    }

    #[test]
    fn test_post_order_visits_children_first() {
        let tree = refined_tree();
        let order = tree.subtree_post_order(TileKey::new(1, 1, 0));
        assert_eq!(order.len(), 9);
        assert_eq!(order.last(), Some(&TileKey::new(1, 1, 0)));
        let pos = |k: TileKey| order.iter().position(|o| *o == k).unwrap();
        assert!(pos(TileKey::new(3, 4, 2)) < pos(TileKey::new(2, 2, 1)));
    }

    #[test]
    fn test_remove_descendants_releases_then_unlinks() {
        let mut tree = refined_tree();
        let mut seen = Vec::new();
        let removed = tree.remove_descendants(TileKey::new(1, 1, 0), |n| seen.push(n.key()));
        assert_eq!(removed, 8);
        assert_eq!(seen.len(), 8);
        assert!(tree.get(TileKey::new(1, 1, 0)).unwrap().children().is_none());
        assert_eq!(tree.len(), 5);
        // Grandchildren went before their parent.
        let pos = |k: TileKey| seen.iter().position(|o| *o == k).unwrap();
        assert!(pos(TileKey::new(3, 5, 3)) < pos(TileKey::new(2, 2, 1)));
    }

    #[test]
    fn test_node_ids_are_unique() {
        let mut tree = refined_tree();
        let before: Vec<NodeId> = tree.nodes().map(TileNode::id).collect();
        tree.remove_descendants(TileKey::new(2, 2, 1), |_| {});
        tree.ensure_children(TileKey::new(2, 2, 1));
        let reborn = tree.get(TileKey::new(3, 4, 2)).unwrap().id();
        assert!(!before.contains(&reborn));
    }
}
