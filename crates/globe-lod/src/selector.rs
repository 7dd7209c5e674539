//! Distance-driven quadtree refinement.
//!
//! Each frame the walk starts at the root. A tile farther from the camera
//! than its depth's threshold is fine enough and is rendered; anything
//! closer is split into its four children, down to `max_depth`. Subtrees under
//! a tile that turned coarse-enough become deletion candidates.
//!
//! This is distance refinement, not visibility: near tiles behind the camera
//! still refine unless a [`Frustum`] is supplied.

use glam::DVec3;
use globe_geo::{BoundingSphere, TileKey};

use crate::{DistanceThresholds, Frustum};

/// The quadtree as the selector sees it.
pub trait LodTree {
    /// Bounding sphere of `key`, or `None` when the node has no usable extent.
    fn bounding_sphere(&mut self, key: TileKey) -> Option<BoundingSphere>;

    /// The four children of `key`, if it has been refined.
    fn children(&self, key: TileKey) -> Option<[TileKey; 4]>;

    /// Create the four children of `key` if absent. Returns `true` when they
    /// were created by this call.
    fn ensure_children(&mut self, key: TileKey) -> bool;
}

/// Outcome of one selection pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// Tiles to draw this frame, in depth-first LU, LD, RU, RD order.
    pub render: Vec<TileKey>,
    /// Roots of subtrees finer than needed.
    pub delete_candidates: Vec<TileKey>,
    /// Number of tiles whose children were created during this pass.
    pub refined: usize,
    /// Tiles skipped by the frustum test.
    pub culled: usize,
}

/// Walks a [`LodTree`] choosing the tiles to render.
#[derive(Clone, Debug)]
pub struct LodSelector {
    thresholds: DistanceThresholds,
    max_depth: u8,
}

impl LodSelector {
    /// `max_depth` is capped at [`TileKey::MAX_DEPTH`].
    #[must_use]
    pub fn new(thresholds: DistanceThresholds, max_depth: u8) -> Self {
        if max_depth > TileKey::MAX_DEPTH {
            tracing::warn!(
                requested = max_depth,
                max = TileKey::MAX_DEPTH,
                "max depth capped"
            );
        }
        Self {
            thresholds,
            max_depth: max_depth.min(TileKey::MAX_DEPTH),
        }
    }

    #[must_use]
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    #[must_use]
    pub fn thresholds(&self) -> &DistanceThresholds {
        &self.thresholds
    }

    /// Run the selection from `root` for a camera at `camera` (ECEF meters).
    pub fn select<T: LodTree>(
        &self,
        tree: &mut T,
        root: TileKey,
        camera: DVec3,
        frustum: Option<&Frustum>,
    ) -> Selection {
        let mut selection = Selection::default();
        self.visit(tree, root, camera, frustum, &mut selection);
        tracing::trace!(
            render = selection.render.len(),
            delete = selection.delete_candidates.len(),
            refined = selection.refined,
            "lod selection"
        );
        selection
    }

    fn visit<T: LodTree>(
        &self,
        tree: &mut T,
        key: TileKey,
        camera: DVec3,
        frustum: Option<&Frustum>,
        out: &mut Selection,
    ) {
        let Some(sphere) = tree.bounding_sphere(key) else {
            tracing::warn!(tile = %key, "tile without extent skipped");
            return;
        };

        if let Some(frustum) = frustum
            && !frustum.intersects_sphere(&sphere)
        {
            out.culled += 1;
            if let Some(children) = tree.children(key) {
                out.delete_candidates.extend(children);
            }
            return;
        }

        let distance = sphere.distance_to(camera);
        if distance > self.thresholds.for_depth(key.depth) {
            out.render.push(key);
            if let Some(children) = tree.children(key) {
                out.delete_candidates.extend(children);
            }
            return;
        }

        if key.depth < self.max_depth {
            if tree.ensure_children(key) {
                out.refined += 1;
            }
            if let Some(children) = tree.children(key) {
                for child in children {
                    self.visit(tree, child, camera, frustum, out);
                }
            }
        } else {
            out.render.push(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use globe_geo::{TileExtent, TileProjection};

    /// Minimal tree: extents plus lazily created children.
    struct MapTree {
        nodes: HashMap<TileKey, (TileExtent, Option<[TileKey; 4]>)>,
        created: usize,
    }

    impl MapTree {
        fn new() -> Self {
            let mut nodes = HashMap::new();
            nodes.insert(TileKey::ROOT, (TileExtent::root(TileProjection::Crs84), None));
            Self { nodes, created: 0 }
        }
    }

    impl LodTree for MapTree {
        fn bounding_sphere(&mut self, key: TileKey) -> Option<BoundingSphere> {
            self.nodes
                .get(&key)
                .map(|(e, _)| BoundingSphere::from_extent(&e.geographic))
        }

        fn children(&self, key: TileKey) -> Option<[TileKey; 4]> {
            self.nodes.get(&key).and_then(|(_, c)| *c)
        }

        fn ensure_children(&mut self, key: TileKey) -> bool {
            let Some((extent, children)) = self.nodes.get(&key).copied() else {
                return false;
            };
            if children.is_some() {
                return false;
            }
            let keys = key.children();
            for (child, ext) in keys.iter().zip(extent.children(TileProjection::Crs84)) {
                self.nodes.insert(*child, (ext, None));
            }
            self.nodes.get_mut(&key).unwrap().1 = Some(keys);
            self.created += 4;
            true
        }
    }

    fn selector(max_depth: u8) -> LodSelector {
        LodSelector::new(DistanceThresholds::halving(20_000_000.0, max_depth), max_depth)
    }

    fn camera_above(lon: f64, lat: f64, alt: f64) -> DVec3 {
        globe_geo::geographic_to_cartesian(lon, lat, alt)
    }

    #[test]
    fn test_max_depth_capped_at_key_limit() {
        assert_eq!(selector(40).max_depth(), TileKey::MAX_DEPTH);
        assert_eq!(selector(TileKey::MAX_DEPTH).max_depth(), TileKey::MAX_DEPTH);
    }

    #[test]
    fn test_far_camera_renders_root_only() {
        let mut tree = MapTree::new();
        let cam = DVec3::new(1.0e9, 0.0, 0.0);
        let sel = selector(10).select(&mut tree, TileKey::ROOT, cam, None);
        assert_eq!(sel.render, vec![TileKey::ROOT]);
        assert_eq!(tree.created, 0);
    }

    #[test]
    fn test_near_camera_refines_to_max_depth() {
        let mut tree = MapTree::new();
        let cam = camera_above(10.0, 10.0, 100.0);
        let sel = selector(6).select(&mut tree, TileKey::ROOT, cam, None);
        assert!(sel.render.iter().any(|k| k.depth == 6));
        assert!(sel.render.iter().all(|k| k.depth <= 6));
        assert!(sel.delete_candidates.is_empty());
    }

    #[test]
    fn test_children_counts_are_zero_or_four() {
        let mut tree = MapTree::new();
        let cam = camera_above(-70.0, 45.0, 1000.0);
        selector(7).select(&mut tree, TileKey::ROOT, cam, None);
        for (key, (_, children)) in &tree.nodes {
            if let Some(children) = children {
                assert_eq!(children.len(), 4);
                assert!(children.iter().all(|c| tree.nodes.contains_key(c)), "{key}");
            }
        }
        assert_eq!(tree.created % 4, 0);
    }

    #[test]
    fn test_static_camera_is_idempotent() {
        let mut tree = MapTree::new();
        let cam = camera_above(139.7, 35.7, 5_000.0);
        let s = selector(8);
        let first = s.select(&mut tree, TileKey::ROOT, cam, None);
        let created = tree.created;
        let second = s.select(&mut tree, TileKey::ROOT, cam, None);
        assert_eq!(first.render, second.render);
        assert_eq!(tree.created, created);
        assert_eq!(second.refined, 0);
    }

    #[test]
    fn test_receding_camera_marks_children_for_deletion() {
        let mut tree = MapTree::new();
        let s = selector(5);
        s.select(&mut tree, TileKey::ROOT, camera_above(0.0, 0.0, 10.0), None);
        let far = s.select(&mut tree, TileKey::ROOT, DVec3::new(1.0e9, 0.0, 0.0), None);
        assert_eq!(far.render, vec![TileKey::ROOT]);
        assert_eq!(far.delete_candidates, TileKey::ROOT.children().to_vec());
    }

    #[test]
    fn test_distance_equal_to_threshold_refines() {
        // Strict comparison: exactly at the threshold the tile is not coarse enough.
        let mut tree = MapTree::new();
        let sphere = tree.bounding_sphere(TileKey::ROOT).unwrap();
        let cam = sphere.center + DVec3::X * (sphere.radius + 1_000_000.0);
        let threshold = sphere.distance_to(cam);
        let s = LodSelector::new(DistanceThresholds::custom(vec![threshold, 1.0]).unwrap(), 1);
        let at = s.select(&mut tree, TileKey::ROOT, cam, None);
        assert_eq!(at.render.len(), 4);

        let beyond = cam + DVec3::X * 1000.0;
        let past = s.select(&mut tree, TileKey::ROOT, beyond, None);
        assert_eq!(past.render, vec![TileKey::ROOT]);
    }

    #[test]
    fn test_render_order_is_lu_ld_ru_rd() {
        let mut tree = MapTree::new();
        let s = LodSelector::new(DistanceThresholds::custom(vec![f64::MAX, 1.0]).unwrap(), 1);
        let sel = s.select(&mut tree, TileKey::ROOT, DVec3::ZERO, None);
        assert_eq!(sel.render, TileKey::ROOT.children().to_vec());
    }

    #[test]
    fn test_frustum_layer() {
        use glam::DMat4;
        let eye = DVec3::new(1.0e8, 0.0, 0.0);
        let proj = DMat4::perspective_rh(0.8, 1.0, 1000.0, 5.0e8);
        let s = selector(3);

        let toward = proj * DMat4::look_at_rh(eye, DVec3::ZERO, DVec3::Z);
        let mut tree = MapTree::new();
        let seen = s.select(&mut tree, TileKey::ROOT, eye, Some(&Frustum::from_view_projection(&toward)));
        assert_eq!(seen.render, vec![TileKey::ROOT]);
        assert_eq!(seen.culled, 0);

        let away = proj * DMat4::look_at_rh(eye, eye * 2.0, DVec3::Z);
        let hidden = s.select(&mut tree, TileKey::ROOT, eye, Some(&Frustum::from_view_projection(&away)));
        assert!(hidden.render.is_empty());
        assert_eq!(hidden.culled, 1);
    }
}
