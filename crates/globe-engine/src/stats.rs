//! Per-frame counters for tooling and logs.

/// What one frame did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    /// Tiles the LOD selector asked for.
    pub selected: usize,
    /// Tiles actually drawn.
    pub drawn: usize,
    /// Selected tiles drawn through an ancestor.
    pub substituted: usize,
    /// Selected tiles with no drawable ancestor at all.
    pub uncovered: usize,
    /// Tiles skipped by the frustum test.
    pub culled: usize,
    pub nodes: usize,
    pub renderable: usize,
    pub created: usize,
    pub deleted: usize,
    pub deferred_deletions: usize,
    pub pending_deletions: usize,
    pub failed: usize,
    pub upload_failures: usize,
    pub pending_loads: usize,
    pub pending_parses: usize,
    pub loads_in_flight: usize,
    pub parses_in_flight: usize,
    pub textures_loading: usize,
}

impl std::fmt::Display for FrameStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "frame {}: drawn {}/{} ({} via ancestor), nodes {} ({} ready), +{} -{}, loads {}+{}, parses {}+{}, failed {}",
            self.frame,
            self.drawn,
            self.selected,
            self.substituted,
            self.nodes,
            self.renderable,
            self.created,
            self.deleted,
            self.pending_loads,
            self.loads_in_flight,
            self.pending_parses,
            self.parses_in_flight,
            self.failed,
        )
    }
}
