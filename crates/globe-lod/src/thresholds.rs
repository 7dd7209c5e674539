//! Per-depth camera distance thresholds.

/// Errors from building a threshold table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LodError {
    /// The table has no entries.
    #[error("threshold table is empty")]
    Empty,
    /// An entry is zero, negative or NaN.
    #[error("threshold for depth {depth} must be positive, got {value}")]
    NonPositive {
        /// Depth of the bad entry.
        depth: usize,
        /// The value found.
        value: f64,
    },
    /// A deeper level has a larger threshold than a coarser one.
    #[error("threshold for depth {depth} ({value}) exceeds the coarser level's {previous}")]
    Increasing {
        /// Depth of the bad entry.
        depth: usize,
        /// The value found.
        value: f64,
        /// The coarser level's value.
        previous: f64,
    },
}

/// Distance beyond which a tile at a given depth is detailed enough.
///
/// Coarser depths carry larger thresholds. Depths past the end of the table
/// reuse the last entry.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceThresholds {
    by_depth: Vec<f64>,
}

impl DistanceThresholds {
    /// Halving table: `base / 2^depth` for depths `0..=max_depth`.
    #[must_use]
    pub fn halving(base: f64, max_depth: u8) -> Self {
        Self {
            by_depth: (0..=max_depth)
                .map(|d| base / 2f64.powi(i32::from(d)))
                .collect(),
        }
    }

    /// Explicit table indexed by depth.
    pub fn custom(by_depth: Vec<f64>) -> Result<Self, LodError> {
        if by_depth.is_empty() {
            return Err(LodError::Empty);
        }
        for (depth, &value) in by_depth.iter().enumerate() {
            if !(value > 0.0) {
                return Err(LodError::NonPositive { depth, value });
            }
            if depth > 0 && value > by_depth[depth - 1] {
                return Err(LodError::Increasing {
                    depth,
                    value,
                    previous: by_depth[depth - 1],
                });
            }
        }
        Ok(Self { by_depth })
    }

    /// Threshold for `depth`.
    #[must_use]
    pub fn for_depth(&self, depth: u8) -> f64 {
        let i = usize::from(depth).min(self.by_depth.len() - 1);
        self.by_depth[i]
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.by_depth
    }
}
