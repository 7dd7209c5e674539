//! Tile addressing: depth/x/y keys and the four quadrant names.

use serde::{Deserialize, Serialize};

/// One of the four children of a tile.
///
/// Rows grow downward (Y increases to the south), matching the tile pyramid
/// convention used for file naming:
///
/// ```text
/// +----+----+
/// | LU | RU |
/// +----+----+
/// | LD | RD |
/// +----+----+
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    /// Left-up (west, north).
    LU,
    /// Left-down (west, south).
    LD,
    /// Right-up (east, north).
    RU,
    /// Right-down (east, south).
    RD,
}

impl Quadrant {
    /// All quadrants in traversal order.
    pub const ALL: [Quadrant; 4] = [Quadrant::LU, Quadrant::LD, Quadrant::RU, Quadrant::RD];

    /// Two-letter code used in names and logs.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Quadrant::LU => "LU",
            Quadrant::LD => "LD",
            Quadrant::RU => "RU",
            Quadrant::RD => "RD",
        }
    }

    /// Position of this quadrant in [`Quadrant::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Quadrant::LU => 0,
            Quadrant::LD => 1,
            Quadrant::RU => 2,
            Quadrant::RD => 3,
        }
    }

    /// Whether this quadrant lies in the eastern half.
    #[must_use]
    pub fn is_east(self) -> bool {
        matches!(self, Quadrant::RU | Quadrant::RD)
    }

    /// Whether this quadrant lies in the southern half.
    #[must_use]
    pub fn is_south(self) -> bool {
        matches!(self, Quadrant::LD | Quadrant::RD)
    }
}

/// Address of a tile in the quadtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    /// Quadtree level; 0 is the whole globe.
    pub depth: u8,
    /// Column at this depth, growing eastward.
    pub x: u32,
    /// Row at this depth, growing southward.
    pub y: u32,
}

impl TileKey {
    /// The single root tile.
    pub const ROOT: TileKey = TileKey { depth: 0, x: 0, y: 0 };

    /// Deepest level whose columns and rows fit in `u32`.
    pub const MAX_DEPTH: u8 = 31;

    /// Create a key.
    #[must_use]
    pub const fn new(depth: u8, x: u32, y: u32) -> Self {
        Self { depth, x, y }
    }

    /// Key of the child in `quadrant`.
    ///
    /// Requires `depth < MAX_DEPTH`.
    #[must_use]
    pub fn child(&self, quadrant: Quadrant) -> TileKey {
        debug_assert!(self.depth < Self::MAX_DEPTH, "tile {self} has no children");
        TileKey {
            depth: self.depth + 1,
            x: self.x * 2 + u32::from(quadrant.is_east()),
            y: self.y * 2 + u32::from(quadrant.is_south()),
        }
    }

    /// Keys of all four children in [`Quadrant::ALL`] order.
    #[must_use]
    pub fn children(&self) -> [TileKey; 4] {
        Quadrant::ALL.map(|q| self.child(q))
    }

    /// Key of the parent, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<TileKey> {
        if self.depth == 0 {
            return None;
        }
        Some(TileKey {
            depth: self.depth - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    /// Which quadrant of its parent this tile occupies.
    #[must_use]
    pub fn quadrant(&self) -> Option<Quadrant> {
        if self.depth == 0 {
            return None;
        }
        Some(match (self.x & 1 == 1, self.y & 1 == 1) {
            (false, false) => Quadrant::LU,
            (false, true) => Quadrant::LD,
            (true, false) => Quadrant::RU,
            (true, true) => Quadrant::RD,
        })
    }

    /// The three other children of this tile's parent.
    #[must_use]
    pub fn siblings(&self) -> Vec<TileKey> {
        match self.parent() {
            Some(parent) => parent
                .children()
                .into_iter()
                .filter(|k| k != self)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Relative fetch path: `{depth}/{x}/{y}.terrain`.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}/{}/{}.terrain", self.depth, self.x, self.y)
    }

    /// Expand `{x}`, `{y}` and `{z}` in an imagery URL template.
    #[must_use]
    pub fn fill_template(&self, template: &str) -> String {
        template
            .replace("{z}", &self.depth.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.depth, self.x, self.y)
    }
}
