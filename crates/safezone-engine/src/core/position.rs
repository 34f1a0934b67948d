use serde::{Deserialize, Serialize};

/// A cell on the grid, in screen coordinates (`y` grows downward).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the Manhattan (L1) distance between two cells.
    ///
    /// # Examples
    ///
    /// ```
    /// use safezone_engine::Position;
    ///
    /// let a = Position::new(1, 1);
    /// let b = Position::new(3, 0);
    /// assert_eq!(a.manhattan_distance(b), 3);
    /// ```
    #[must_use]
    pub const fn manhattan_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Returns this position shifted by `(dx, dy)`.
    #[must_use]
    pub const fn translated(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}
