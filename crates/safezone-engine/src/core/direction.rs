use std::str::FromStr;

use rand::{Rng, distr::StandardUniform, prelude::Distribution};
use serde::{Deserialize, Serialize};

use super::position::Position;

/// One of the five movement directions available to the player.
///
/// The declaration order is the canonical order used everywhere a direction
/// set is enumerated (see [`Direction::ALL`]). State keys are built by walking
/// this order, so changing it changes every key.
///
/// # Coordinate System
///
/// Grid coordinates follow screen conventions: `x` grows to the right and `y`
/// grows downward, so [`Direction::Up`] decreases `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Direction {
    /// Move one cell up.
    Up = 0,
    /// Move one cell down.
    Down = 1,
    /// Move one cell left.
    Left = 2,
    /// Move one cell right.
    Right = 3,
    /// Stay in place.
    None = 4,
}

impl Distribution<Direction> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Direction {
        Direction::ALL[rng.random_range(0..Direction::LEN)]
    }
}

impl Direction {
    /// Number of directions (5).
    pub const LEN: usize = 5;

    /// All directions in canonical order.
    pub const ALL: [Self; Self::LEN] = [Self::Up, Self::Down, Self::Left, Self::Right, Self::None];

    /// Returns the `(dx, dy)` grid offset of a single step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::None => (0, 0),
        }
    }

    /// Returns the position reached by stepping once from `from`.
    #[must_use]
    pub const fn step_from(self, from: Position) -> Position {
        let (dx, dy) = self.offset();
        Position::new(from.x + dx, from.y + dy)
    }

    /// Returns the single character code of this direction.
    ///
    /// # Examples
    ///
    /// ```
    /// use safezone_engine::Direction;
    ///
    /// let codes: String = Direction::ALL.iter().map(|d| d.as_char()).collect();
    /// assert_eq!(codes, "UDLRN");
    /// ```
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Up => 'U',
            Self::Down => 'D',
            Self::Left => 'L',
            Self::Right => 'R',
            Self::None => 'N',
        }
    }

    /// Returns the upper-case name of this direction, as used in JSON.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::None => "NONE",
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("unknown direction: {name:?}")]
pub struct ParseDirectionError {
    name: String,
}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseDirectionError { name: s.to_owned() })
    }
}
