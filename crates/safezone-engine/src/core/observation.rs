use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::position::Position;

/// A read-only snapshot of the world, produced by an
/// [`Environment`](crate::Environment) after every reset or step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Observation {
    pub player: Position,
    pub traps: BTreeSet<Position>,
    pub safe_zone: Position,
    /// Number of safe zones reached so far in this episode. Never decreases.
    pub score: u32,
    pub is_dead: bool,
}

impl Observation {
    /// Returns `true` if `position` holds a trap.
    #[must_use]
    pub fn is_trap(&self, position: Position) -> bool {
        self.traps.contains(&position)
    }

    /// Manhattan distance between the player and the safe zone.
    #[must_use]
    pub fn distance_to_safe_zone(&self) -> u32 {
        self.player.manhattan_distance(self.safe_zone)
    }

    /// Returns a copy of this observation with every position shifted by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            player: self.player.translated(dx, dy),
            traps: self.traps.iter().map(|t| t.translated(dx, dy)).collect(),
            safe_zone: self.safe_zone.translated(dx, dy),
            score: self.score,
            is_dead: self.is_dead,
        }
    }
}
