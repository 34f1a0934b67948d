use rand::{Rng, distr::StandardUniform, prelude::Distribution};
use serde::{Deserialize, Serialize};

use super::direction::Direction;

/// A single agent command: a movement direction plus an interaction flag.
///
/// The interaction flag models an auxiliary "activate" input that is
/// independent of the direction. In [`GridWorld`](crate::GridWorld) the player
/// only moves while interacting; a non-interacting action lets the world tick
/// without moving the player.
///
/// Decision actions always interact. The held action between decisions is
/// [`Action::NOOP`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Action {
    pub direction: Direction,
    pub interact: bool,
}

/// Samples a uniformly random decision action (random direction, interacting).
impl Distribution<Action> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        Action::decision(rng.random())
    }
}

impl Action {
    /// The action held between decision steps: stay in place, no interaction.
    pub const NOOP: Self = Self {
        direction: Direction::None,
        interact: false,
    };

    /// All decision actions, in canonical direction order.
    pub const DECISIONS: [Self; Direction::LEN] = [
        Self::decision(Direction::Up),
        Self::decision(Direction::Down),
        Self::decision(Direction::Left),
        Self::decision(Direction::Right),
        Self::decision(Direction::None),
    ];

    #[must_use]
    pub const fn new(direction: Direction, interact: bool) -> Self {
        Self {
            direction,
            interact,
        }
    }

    /// Creates an interacting action in the given direction.
    #[must_use]
    pub const fn decision(direction: Direction) -> Self {
        Self::new(direction, true)
    }
}
