//! Reward shaping for a single environment transition.
//!
//! [`RewardModel::reward`] scores an `(old, new)` observation pair:
//!
//! ```text
//! if new.is_dead:
//!     reward = death_penalty                       (short-circuits)
//! else:
//!     reward = (distance decreased ? approach_bonus : retreat_penalty)
//!            + (score increased   ? score_bonus    : 0)
//! ```
//!
//! Distance is the Manhattan distance between the player and the safe zone.
//! The retreat penalty defaults to zero: it also applies to every held tick
//! between decisions, where the player cannot move.
//!
//! When the safe zone moves after a score the distance usually grows, so
//! the score bonus is what makes reaching the zone worthwhile.

use safezone_engine::{Action, Observation};
use serde::{Deserialize, Serialize};

/// Reward magnitudes. Fixed for the duration of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RewardModel {
    /// Reward for any transition that ends in death.
    pub death_penalty: f64,
    /// Reward for strictly reducing the distance to the safe zone.
    pub approach_bonus: f64,
    /// Reward when the distance did not decrease. Usually zero or negative.
    pub retreat_penalty: f64,
    /// Added when the score strictly increased.
    pub score_bonus: f64,
}

impl Default for RewardModel {
    fn default() -> Self {
        Self {
            death_penalty: -100.0,
            approach_bonus: 2.0,
            retreat_penalty: 0.0,
            score_bonus: 5.0,
        }
    }
}

impl RewardModel {
    /// Scores the transition from `old` to `new`.
    ///
    /// The action is accepted for symmetry with the environment contract;
    /// the built-in shaping only looks at the observations.
    #[must_use]
    pub fn reward(&self, old: &Observation, new: &Observation, _action: Action) -> f64 {
        if new.is_dead {
            return self.death_penalty;
        }

        let mut reward = if new.distance_to_safe_zone() < old.distance_to_safe_zone() {
            self.approach_bonus
        } else {
            self.retreat_penalty
        };
        if new.score > old.score {
            reward += self.score_bonus;
        }
        reward
    }
}
