//! State abstraction: compressing an observation into a small symbolic key.
//!
//! Policies are tables, so the raw observation (absolute positions, an
//! arbitrary trap set) has to be folded into a finite key space first.
//! [`StateKey::encode`] keeps only what the player can act on:
//!
//! 1. **Trap flags** - for each [`Direction`] in canonical order, whether one
//!    step that way lands on a trap
//! 2. **Safe-zone bearing** - where the safe zone lies relative to the player
//!    ([`SafeZoneBearing`], 9 values)
//!
//! This bounds the key space to `2^5 × 9 = 288` keys.
//!
//! # Text Form
//!
//! Keys are compared as values. The text form only exists at the
//! serialization boundary (saved models):
//!
//! ```text
//! UF DF LT RF NF WXRU
//! ^^ ^^ ^^ ^^ ^^ ^^^^
//! |  |  |  |  |  └─ 'W' + bearing code (N, U, D, L, R, XLU, XRU, XLD, XRD)
//! └──┴──┴──┴──┴──── direction letter + 'T' (trap) or 'F' (free)
//! ```
//!
//! [`Display`](fmt::Display) and [`FromStr`] agree on this format.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//!
//! use safezone_agent::state_key::{SafeZoneBearing, StateKey};
//! use safezone_engine::{Observation, Position};
//!
//! let observation = Observation {
//!     player: Position::new(2, 2),
//!     traps: BTreeSet::from([Position::new(1, 2)]),
//!     safe_zone: Position::new(4, 1),
//!     score: 0,
//!     is_dead: false,
//! };
//! let key = StateKey::encode(&observation);
//! assert_eq!(key.bearing(), SafeZoneBearing::UpRight);
//! assert_eq!(key.to_string(), "UF DF LT RF NF WXRU");
//! ```

use std::{cmp::Ordering, fmt, str::FromStr};

use safezone_engine::{Direction, Observation, Position};

/// Where the safe zone lies relative to the player.
///
/// Classification looks at the vertical offset first, then the horizontal
/// one, so every observation maps to exactly one bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SafeZoneBearing {
    /// The player is standing in the safe zone.
    Here,
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl SafeZoneBearing {
    /// Number of bearings (9).
    pub const LEN: usize = 9;

    pub const ALL: [Self; Self::LEN] = [
        Self::Here,
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
        Self::UpLeft,
        Self::UpRight,
        Self::DownLeft,
        Self::DownRight,
    ];

    /// Returns the bearing of `target` as seen from `from`.
    #[must_use]
    pub fn between(from: Position, target: Position) -> Self {
        // screen coordinates: a smaller y is further up
        let vertical = target.y.cmp(&from.y);
        let horizontal = target.x.cmp(&from.x);
        match (vertical, horizontal) {
            (Ordering::Equal, Ordering::Equal) => Self::Here,
            (Ordering::Less, Ordering::Equal) => Self::Up,
            (Ordering::Greater, Ordering::Equal) => Self::Down,
            (Ordering::Equal, Ordering::Less) => Self::Left,
            (Ordering::Equal, Ordering::Greater) => Self::Right,
            (Ordering::Less, Ordering::Less) => Self::UpLeft,
            (Ordering::Less, Ordering::Greater) => Self::UpRight,
            (Ordering::Greater, Ordering::Less) => Self::DownLeft,
            (Ordering::Greater, Ordering::Greater) => Self::DownRight,
        }
    }

    /// Returns the short code used in the text form of a [`StateKey`].
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Here => "N",
            Self::Up => "U",
            Self::Down => "D",
            Self::Left => "L",
            Self::Right => "R",
            Self::UpLeft => "XLU",
            Self::UpRight => "XRU",
            Self::DownLeft => "XLD",
            Self::DownRight => "XRD",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.code() == code)
    }
}

/// Symbolic summary of an observation, used as a policy table index.
///
/// Two observations with the same trap neighbourhood and the same relative
/// safe-zone bearing produce equal keys, wherever they are on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateKey {
    traps: [bool; Direction::LEN],
    bearing: SafeZoneBearing,
}

impl StateKey {
    /// Number of distinct keys.
    pub const SPACE_SIZE: usize = (1 << Direction::LEN) * SafeZoneBearing::LEN;

    #[must_use]
    pub const fn new(traps: [bool; Direction::LEN], bearing: SafeZoneBearing) -> Self {
        Self { traps, bearing }
    }

    /// Encodes an observation. Pure and total.
    #[must_use]
    pub fn encode(observation: &Observation) -> Self {
        let player = observation.player;
        let traps = Direction::ALL.map(|d| observation.is_trap(d.step_from(player)));
        let bearing = SafeZoneBearing::between(player, observation.safe_zone);
        Self { traps, bearing }
    }

    /// Returns whether stepping in `direction` lands on a trap.
    #[must_use]
    pub const fn is_trap(&self, direction: Direction) -> bool {
        self.traps[direction as usize]
    }

    #[must_use]
    pub const fn bearing(&self) -> SafeZoneBearing {
        self.bearing
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in Direction::ALL {
            let mark = if self.is_trap(d) { 'T' } else { 'F' };
            write!(f, "{}{mark} ", d.as_char())?;
        }
        write!(f, "W{}", self.bearing.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid state key {key:?}: {reason}")]
pub struct ParseStateKeyError {
    key: String,
    reason: &'static str,
}

impl FromStr for StateKey {
    type Err = ParseStateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = |reason| ParseStateKeyError {
            key: s.to_owned(),
            reason,
        };

        let mut parts = s.split(' ');
        let mut traps = [false; Direction::LEN];
        for (d, trap) in Direction::ALL.into_iter().zip(&mut traps) {
            let part = parts.next().ok_or_else(|| error("missing direction"))?;
            let mut chars = part.chars();
            if chars.next() != Some(d.as_char()) {
                return Err(error("directions out of canonical order"));
            }
            *trap = match (chars.next(), chars.next()) {
                (Some('T'), None) => true,
                (Some('F'), None) => false,
                _ => return Err(error("expected 'T' or 'F' after direction")),
            };
        }

        let bearing = parts
            .next()
            .and_then(|part| part.strip_prefix('W'))
            .ok_or_else(|| error("missing safe zone bearing"))?;
        let bearing = SafeZoneBearing::from_code(bearing).ok_or_else(|| error("unknown bearing"))?;
        if parts.next().is_some() {
            return Err(error("trailing input"));
        }
        Ok(Self { traps, bearing })
    }
}
