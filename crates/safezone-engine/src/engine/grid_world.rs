use std::collections::BTreeSet;

use rand::{SeedableRng as _, seq::IndexedRandom as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::core::{Action, Direction, Observation, Position};

use super::{
    environment::{Environment, EnvironmentError, EnvironmentFactory},
    world_seed::WorldSeed,
};

/// Size and pacing of a [`GridWorld`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: i32,
    pub height: i32,
    /// Number of traps on the grid at any time.
    pub trap_count: usize,
    /// Ticks the player has to reach the current safe zone before dying.
    pub zone_timeout: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            trap_count: 8,
            zone_timeout: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum GridConfigError {
    #[display("grid must be at least 2x2, got {width}x{height}")]
    TooSmall { width: i32, height: i32 },
    #[display("{trap_count} traps do not fit on a {width}x{height} grid")]
    TooManyTraps {
        trap_count: usize,
        width: i32,
        height: i32,
    },
    #[display("zone timeout must be positive")]
    ZeroTimeout,
    #[display("layout position ({}, {}) is outside the grid", position.x, position.y)]
    OutOfBounds { position: Position },
    #[display("layout places a trap on the spawn or the safe zone")]
    OverlappingLayout,
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), GridConfigError> {
        let Self {
            width,
            height,
            trap_count,
            zone_timeout,
        } = *self;
        if width < 2 || height < 2 {
            return Err(GridConfigError::TooSmall { width, height });
        }
        // player and safe zone each need a free cell
        let cells = usize::try_from(i64::from(width) * i64::from(height)).unwrap_or(usize::MAX);
        if trap_count + 2 > cells {
            return Err(GridConfigError::TooManyTraps {
                trap_count,
                width,
                height,
            });
        }
        if zone_timeout == 0 {
            return Err(GridConfigError::ZeroTimeout);
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        (0..self.width).contains(&position.x) && (0..self.height).contains(&position.y)
    }

    fn clamp(&self, position: Position) -> Position {
        Position::new(
            position.x.clamp(0, self.width - 1),
            position.y.clamp(0, self.height - 1),
        )
    }

    fn spawn(&self) -> Position {
        Position::new(self.width / 2, self.height / 2)
    }

    fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y)))
    }
}

/// A fixed starting arrangement for a [`GridWorld`].
///
/// Used to replay a specific scenario. Only the initial state is fixed; safe
/// zones and traps placed after the first score are still drawn from the
/// world's seed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GridLayout {
    pub spawn: Position,
    pub traps: BTreeSet<Position>,
    pub safe_zone: Position,
}

/// Validated recipe for building [`GridWorld`]s.
///
/// Validation happens once, here; [`EnvironmentFactory::create`] then hands
/// out independent worlds that differ only in their seed.
#[derive(Debug, Clone)]
pub struct GridWorldFactory {
    config: GridConfig,
    layout: Option<GridLayout>,
}

impl GridWorldFactory {
    pub fn new(config: GridConfig) -> Result<Self, GridConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            layout: None,
        })
    }

    pub fn with_layout(config: GridConfig, layout: GridLayout) -> Result<Self, GridConfigError> {
        config.validate()?;
        let endpoints = [&layout.spawn, &layout.safe_zone];
        for &position in layout.traps.iter().chain(endpoints) {
            if !config.contains(position) {
                return Err(GridConfigError::OutOfBounds { position });
            }
        }
        if layout.traps.contains(&layout.spawn) || layout.traps.contains(&layout.safe_zone) {
            return Err(GridConfigError::OverlappingLayout);
        }
        Ok(Self {
            config,
            layout: Some(layout),
        })
    }

    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }
}

impl EnvironmentFactory for GridWorldFactory {
    type Environment = GridWorld;

    fn create(&self, seed: WorldSeed) -> GridWorld {
        GridWorld {
            config: self.config.clone(),
            layout: self.layout.clone(),
            rng: Pcg32::from_seed(seed.0),
            state: None,
        }
    }
}

#[derive(Debug, Clone)]
struct WorldState {
    observation: Observation,
    countdown: u32,
}

/// Reference grid world: dodge traps and chase a moving safe zone.
///
/// # Rules
///
/// - While an action interacts, the player moves one cell in its direction
///   (clamped to the grid). Non-interacting actions only advance time.
/// - Landing on a trap kills the player.
/// - Reaching the safe zone increments the score, moves the safe zone,
///   re-rolls the traps and restarts the countdown.
/// - When the countdown expires outside the safe zone the player dies.
///
/// The countdown guarantees every episode terminates.
///
/// # Example
///
/// ```
/// use safezone_engine::{Action, Direction, Environment as _, GridConfig, GridWorld, WorldSeed};
///
/// let mut world = GridWorld::new(GridConfig::default(), WorldSeed::from_bytes([1; 16])).unwrap();
/// let start = world.reset();
/// let next = world.step(Action::decision(Direction::Right)).unwrap();
/// assert_eq!(next.player.x, start.player.x + 1);
/// ```
#[derive(Debug, Clone)]
pub struct GridWorld {
    config: GridConfig,
    layout: Option<GridLayout>,
    rng: Pcg32,
    state: Option<WorldState>,
}

impl GridWorld {
    /// Creates a world whose initial arrangement is drawn from `seed` on every reset.
    pub fn new(config: GridConfig, seed: WorldSeed) -> Result<Self, GridConfigError> {
        Ok(GridWorldFactory::new(config)?.create(seed))
    }

    /// Creates a world that starts every episode from `layout`.
    ///
    /// `config.trap_count` still controls how many traps are placed after
    /// the first safe zone is reached.
    pub fn with_layout(
        config: GridConfig,
        layout: GridLayout,
        seed: WorldSeed,
    ) -> Result<Self, GridConfigError> {
        Ok(GridWorldFactory::with_layout(config, layout)?.create(seed))
    }

    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Returns the current observation, or `None` before the first reset.
    #[must_use]
    pub fn observation(&self) -> Option<&Observation> {
        self.state.as_ref().map(|s| &s.observation)
    }

    fn random_layout(&mut self) -> GridLayout {
        let spawn = self.config.spawn();
        let (safe_zone, traps) = self.place_zone_and_traps(spawn);
        GridLayout {
            spawn,
            traps,
            safe_zone,
        }
    }

    /// Picks a safe zone and traps on cells other than `player`.
    fn place_zone_and_traps(&mut self, player: Position) -> (Position, BTreeSet<Position>) {
        let free = self
            .config
            .cells()
            .filter(|&c| c != player)
            .collect::<Vec<_>>();
        // validate() guarantees room for the zone plus every trap
        let mut picked = free
            .choose_multiple(&mut self.rng, self.config.trap_count + 1)
            .copied();
        let safe_zone = picked.next().unwrap_or(player);
        let traps = picked.collect();
        (safe_zone, traps)
    }
}

impl Environment for GridWorld {
    fn reset(&mut self) -> Observation {
        let layout = match self.layout.clone() {
            Some(layout) => layout,
            None => self.random_layout(),
        };
        let observation = Observation {
            player: layout.spawn,
            traps: layout.traps,
            safe_zone: layout.safe_zone,
            score: 0,
            is_dead: false,
        };
        self.state = Some(WorldState {
            observation: observation.clone(),
            countdown: self.config.zone_timeout,
        });
        observation
    }

    fn step(&mut self, action: Action) -> Result<Observation, EnvironmentError> {
        let mut state = self.state.take().ok_or(EnvironmentError::NotInitialized)?;
        if state.observation.is_dead {
            self.state = Some(state);
            return Err(EnvironmentError::EpisodeFinished);
        }

        let obs = &mut state.observation;
        if action.interact && action.direction != Direction::None {
            obs.player = self.config.clamp(action.direction.step_from(obs.player));
        }
        state.countdown = state.countdown.saturating_sub(1);

        if obs.is_trap(obs.player) {
            obs.is_dead = true;
        } else if obs.player == obs.safe_zone {
            obs.score += 1;
            let (safe_zone, traps) = self.place_zone_and_traps(obs.player);
            obs.safe_zone = safe_zone;
            obs.traps = traps;
            state.countdown = self.config.zone_timeout;
        } else if state.countdown == 0 {
            obs.is_dead = true;
        }

        let observation = state.observation.clone();
        self.state = Some(state);
        Ok(observation)
    }
}
