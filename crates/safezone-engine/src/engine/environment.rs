use crate::core::{Action, Observation};

use super::world_seed::WorldSeed;

/// Errors raised by an [`Environment`] when its contract is violated.
///
/// These are precondition violations: the caller drove the environment in a
/// way it does not support, and the current run must be aborted.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum EnvironmentError {
    #[display("environment stepped before reset()")]
    NotInitialized,
    #[display("environment stepped after the episode ended")]
    EpisodeFinished,
}

/// The contract between the learning core and a game simulation.
///
/// The core only ever sees [`Observation`]s; how the world produces them is
/// up to the implementation.
pub trait Environment {
    /// Starts a new episode and returns its initial observation.
    ///
    /// Must be callable any number of times.
    fn reset(&mut self) -> Observation;

    /// Advances the simulation by one tick under `action`.
    fn step(&mut self, action: Action) -> Result<Observation, EnvironmentError>;

    /// Draws the current state. Headless environments leave this a no-op.
    fn render(&mut self) {}

    /// Releases resources held by the environment. Called once a run is over.
    fn close(&mut self) {}
}

/// Builds a fresh, independent environment for every training run.
///
/// Factories are shared by concurrent runs, so creation must not fail and
/// must not hand out shared state. Any `Fn(WorldSeed) -> E` closure is a
/// factory.
pub trait EnvironmentFactory: Sync {
    type Environment: Environment;

    fn create(&self, seed: WorldSeed) -> Self::Environment;
}

impl<F, E> EnvironmentFactory for F
where
    F: Fn(WorldSeed) -> E + Sync,
    E: Environment,
{
    type Environment = E;

    fn create(&self, seed: WorldSeed) -> E {
        self(seed)
    }
}
