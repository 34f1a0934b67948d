//! Environment contract and the reference grid world.
//!
//! - [`Environment`] - What the learning core needs from a game simulation
//! - [`EnvironmentFactory`] - Builds one independent environment per training run
//! - [`GridWorld`] - A small seeded grid world implementing the contract
//! - [`WorldSeed`] - Seed for reproducible world generation
//!
//! # Episode Flow
//!
//! 1. [`Environment::reset`] returns the initial [`Observation`](crate::Observation)
//! 2. The agent calls [`Environment::step`] once per simulation tick
//! 3. The episode ends when an observation reports `is_dead`
//! 4. [`Environment::close`] is called once no more episodes will be played

pub use self::{environment::*, grid_world::*, world_seed::*};

mod environment;
mod grid_world;
mod world_seed;
