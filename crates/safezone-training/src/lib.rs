//! Training system for evolving tabular safe-zone policies.
//!
//! Policies are improved in two nested loops. The inner loop is online
//! learning: a [`Trainer`](trainer::Trainer) plays episodes with
//! epsilon-greedy exploration and keeps, per state key, the best action it
//! has seen. The outer loop is a genetic algorithm: the best policies of a
//! generation are crossed over to seed the next one.
//!
//! # How Training Works
//!
//! 1. **Population** - Start from `population_size` empty policies
//! 2. **Evaluation** - Every policy is trained for `episodes_per_agent`
//!    episodes in its own environment, concurrently
//! 3. **Fitness** - Mean per-episode reward (or score) of that training run
//! 4. **Selection** - Keep the top `elitism_fraction` of the population
//! 5. **Reproduction** - Cross over adjacent elites, refill, and repeat
//!
//! # Architecture
//!
//! ```text
//! Evolution (generation loop)
//!     ↓ evaluates through
//! Orchestrator ──dispatches──▶ Trainer × population_size
//!     ↓ fitness                    ↓ plays
//! PopulationEvolver            Environment (safezone-engine)
//!     ↓ breeds
//! next Population
//! ```
//!
//! # Modules
//!
//! - [`config`] - [`TrainingConfig`](config::TrainingConfig) and validation
//! - [`trainer`] - Single-policy epsilon-greedy training
//! - [`orchestrator`] - Concurrent evaluation behind a [`Dispatcher`](orchestrator::Dispatcher)
//! - [`genetic`] - Population, elitism and crossover
//! - [`evolution`] - The generation loop
//!
//! # Reproducibility
//!
//! Every random choice is drawn from RNGs derived from the single RNG passed
//! to [`Evolution::run`](evolution::Evolution::run). Per-member seeds are
//! drawn before work is dispatched, so a seeded run produces the same
//! champion whether it runs on threads or sequentially.

pub mod config;
pub mod error;
pub mod evolution;
pub mod genetic;
pub mod orchestrator;
pub mod trainer;
