//! Training configuration.
//!
//! [`TrainingConfig`] is the whole configuration surface of a run. It
//! deserializes from a flat JSON object in which every field is optional:
//!
//! ```json
//! {
//!   "population_size": 30,
//!   "generations": 5,
//!   "elitism_fraction": 0.1,
//!   "mutation_rate": 0.2,
//!   "episodes_per_agent": 100,
//!   "epsilon": { "start": 0.8, "decay": 0.995, "min": 0.01 },
//!   "decision_period": 4,
//!   "max_frames_per_episode": 10000,
//!   "fitness_basis": "cumulative-reward",
//!   "reward": { "death_penalty": -100.0, "approach_bonus": 2.0, "retreat_penalty": 0.0, "score_bonus": 5.0 }
//! }
//! ```
//!
//! Call [`TrainingConfig::validate`] before starting a run; the training
//! loop assumes validated values.

use safezone_agent::reward::RewardModel;
use serde::{Deserialize, Serialize};

/// Exploration schedule for epsilon-greedy action selection.
///
/// After every decision, `epsilon = max(min, epsilon * decay)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EpsilonSchedule {
    pub start: f64,
    pub decay: f64,
    pub min: f64,
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        Self {
            start: 0.8,
            decay: 0.995,
            min: 0.01,
        }
    }
}

impl EpsilonSchedule {
    /// A schedule that keeps epsilon at `epsilon` forever.
    #[must_use]
    pub const fn fixed(epsilon: f64) -> Self {
        Self {
            start: epsilon,
            decay: 1.0,
            min: epsilon,
        }
    }
}

/// What a member's fitness is averaged from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, derive_more::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum FitnessBasis {
    /// Sum of all rewards earned during the episode.
    #[default]
    #[display("cumulative reward")]
    CumulativeReward,
    /// Score reported by the environment when the episode ended.
    #[display("final score")]
    FinalScore,
}

/// Settings for a single agent's training run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Episodes played per fitness evaluation.
    pub episodes_per_agent: usize,
    pub epsilon: EpsilonSchedule,
    /// Simulation ticks per decision. Ticks in between hold
    /// [`Action::NOOP`](safezone_engine::Action::NOOP).
    pub decision_period: usize,
    /// Ticks after which an episode is aborted.
    pub max_frames_per_episode: usize,
    pub fitness_basis: FitnessBasis,
    pub reward: RewardModel,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            episodes_per_agent: 100,
            epsilon: EpsilonSchedule::default(),
            decision_period: 4,
            max_frames_per_episode: 10_000,
            fitness_basis: FitnessBasis::default(),
            reward: RewardModel::default(),
        }
    }
}

/// Settings for a whole evolutionary run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Members trained per generation.
    pub population_size: usize,
    pub generations: usize,
    /// Fraction of each generation kept as parents, in `(0, 1]`.
    pub elitism_fraction: f64,
    /// Probability that a child takes the second parent's entry for a shared key.
    pub mutation_rate: f64,
    #[serde(flatten)]
    pub trainer: TrainerConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            population_size: 30,
            generations: 5,
            elitism_fraction: 0.1,
            mutation_rate: 0.2,
            trainer: TrainerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("episodes_per_agent must be positive")]
    NoEpisodes,
    #[display("decision_period must be positive")]
    ZeroDecisionPeriod,
    #[display("max_frames_per_episode must be positive")]
    ZeroFrameCap,
    #[display("epsilon.{field} must be in [0, 1], got {value}")]
    EpsilonOutOfRange { field: &'static str, value: f64 },
    #[display("epsilon.min ({min}) must not exceed epsilon.start ({start})")]
    EpsilonMinAboveStart { min: f64, start: f64 },
    #[display("generations must be positive")]
    NoGenerations,
    #[display("elitism_fraction must be in (0, 1], got {_0}")]
    ElitismOutOfRange(#[error(not(source))] f64),
    #[display("mutation_rate must be in [0, 1], got {_0}")]
    MutationRateOutOfRange(#[error(not(source))] f64),
    #[display(
        "population of {population_size} with elitism {elitism_fraction} keeps {elites} elites, at least 2 are needed"
    )]
    TooFewElites {
        population_size: usize,
        elitism_fraction: f64,
        elites: usize,
    },
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.episodes_per_agent == 0 {
            return Err(ConfigError::NoEpisodes);
        }
        if self.decision_period == 0 {
            return Err(ConfigError::ZeroDecisionPeriod);
        }
        if self.max_frames_per_episode == 0 {
            return Err(ConfigError::ZeroFrameCap);
        }
        let EpsilonSchedule { start, decay, min } = self.epsilon;
        for (field, value) in [("start", start), ("decay", decay), ("min", min)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::EpsilonOutOfRange { field, value });
            }
        }
        if min > start {
            return Err(ConfigError::EpsilonMinAboveStart { min, start });
        }
        Ok(())
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trainer.validate()?;
        if self.generations == 0 {
            return Err(ConfigError::NoGenerations);
        }
        if !(self.elitism_fraction > 0.0 && self.elitism_fraction <= 1.0) {
            return Err(ConfigError::ElitismOutOfRange(self.elitism_fraction));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ConfigError::MutationRateOutOfRange(self.mutation_rate));
        }
        let elites = elite_count(self.elitism_fraction, self.population_size);
        if elites < 2 {
            return Err(ConfigError::TooFewElites {
                population_size: self.population_size,
                elitism_fraction: self.elitism_fraction,
                elites,
            });
        }
        Ok(())
    }
}

/// Number of elites kept from a population of `len` members: `floor(fraction × len)`.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
#[must_use]
pub fn elite_count(elitism_fraction: f64, len: usize) -> usize {
    (elitism_fraction * len as f64).floor() as usize
}
