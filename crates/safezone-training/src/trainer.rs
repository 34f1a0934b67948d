//! Epsilon-greedy training of a single policy.
//!
//! A [`Trainer`] plays `episodes_per_agent` episodes in one environment and
//! writes what it observes into the policy it was given. Actions are only
//! chosen every `decision_period` ticks; the ticks in between hold
//! [`Action::NOOP`] and their rewards are credited to the last decision:
//!
//! ```text
//! frame:    0        1      2      3      4        5  ...
//!           decide   hold   hold   hold   decide   hold
//!           └─ credit(key₀, action₀) ───┘ └─ credit(key₄, action₄) ...
//! ```
//!
//! Every credit update goes through [`Policy::update`], so a decision only
//! replaces the stored action when its accumulated reward beats the stored
//! value.
//!
//! Episodes end when the observation is terminal or when the frame cap is
//! reached. A capped episode is reported as aborted but still counts toward
//! fitness.

use rand::Rng;
use safezone_agent::{policy::Policy, state_key::StateKey};
use safezone_engine::{Action, Environment, EnvironmentError};
use safezone_stats::descriptive::DescriptiveStats;
use tracing::{debug, warn};

use crate::{
    config::{ConfigError, EpsilonSchedule, FitnessBasis, TrainerConfig},
    error::TrainingError,
};

/// Exploration state of a running trainer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonGreedy {
    epsilon: f64,
    schedule: EpsilonSchedule,
}

impl EpsilonGreedy {
    #[must_use]
    pub fn new(schedule: EpsilonSchedule) -> Self {
        Self {
            epsilon: schedule.start,
            schedule,
        }
    }

    /// Exploration that never decays. `fixed(0.0)` always exploits.
    #[must_use]
    pub fn fixed(epsilon: f64) -> Self {
        Self::new(EpsilonSchedule::fixed(epsilon))
    }

    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Returns `true` with probability epsilon.
    pub fn explore<R>(&self, rng: &mut R) -> bool
    where
        R: Rng + ?Sized,
    {
        rng.random_bool(self.epsilon.clamp(0.0, 1.0))
    }

    pub fn decay(&mut self) {
        self.epsilon = (self.epsilon * self.schedule.decay).max(self.schedule.min);
    }
}

/// Outcome of a single episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeSummary {
    /// Sum of the rewards of every tick.
    pub reward: f64,
    /// Score of the last observation.
    pub score: u32,
    pub frames: usize,
    /// The episode hit the frame cap before reaching a terminal observation.
    pub aborted: bool,
}

impl EpisodeSummary {
    #[must_use]
    pub fn fitness(&self, basis: FitnessBasis) -> f64 {
        match basis {
            FitnessBasis::CumulativeReward => self.reward,
            FitnessBasis::FinalScore => f64::from(self.score),
        }
    }
}

/// Outcome of one [`Trainer::train`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// Mean per-episode fitness under the configured [`FitnessBasis`].
    pub fitness: f64,
    pub episodes: Vec<EpisodeSummary>,
    pub final_epsilon: f64,
    /// Number of keys stored in the policy after training.
    pub policy_size: usize,
}

impl TrainingReport {
    #[must_use]
    pub fn aborted_episodes(&self) -> usize {
        self.episodes.iter().filter(|e| e.aborted).count()
    }
}

/// The last decision, collecting the rewards of the ticks that follow it.
#[derive(Debug, Clone, Copy)]
struct PendingCredit {
    key: StateKey,
    action: Action,
    accumulated: f64,
}

#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    /// Validates `config` and builds a trainer from it.
    pub fn new(config: TrainerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Trains `policy` in `env` with a fresh exploration schedule.
    ///
    /// Epsilon starts over at `epsilon.start` on every call. The environment
    /// is closed afterwards, also when an episode fails.
    pub fn train<E, R>(
        &self,
        policy: &mut Policy,
        env: &mut E,
        rng: &mut R,
    ) -> Result<TrainingReport, TrainingError>
    where
        E: Environment + ?Sized,
        R: Rng + ?Sized,
    {
        self.train_with(policy, env, rng, EpsilonGreedy::new(self.config.epsilon))
    }

    /// Like [`Self::train`], but with caller-provided exploration.
    pub fn train_with<E, R>(
        &self,
        policy: &mut Policy,
        env: &mut E,
        rng: &mut R,
        mut exploration: EpsilonGreedy,
    ) -> Result<TrainingReport, TrainingError>
    where
        E: Environment + ?Sized,
        R: Rng + ?Sized,
    {
        let episodes = self.play_episodes(policy, env, rng, &mut exploration);
        env.close();
        let episodes = episodes?;

        let basis = self.config.fitness_basis;
        let fitness = DescriptiveStats::new(episodes.iter().map(|e| e.fitness(basis)))
            .map_or(0.0, |stats| stats.mean);
        Ok(TrainingReport {
            fitness,
            episodes,
            final_epsilon: exploration.epsilon(),
            policy_size: policy.len(),
        })
    }

    fn play_episodes<E, R>(
        &self,
        policy: &mut Policy,
        env: &mut E,
        rng: &mut R,
        exploration: &mut EpsilonGreedy,
    ) -> Result<Vec<EpisodeSummary>, EnvironmentError>
    where
        E: Environment + ?Sized,
        R: Rng + ?Sized,
    {
        (0..self.config.episodes_per_agent)
            .map(|episode| {
                let summary = self.play_episode(policy, env, rng, exploration)?;
                debug!(
                    "episode {episode}: reward {:.1}, score {}, {} frames",
                    summary.reward, summary.score, summary.frames
                );
                Ok(summary)
            })
            .collect()
    }

    fn play_episode<E, R>(
        &self,
        policy: &mut Policy,
        env: &mut E,
        rng: &mut R,
        exploration: &mut EpsilonGreedy,
    ) -> Result<EpisodeSummary, EnvironmentError>
    where
        E: Environment + ?Sized,
        R: Rng + ?Sized,
    {
        let TrainerConfig {
            decision_period,
            max_frames_per_episode,
            ref reward,
            ..
        } = self.config;

        let mut observation = env.reset();
        let mut pending: Option<PendingCredit> = None;
        let mut total_reward = 0.0;
        let mut frames = 0;

        while !observation.is_dead {
            if frames >= max_frames_per_episode {
                warn!(
                    "episode aborted after {frames} frames (score {})",
                    observation.score
                );
                return Ok(EpisodeSummary {
                    reward: total_reward,
                    score: observation.score,
                    frames,
                    aborted: true,
                });
            }

            let (next, step_reward) = if frames % decision_period == 0 {
                let key = StateKey::encode(&observation);
                let action = if exploration.explore(rng) {
                    rng.random()
                } else {
                    policy.lookup(&key, rng).action
                };
                let next = env.step(action)?;
                let step_reward = reward.reward(&observation, &next, action);
                policy.update(key, action, step_reward);
                pending = Some(PendingCredit {
                    key,
                    action,
                    accumulated: step_reward,
                });
                exploration.decay();
                (next, step_reward)
            } else {
                let next = env.step(Action::NOOP)?;
                let step_reward = reward.reward(&observation, &next, Action::NOOP);
                if let Some(credit) = &mut pending {
                    credit.accumulated += step_reward;
                    policy.update(credit.key, credit.action, credit.accumulated);
                }
                (next, step_reward)
            };

            total_reward += step_reward;
            observation = next;
            frames += 1;
        }

        Ok(EpisodeSummary {
            reward: total_reward,
            score: observation.score,
            frames,
            aborted: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;
    use safezone_agent::{policy::PolicyEntry, state_key::SafeZoneBearing};
    use safezone_engine::{
        Direction, EnvironmentFactory as _, GridConfig, GridWorldFactory, Observation, Position,
        WorldSeed,
    };

    use super::*;

    /// Never terminates. Holding still scores a point; moving does nothing.
    #[derive(Debug, Default)]
    struct ScriptedEnv {
        observation: Option<Observation>,
        actions: Vec<Action>,
        closed: bool,
    }

    impl Environment for ScriptedEnv {
        fn reset(&mut self) -> Observation {
            let observation = Observation {
                player: Position::new(0, 0),
                traps: BTreeSet::new(),
                safe_zone: Position::new(3, 3),
                score: 0,
                is_dead: false,
            };
            self.observation = Some(observation.clone());
            observation
        }

        fn step(&mut self, action: Action) -> Result<Observation, EnvironmentError> {
            let observation = self
                .observation
                .as_mut()
                .ok_or(EnvironmentError::NotInitialized)?;
            self.actions.push(action);
            if action == Action::NOOP {
                observation.score += 1;
            }
            Ok(observation.clone())
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    /// Fails every step.
    #[derive(Debug, Default)]
    struct BrokenEnv {
        closed: bool,
    }

    impl Environment for BrokenEnv {
        fn reset(&mut self) -> Observation {
            Observation {
                player: Position::new(0, 0),
                traps: BTreeSet::new(),
                safe_zone: Position::new(1, 0),
                score: 0,
                is_dead: false,
            }
        }

        fn step(&mut self, _action: Action) -> Result<Observation, EnvironmentError> {
            Err(EnvironmentError::NotInitialized)
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn config(episodes: usize, decision_period: usize, max_frames: usize) -> TrainerConfig {
        TrainerConfig {
            episodes_per_agent: episodes,
            decision_period,
            max_frames_per_episode: max_frames,
            ..TrainerConfig::default()
        }
    }

    #[test]
    fn test_epsilon_decays_to_floor() {
        let mut exploration = EpsilonGreedy::new(EpsilonSchedule {
            start: 1.0,
            decay: 0.5,
            min: 0.2,
        });
        exploration.decay();
        assert_eq!(exploration.epsilon(), 0.5);
        exploration.decay();
        assert_eq!(exploration.epsilon(), 0.25);
        exploration.decay();
        assert_eq!(exploration.epsilon(), 0.2);

        let mut fixed = EpsilonGreedy::fixed(0.3);
        fixed.decay();
        assert_eq!(fixed.epsilon(), 0.3);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = Trainer::new(config(1, 0, 10));
        assert!(matches!(result, Err(ConfigError::ZeroDecisionPeriod)));
        let result = Trainer::new(config(0, 1, 10));
        assert!(matches!(result, Err(ConfigError::NoEpisodes)));
    }

    #[test]
    fn test_frame_cap_aborts_episode() {
        let trainer = Trainer::new(config(2, 3, 10)).unwrap();
        let mut env = ScriptedEnv::default();
        let mut policy = Policy::new();
        let mut rng = Pcg32::seed_from_u64(0);

        let report = trainer.train(&mut policy, &mut env, &mut rng).unwrap();

        assert_eq!(report.episodes.len(), 2);
        assert_eq!(report.aborted_episodes(), 2);
        for episode in &report.episodes {
            assert_eq!(episode.frames, 10);
            assert!(episode.aborted);
        }
        assert_eq!(env.actions.len(), 20);
        assert!(env.closed);
    }

    #[test]
    fn test_decisions_only_on_period_boundaries() {
        let trainer = Trainer::new(config(1, 3, 10)).unwrap();
        let mut env = ScriptedEnv::default();
        let mut policy = Policy::new();
        let mut rng = Pcg32::seed_from_u64(1);

        trainer.train(&mut policy, &mut env, &mut rng).unwrap();

        for (frame, action) in env.actions.iter().enumerate() {
            if frame % 3 == 0 {
                assert!(action.interact, "frame {frame} should decide");
            } else {
                assert_eq!(*action, Action::NOOP, "frame {frame} should hold");
            }
        }
    }

    #[test]
    fn test_hold_rewards_are_credited_to_last_decision() {
        let trainer = Trainer::new(config(1, 2, 2)).unwrap();
        let mut env = ScriptedEnv::default();
        let mut policy = Policy::new();
        let mut rng = Pcg32::seed_from_u64(2);

        let report = trainer
            .train_with(&mut policy, &mut env, &mut rng, EpsilonGreedy::fixed(0.0))
            .unwrap();

        // decision: no progress (0), hold: score bonus (5)
        let key = StateKey::encode(&env.reset());
        let entry = policy.get(&key).unwrap();
        assert_eq!(entry.value, 5.0);
        assert_eq!(entry.action, env.actions[0]);
        assert_eq!(report.episodes[0].reward, 5.0);
        assert_eq!(report.episodes[0].score, 1);
    }

    #[test]
    fn test_epsilon_restarts_on_every_call() {
        let mut config = config(1, 1, 3);
        config.epsilon = EpsilonSchedule {
            start: 1.0,
            decay: 0.5,
            min: 0.0,
        };
        let trainer = Trainer::new(config).unwrap();
        let mut policy = Policy::new();
        let mut rng = Pcg32::seed_from_u64(3);

        let first = trainer
            .train(&mut policy, &mut ScriptedEnv::default(), &mut rng)
            .unwrap();
        let second = trainer
            .train(&mut policy, &mut ScriptedEnv::default(), &mut rng)
            .unwrap();
        assert_eq!(first.final_epsilon, 0.125);
        assert_eq!(second.final_epsilon, 0.125);
    }

    #[test]
    fn test_final_score_fitness_basis() {
        let mut config = config(2, 2, 4);
        config.fitness_basis = FitnessBasis::FinalScore;
        let trainer = Trainer::new(config).unwrap();
        let mut rng = Pcg32::seed_from_u64(4);

        let report = trainer
            .train(&mut Policy::new(), &mut ScriptedEnv::default(), &mut rng)
            .unwrap();
        // two holds per episode
        assert_eq!(report.fitness, 2.0);
    }

    #[test]
    fn test_environment_errors_propagate() {
        let trainer = Trainer::new(config(3, 4, 100)).unwrap();
        let mut env = BrokenEnv::default();
        let mut rng = Pcg32::seed_from_u64(5);

        let result = trainer.train(&mut Policy::new(), &mut env, &mut rng);
        assert_eq!(
            result,
            Err(TrainingError::Environment(EnvironmentError::NotInitialized))
        );
        assert!(env.closed);
    }

    /// Heads for the safe zone, vertical first, avoiding visible traps.
    fn heuristic_policy() -> Policy {
        let moves = [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ];
        let mut entries = vec![];
        for bits in 0..1_u8 << Direction::LEN {
            let traps = std::array::from_fn(|i| bits & (1 << i) != 0);
            for bearing in SafeZoneBearing::ALL {
                let key = StateKey::new(traps, bearing);
                let preferred: &[Direction] = match bearing {
                    SafeZoneBearing::Here => &[Direction::None],
                    SafeZoneBearing::Up => &[Direction::Up],
                    SafeZoneBearing::Down => &[Direction::Down],
                    SafeZoneBearing::Left => &[Direction::Left],
                    SafeZoneBearing::Right => &[Direction::Right],
                    SafeZoneBearing::UpLeft => &[Direction::Up, Direction::Left],
                    SafeZoneBearing::UpRight => &[Direction::Up, Direction::Right],
                    SafeZoneBearing::DownLeft => &[Direction::Down, Direction::Left],
                    SafeZoneBearing::DownRight => &[Direction::Down, Direction::Right],
                };
                let direction = preferred
                    .iter()
                    .chain(&moves)
                    .copied()
                    .find(|&d| !key.is_trap(d))
                    .unwrap_or(Direction::None);
                entries.push((
                    key,
                    PolicyEntry {
                        action: Action::decision(direction),
                        value: 1000.0,
                    },
                ));
            }
        }
        Policy::from_entries(entries)
    }

    #[test]
    fn test_exploiting_a_good_policy_beats_random_play() {
        let factory = GridWorldFactory::new(GridConfig {
            width: 6,
            height: 6,
            trap_count: 4,
            zone_timeout: 40,
        })
        .unwrap();
        let trainer = Trainer::new(config(10, 2, 400)).unwrap();
        let policy = heuristic_policy();
        assert_eq!(policy.len(), StateKey::SPACE_SIZE);

        let mut greedy = 0.0;
        let mut random = 0.0;
        for seed in 0..5_u8 {
            let world_seed = WorldSeed::from_bytes([seed; 16]);
            let mut rng = Pcg32::seed_from_u64(u64::from(seed));

            greedy += trainer
                .train_with(
                    &mut policy.clone(),
                    &mut factory.create(world_seed),
                    &mut rng,
                    EpsilonGreedy::fixed(0.0),
                )
                .unwrap()
                .fitness;
            random += trainer
                .train_with(
                    &mut policy.clone(),
                    &mut factory.create(world_seed),
                    &mut rng,
                    EpsilonGreedy::fixed(1.0),
                )
                .unwrap()
                .fitness;
        }
        assert!(
            greedy >= random,
            "greedy {greedy} should not lose to random {random}"
        );
    }
}
