//! Concurrent fitness evaluation.
//!
//! [`Orchestrator::evaluate`] trains every member of a population once, each
//! in its own freshly created environment with its own seeded RNG. All seeds
//! are drawn from the caller's RNG before any work is dispatched, so the
//! outcome does not depend on how the runs are scheduled.
//!
//! How the runs are executed is decided by a [`Dispatcher`]:
//!
//! - [`ScopedThreadDispatcher`] - one scoped thread per run, joined before
//!   `evaluate` returns.
//! - [`SequentialDispatcher`] - runs everything on the calling thread, in
//!   order. Useful for debugging.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    thread,
};

use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg32;
use safezone_engine::{EnvironmentFactory, WorldSeed};
use tracing::debug;

use crate::{
    error::TrainingError,
    genetic::Population,
    trainer::{Trainer, TrainingReport},
};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum DispatchError {
    #[display("worker for task {index} panicked")]
    WorkerPanicked { index: usize },
}

/// Runs a batch of independent tasks to completion.
///
/// Results are returned in task order. A panicking task is reported as
/// [`DispatchError::WorkerPanicked`] and does not affect the other tasks.
pub trait Dispatcher: fmt::Debug {
    fn dispatch<T, F>(&self, tasks: Vec<F>) -> Vec<Result<T, DispatchError>>
    where
        F: FnOnce() -> T + Send,
        T: Send;
}

/// Spawns one scoped thread per task and joins them all.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopedThreadDispatcher;

impl Dispatcher for ScopedThreadDispatcher {
    fn dispatch<T, F>(&self, tasks: Vec<F>) -> Vec<Result<T, DispatchError>>
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        thread::scope(|s| {
            let handles = tasks
                .into_iter()
                .map(|task| s.spawn(task))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .enumerate()
                .map(|(index, handle)| {
                    handle
                        .join()
                        .map_err(|_| DispatchError::WorkerPanicked { index })
                })
                .collect()
        })
    }
}

/// Runs every task on the calling thread, one after another.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialDispatcher;

impl Dispatcher for SequentialDispatcher {
    fn dispatch<T, F>(&self, tasks: Vec<F>) -> Vec<Result<T, DispatchError>>
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        tasks
            .into_iter()
            .enumerate()
            .map(|(index, task)| {
                panic::catch_unwind(AssertUnwindSafe(task))
                    .map_err(|_| DispatchError::WorkerPanicked { index })
            })
            .collect()
    }
}

/// Dispatcher chosen at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchBackend {
    #[default]
    Threads,
    Sequential,
}

impl Dispatcher for DispatchBackend {
    fn dispatch<T, F>(&self, tasks: Vec<F>) -> Vec<Result<T, DispatchError>>
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        match self {
            Self::Threads => ScopedThreadDispatcher.dispatch(tasks),
            Self::Sequential => SequentialDispatcher.dispatch(tasks),
        }
    }
}

/// Trains a whole population through a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct Orchestrator<D> {
    trainer: Trainer,
    dispatcher: D,
}

impl<D> Orchestrator<D>
where
    D: Dispatcher,
{
    #[must_use]
    pub fn new(trainer: Trainer, dispatcher: D) -> Self {
        Self {
            trainer,
            dispatcher,
        }
    }

    /// Trains every member once and records its fitness.
    ///
    /// Reports are returned in member order; the population is not sorted.
    /// If any run fails, the failure of the first failing member is returned
    /// and the fitness of the other members is unspecified.
    pub fn evaluate<F, R>(
        &self,
        population: &mut Population,
        factory: &F,
        rng: &mut R,
    ) -> Result<Vec<TrainingReport>, TrainingError>
    where
        F: EnvironmentFactory,
        R: Rng + ?Sized,
    {
        let seeds = (0..population.len())
            .map(|_| (rng.random::<WorldSeed>(), rng.random::<u64>()))
            .collect::<Vec<_>>();

        let trainer = &self.trainer;
        let tasks = population
            .members_mut()
            .iter_mut()
            .zip(seeds)
            .enumerate()
            .map(|(index, (member, (world_seed, agent_seed)))| {
                move || -> Result<TrainingReport, TrainingError> {
                    let mut env = factory.create(world_seed);
                    let mut rng = Pcg32::seed_from_u64(agent_seed);
                    let report = trainer.train(&mut member.policy, &mut env, &mut rng)?;
                    member.fitness = report.fitness;
                    debug!(
                        "member {index}: fitness {:.2}, {} keys",
                        report.fitness, report.policy_size
                    );
                    Ok(report)
                }
            })
            .collect::<Vec<_>>();

        self.dispatcher
            .dispatch(tasks)
            .into_iter()
            .map(|result| {
                result
                    .map_err(TrainingError::from)
                    .and_then(|report| report)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng as _;
    use safezone_engine::{
        Action, Environment, EnvironmentError, GridConfig, GridWorldFactory, Observation, Position,
    };

    use super::*;
    use crate::config::TrainerConfig;

    fn trainer() -> Trainer {
        Trainer::new(TrainerConfig {
            episodes_per_agent: 3,
            max_frames_per_episode: 200,
            ..TrainerConfig::default()
        })
        .unwrap()
    }

    fn factory() -> GridWorldFactory {
        GridWorldFactory::new(GridConfig {
            width: 6,
            height: 6,
            trap_count: 4,
            zone_timeout: 30,
        })
        .unwrap()
    }

    #[test]
    fn test_dispatchers_keep_task_order() {
        let tasks = (0..8).map(|i| move || i * 10).collect::<Vec<_>>();
        let threaded = ScopedThreadDispatcher.dispatch(tasks.clone());
        let sequential = SequentialDispatcher.dispatch(tasks);
        let expected: Vec<Result<i32, DispatchError>> = (0..8).map(|i| Ok(i * 10)).collect();
        assert_eq!(threaded, expected);
        assert_eq!(sequential, expected);
    }

    #[test]
    fn test_panicking_task_is_reported() {
        for backend in [DispatchBackend::Threads, DispatchBackend::Sequential] {
            let tasks: Vec<Box<dyn FnOnce() -> i32 + Send>> =
                vec![Box::new(|| 1), Box::new(|| panic!("boom")), Box::new(|| 3)];
            let results = backend.dispatch(tasks);
            let expected: Vec<Result<i32, DispatchError>> = vec![
                Ok(1),
                Err(DispatchError::WorkerPanicked { index: 1 }),
                Ok(3),
            ];
            assert_eq!(results, expected, "{backend:?}");
        }
    }

    #[test]
    fn test_evaluate_is_independent_of_backend() {
        let factory = factory();
        let run = |backend: DispatchBackend| {
            let orchestrator = Orchestrator::new(trainer(), backend);
            let mut population = Population::empty(4);
            let mut rng = Pcg32::seed_from_u64(42);
            let reports = orchestrator
                .evaluate(&mut population, &factory, &mut rng)
                .unwrap();
            (population, reports)
        };

        let (threaded, threaded_reports) = run(DispatchBackend::Threads);
        let (sequential, sequential_reports) = run(DispatchBackend::Sequential);

        assert_eq!(threaded_reports, sequential_reports);
        assert_eq!(threaded.members(), sequential.members());
        for (member, report) in threaded.members().iter().zip(&threaded_reports) {
            assert_eq!(member.fitness, report.fitness);
            assert_eq!(member.policy.len(), report.policy_size);
        }
    }

    /// Dies on the first step of every episode, or fails it with `error`.
    #[derive(Debug)]
    struct FlakyEnv {
        error: Option<EnvironmentError>,
    }

    impl Environment for FlakyEnv {
        fn reset(&mut self) -> Observation {
            Observation {
                player: Position::new(0, 0),
                traps: BTreeSet::new(),
                safe_zone: Position::new(2, 0),
                score: 0,
                is_dead: false,
            }
        }

        fn step(&mut self, _action: Action) -> Result<Observation, EnvironmentError> {
            if let Some(error) = &self.error {
                return Err(error.clone());
            }
            Ok(Observation {
                player: Position::new(0, 0),
                traps: BTreeSet::new(),
                safe_zone: Position::new(2, 0),
                score: 0,
                is_dead: true,
            })
        }
    }

    #[test]
    fn test_member_failure_is_propagated() {
        let broken = |_seed: WorldSeed| FlakyEnv {
            error: Some(EnvironmentError::EpisodeFinished),
        };
        let orchestrator = Orchestrator::new(trainer(), DispatchBackend::Threads);
        let mut population = Population::empty(3);
        let mut rng = Pcg32::seed_from_u64(7);
        let result = orchestrator.evaluate(&mut population, &broken, &mut rng);
        let expected = TrainingError::Environment(EnvironmentError::EpisodeFinished);
        assert_eq!(result, Err(expected));

        let healthy = |_seed: WorldSeed| FlakyEnv { error: None };
        let reports = orchestrator
            .evaluate(&mut population, &healthy, &mut rng)
            .unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.fitness == -100.0));
        assert!(population.members().iter().all(|m| m.fitness == -100.0));
    }

    #[test]
    fn test_first_failing_member_wins() {
        // replays the seed draws of `evaluate` to tell the members apart
        let mut rng = Pcg32::seed_from_u64(7);
        let world_seeds = (0..3)
            .map(|_| {
                let world_seed = rng.random::<WorldSeed>();
                let _agent_seed: u64 = rng.random();
                world_seed
            })
            .collect::<Vec<_>>();
        let errors = [
            None,
            Some(EnvironmentError::EpisodeFinished),
            Some(EnvironmentError::NotInitialized),
        ];
        let factory = |seed: WorldSeed| {
            let index = world_seeds.iter().position(|s| *s == seed).unwrap();
            FlakyEnv {
                error: errors[index].clone(),
            }
        };

        for backend in [DispatchBackend::Threads, DispatchBackend::Sequential] {
            let orchestrator = Orchestrator::new(trainer(), backend);
            let mut population = Population::empty(3);
            let mut rng = Pcg32::seed_from_u64(7);
            let result = orchestrator.evaluate(&mut population, &factory, &mut rng);
            let expected = TrainingError::Environment(EnvironmentError::EpisodeFinished);
            assert_eq!(result, Err(expected), "{backend:?}");
        }
    }

    #[test]
    fn test_evaluate_empty_population() {
        let orchestrator = Orchestrator::new(trainer(), SequentialDispatcher);
        let mut population = Population::from_members(vec![]);
        let mut rng = Pcg32::seed_from_u64(0);
        let reports = orchestrator
            .evaluate(&mut population, &factory(), &mut rng)
            .unwrap();
        assert!(reports.is_empty());
    }
}
