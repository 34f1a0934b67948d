//! The generation loop.
//!
//! [`Evolution::run`] drives a population through `generations` rounds of
//! evaluation and breeding:
//!
//! ```text
//! for each generation:
//!     refill to population_size (cycling the member list)
//!     evaluate every member          (Orchestrator)
//!     sort by fitness, best first
//!     report to the observer
//!     keep the leader if this generation's mean fitness is the best so far
//!     breed the next generation      (PopulationEvolver), unless this was the last one
//! ```

use rand::Rng;
use safezone_engine::EnvironmentFactory;
use safezone_stats::descriptive::DescriptiveStats;
use tracing::info;

use crate::{
    config::TrainingConfig,
    error::TrainingError,
    genetic::{EvolutionError, Member, Population, PopulationEvolver},
    orchestrator::{Dispatcher, Orchestrator},
    trainer::Trainer,
};

/// Summary of one evaluated generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// Zero-based generation index.
    pub generation: usize,
    pub fitness: DescriptiveStats,
    pub leader_fitness: f64,
    /// Number of keys in the leader's policy.
    pub leader_policy_size: usize,
    /// Number of parents the next generation is bred from.
    pub elite_count: usize,
    /// Episodes of this generation that hit the frame cap.
    pub aborted_episodes: usize,
}

/// Result of a completed [`Evolution::run`].
#[derive(Debug, Clone)]
pub struct EvolutionOutcome {
    /// Leader of the generation with the best mean fitness.
    pub champion: Member,
    pub champion_generation: usize,
    /// Leader of the last generation.
    pub final_leader: Member,
    pub generations: Vec<GenerationReport>,
}

#[derive(Debug, Clone)]
pub struct Evolution<D> {
    config: TrainingConfig,
    orchestrator: Orchestrator<D>,
    evolver: PopulationEvolver,
}

impl<D> Evolution<D>
where
    D: Dispatcher,
{
    /// Validates `config` and prepares a run.
    pub fn new(config: TrainingConfig, dispatcher: D) -> Result<Self, TrainingError> {
        config.validate()?;
        let trainer = Trainer::new(config.trainer.clone())?;
        let orchestrator = Orchestrator::new(trainer, dispatcher);
        let evolver = PopulationEvolver {
            elitism_fraction: config.elitism_fraction,
            mutation_rate: config.mutation_rate,
        };
        Ok(Self {
            config,
            orchestrator,
            evolver,
        })
    }

    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Evolves `initial` for the configured number of generations.
    ///
    /// `on_generation` is called after every evaluated generation with its
    /// report and the sorted population.
    pub fn run<F, R, O>(
        &self,
        initial: Population,
        factory: &F,
        rng: &mut R,
        mut on_generation: O,
    ) -> Result<EvolutionOutcome, TrainingError>
    where
        F: EnvironmentFactory,
        R: Rng + ?Sized,
        O: FnMut(&GenerationReport, &Population),
    {
        let generations = self.config.generations;
        let mut population = initial;
        let mut reports = Vec::with_capacity(generations);
        let mut champion: Option<(Member, usize, f64)> = None;

        for generation in 0..generations {
            population = population.refilled(self.config.population_size);
            let training_reports = self.orchestrator.evaluate(&mut population, factory, rng)?;
            population.sort_by_fitness();

            let (Some(fitness), Some(leader)) = (population.fitness_stats(), population.leader())
            else {
                return Err(EvolutionError::EmptyPopulation.into());
            };
            let report = GenerationReport {
                generation,
                fitness,
                leader_fitness: leader.fitness,
                leader_policy_size: leader.policy.len(),
                elite_count: self.evolver.elite_count(population.len()),
                aborted_episodes: training_reports.iter().map(|r| r.aborted_episodes()).sum(),
            };
            info!(
                "generation {}/{generations}: mean {:.2}, best {:.2}, leader knows {} keys",
                generation + 1,
                report.fitness.mean,
                report.leader_fitness,
                report.leader_policy_size
            );
            on_generation(&report, &population);

            if champion
                .as_ref()
                .is_none_or(|(_, _, best_mean)| report.fitness.mean >= *best_mean)
            {
                champion = Some((leader.clone(), generation, report.fitness.mean));
            }
            reports.push(report);

            if generation + 1 < generations {
                population = self.evolver.evolve(&population, rng)?;
            }
        }

        let (Some((champion, champion_generation, _)), Some(final_leader)) =
            (champion, population.leader().cloned())
        else {
            return Err(EvolutionError::EmptyPopulation.into());
        };
        Ok(EvolutionOutcome {
            champion,
            champion_generation,
            final_leader,
            generations: reports,
        })
    }
}
