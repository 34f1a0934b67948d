use std::path::PathBuf;

use anyhow::Context as _;
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use safezone_engine::GridWorldFactory;
use safezone_training::{
    config::TrainingConfig,
    evolution::{Evolution, GenerationReport},
    genetic::Population,
    orchestrator::DispatchBackend,
};
use tracing::info;

use crate::{
    schema::{policy_model::PolicyModel, session_config::SessionConfig},
    util::{self, Output},
};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum DispatchMode {
    #[default]
    Threads,
    Sequential,
}

impl From<DispatchMode> for DispatchBackend {
    fn from(mode: DispatchMode) -> Self {
        match mode {
            DispatchMode::Threads => DispatchBackend::Threads,
            DispatchMode::Sequential => DispatchBackend::Sequential,
        }
    }
}

/// Number of members listed per generation.
const SHOWN_MEMBERS: usize = 5;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Session configuration file (see `default-config`)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Members per generation
    #[arg(long)]
    population: Option<usize>,
    #[arg(long)]
    generations: Option<usize>,
    /// Training episodes per member and generation
    #[arg(long)]
    episodes: Option<usize>,
    /// Fraction of each generation kept as parents
    #[arg(long)]
    elitism: Option<f64>,
    /// Probability that a child takes the second parent's action for a shared key
    #[arg(long)]
    mutation_rate: Option<f64>,
    /// Seed of the whole run; random when omitted
    #[arg(long)]
    seed: Option<u64>,
    /// How members are trained: threads or sequential
    #[arg(long, default_value = "threads")]
    dispatch: DispatchMode,
    /// Name stored in the saved model
    #[arg(long, default_value = "champion")]
    name: String,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

impl TrainArg {
    fn apply_overrides(&self, config: &mut TrainingConfig) {
        if let Some(population) = self.population {
            config.population_size = population;
        }
        if let Some(generations) = self.generations {
            config.generations = generations;
        }
        if let Some(episodes) = self.episodes {
            config.trainer.episodes_per_agent = episodes;
        }
        if let Some(elitism) = self.elitism {
            config.elitism_fraction = elitism;
        }
        if let Some(mutation_rate) = self.mutation_rate {
            config.mutation_rate = mutation_rate;
        }
    }
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let mut session = match &arg.config {
        Some(path) => util::read_session_config_file(path)?,
        None => SessionConfig::default(),
    };
    arg.apply_overrides(&mut session.training);
    let SessionConfig { training, world } = session;

    let factory = GridWorldFactory::new(world.clone()).context("Invalid world configuration")?;
    let population_size = training.population_size;
    let generations = training.generations;
    let evolution = Evolution::new(training, DispatchBackend::from(arg.dispatch))
        .context("Invalid training configuration")?;

    let seed = arg.seed.unwrap_or_else(|| rand::rng().random());
    info!("training with seed {seed}");
    let mut rng = Pcg32::seed_from_u64(seed);

    let outcome = evolution.run(
        Population::empty(population_size),
        &factory,
        &mut rng,
        print_generation,
    )?;

    eprintln!(
        "Champion from generation #{}: fitness {:.3}, {} keys",
        outcome.champion_generation,
        outcome.champion.fitness,
        outcome.champion.policy.len()
    );
    eprintln!(
        "Final leader: fitness {:.3}, {} keys",
        outcome.final_leader.fitness,
        outcome.final_leader.policy.len()
    );

    let model = PolicyModel::from_policy(
        &arg.name,
        &outcome.champion.policy,
        outcome.champion.fitness,
        generations,
        world,
    );
    Output::save_json(&model, arg.output.clone())?;

    eprintln!();
    eprintln!("Model saved successfully");
    if let Some(path) = &arg.output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Name: {}", model.name);
    eprintln!("  Trained at: {}", model.trained_at);
    eprintln!("  Final fitness: {:.3}", model.final_fitness);
    eprintln!("  Actions: {} keys", model.actions.len());

    Ok(())
}

fn print_generation(report: &GenerationReport, population: &Population) {
    eprintln!("Generation #{}:", report.generation);

    eprintln!("  Members:");
    for (i, member) in population.members().iter().take(SHOWN_MEMBERS).enumerate() {
        eprintln!(
            "  {i:2}: {:4} keys => {:.3}",
            member.policy.len(),
            member.fitness
        );
    }

    let stats = &report.fitness;
    eprintln!("  Fitness Stats:");
    eprintln!("    Min:    {:.3}", stats.min);
    eprintln!("    Max:    {:.3}", stats.max);
    eprintln!("    Mean:   {:.3}", stats.mean);
    eprintln!("    Median: {:.3}", stats.median);
    eprintln!("    Stddev: {:.3}", stats.std_dev);
    eprintln!("  Elites: {}", report.elite_count);
    if report.aborted_episodes > 0 {
        eprintln!("  Aborted episodes: {}", report.aborted_episodes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let arg = TrainArg {
            population: Some(12),
            episodes: Some(7),
            mutation_rate: Some(0.5),
            ..TrainArg::default()
        };
        let mut config = TrainingConfig::default();
        arg.apply_overrides(&mut config);
        assert_eq!(config.population_size, 12);
        assert_eq!(config.trainer.episodes_per_agent, 7);
        assert_eq!(config.mutation_rate, 0.5);
        assert_eq!(config.generations, TrainingConfig::default().generations);
    }

    #[test]
    fn test_dispatch_mode_parses_case_insensitively() {
        assert_eq!(
            "threads".parse::<DispatchMode>().ok(),
            Some(DispatchMode::Threads)
        );
        assert_eq!(
            "Sequential".parse::<DispatchMode>().ok(),
            Some(DispatchMode::Sequential)
        );
        assert!("fork".parse::<DispatchMode>().is_err());
    }
}
