use std::path::PathBuf;

use anyhow::Context as _;
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use safezone_engine::{EnvironmentFactory as _, GridWorldFactory, WorldSeed};
use safezone_training::trainer::{EpsilonGreedy, Trainer};
use tracing::info;

use crate::{
    schema::session_config::SessionConfig,
    util::{self, read_policy_model_file},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PlayArg {
    /// Trained model file
    #[arg(long)]
    model: PathBuf,
    /// Session configuration file supplying reward and frame settings
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 10)]
    episodes: usize,
    /// Seed of the world and of tie-breaking for unknown keys
    #[arg(long)]
    seed: Option<u64>,
}

pub(crate) fn run(arg: &PlayArg) -> anyhow::Result<()> {
    let model = read_policy_model_file(&arg.model)?;
    let mut policy = model.to_policy()?;
    let known_keys = policy.len();

    let session = match &arg.config {
        Some(path) => util::read_session_config_file(path)?,
        None => SessionConfig::default(),
    };
    let mut trainer_config = session.training.trainer;
    trainer_config.episodes_per_agent = arg.episodes;
    let trainer = Trainer::new(trainer_config).context("Invalid trainer configuration")?;

    let world = model.world.clone();
    let factory = GridWorldFactory::new(world).context("Invalid world configuration in model")?;

    let seed = arg.seed.unwrap_or_else(|| rand::rng().random());
    info!("playing {} with seed {seed}", model.name);
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut env = factory.create(rng.random::<WorldSeed>());

    let report = trainer.train_with(&mut policy, &mut env, &mut rng, EpsilonGreedy::fixed(0.0))?;

    eprintln!("Model: {} ({} keys)", model.name, known_keys);
    for (i, episode) in report.episodes.iter().enumerate() {
        let marker = if episode.aborted { " (aborted)" } else { "" };
        eprintln!(
            "  {i:3}: reward {:8.1}, score {:3}, {:5} frames{marker}",
            episode.reward, episode.score, episode.frames
        );
    }
    eprintln!("Fitness: {:.3}", report.fitness);
    if report.policy_size > known_keys {
        eprintln!(
            "Visited {} keys the model did not know",
            report.policy_size - known_keys
        );
    }

    Ok(())
}
