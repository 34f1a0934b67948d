use clap::{Parser, Subcommand};

use self::{default_config::DefaultConfigArg, play::PlayArg, train::TrainArg};

mod default_config;
mod play;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Evolve a policy with the genetic algorithm
    Train(#[clap(flatten)] TrainArg),
    /// Replay a trained policy greedily
    Play(#[clap(flatten)] PlayArg),
    /// Print the default session configuration as JSON
    DefaultConfig(#[clap(flatten)] DefaultConfigArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Play(arg) => play::run(&arg)?,
        Mode::DefaultConfig(arg) => default_config::run(&arg)?,
    }
    Ok(())
}
