use std::path::PathBuf;

use crate::{schema::session_config::SessionConfig, util::Output};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct DefaultConfigArg {
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &DefaultConfigArg) -> anyhow::Result<()> {
    Output::save_json(&SessionConfig::default(), arg.output.clone())
}
