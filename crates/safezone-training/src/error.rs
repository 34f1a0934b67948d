use safezone_engine::EnvironmentError;

use crate::{config::ConfigError, genetic::EvolutionError, orchestrator::DispatchError};

/// Any failure that aborts a training run.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainingError {
    #[display("invalid training configuration: {_0}")]
    Config(ConfigError),
    #[display("environment contract violated: {_0}")]
    Environment(EnvironmentError),
    #[display("training worker failed: {_0}")]
    Dispatch(DispatchError),
    #[display("evolution failed: {_0}")]
    Evolution(EvolutionError),
}
