use safezone_engine::GridConfig;
use safezone_training::config::TrainingConfig;
use serde::{Deserialize, Serialize};

/// Everything a `train` run reads from its configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub training: TrainingConfig,
    pub world: GridConfig,
}
