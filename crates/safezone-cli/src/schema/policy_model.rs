use std::collections::BTreeMap;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use safezone_agent::{
    policy::{Policy, PolicyEntry},
    state_key::StateKey,
};
use safezone_engine::{Action, GridConfig};
use serde::{Deserialize, Serialize};

/// A trained policy as saved to disk.
///
/// Only the chosen action is kept for every key. A loaded policy therefore
/// starts with unseen values, and the first reward observed for a key
/// replaces its value without changing its action.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyModel {
    pub name: String,
    pub trained_at: DateTime<Utc>,
    pub final_fitness: f64,
    pub generations: usize,
    /// World the policy was trained in.
    #[serde(default)]
    pub world: GridConfig,
    /// Keys in their text form, e.g. `"UF DF LT RF NF WXRU"`.
    pub actions: BTreeMap<String, Action>,
}

impl PolicyModel {
    pub(crate) fn from_policy(
        name: &str,
        policy: &Policy,
        final_fitness: f64,
        generations: usize,
        world: GridConfig,
    ) -> Self {
        Self {
            name: name.to_owned(),
            trained_at: Utc::now(),
            final_fitness,
            generations,
            world,
            actions: policy
                .iter()
                .map(|(key, entry)| (key.to_string(), entry.action))
                .collect(),
        }
    }

    pub(crate) fn to_policy(&self) -> anyhow::Result<Policy> {
        let entries = self
            .actions
            .iter()
            .map(|(key, action)| {
                let key = key
                    .parse::<StateKey>()
                    .with_context(|| format!("Invalid state key in model {}", self.name))?;
                Ok((key, PolicyEntry::unseen(*action)))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Policy::from_entries(entries))
    }
}
