use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::agent::QAgent;
use crate::config::EnvConfig;
use crate::error::{Result, TrainingError};
use crate::indexer::{StateIndexer, StateRecord};
use crate::policy::{ActionValues, QTable};

/// Q-table together with the state mapping its indices refer to.
/// Either half is meaningless without the other, and both only describe
/// states built with the same windows and costs, so `env` travels along.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    #[serde(default)]
    pub env: EnvConfig,
    pub states: Vec<StateRecord>,
    pub q_values: BTreeMap<usize, ActionValues>,
    pub epsilon: f64,
}

impl ModelSnapshot {
    pub fn capture(agent: &QAgent, indexer: &StateIndexer, env: &EnvConfig) -> Self {
        Self {
            env: env.clone(),
            states: indexer.to_records(),
            q_values: agent.q_table().clone().into_inner(),
            epsilon: agent.eps,
        }
    }

    /// Rebuild the indexer and table.
    ///
    /// # Errors
    /// `Snapshot` on duplicate states or indices, non-finite values, or a
    /// table row whose index the mapping does not contain.
    pub fn into_parts(self) -> Result<(StateIndexer, QTable)> {
        let indexer = StateIndexer::from_records(&self.states)?;
        for (index, row) in &self.q_values {
            if row.iter().any(|v| !v.is_finite()) {
                return Err(TrainingError::Snapshot(format!(
                    "non-finite q-value at state {}",
                    index
                )));
            }
            if !self.states.iter().any(|r| r.index == *index) {
                return Err(TrainingError::Snapshot(format!(
                    "q-table row {} has no state mapping",
                    index
                )));
            }
        }
        Ok((indexer, QTable::from_map(self.q_values)))
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Write `short_return,long_return,vol_bucket,position,index` rows.
pub fn write_state_mapping_csv<W: std::io::Write>(indexer: &StateIndexer, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in indexer.to_records() {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
