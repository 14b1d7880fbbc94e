use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainingError};
use crate::state::{DiscreteState, VolBucket};

/// Flat row of the state mapping, used for CSV and JSON export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub short_return: i8,
    pub long_return: i8,
    pub vol_bucket: u8,
    pub position: u8,
    pub index: usize,
}

impl StateRecord {
    pub fn state(&self) -> Result<DiscreteState> {
        let in_range = |v: i8| (-1..=1).contains(&v);
        let vol = VolBucket::from_index(self.vol_bucket);
        match vol {
            Some(vol)
                if in_range(self.short_return)
                    && in_range(self.long_return)
                    && self.position <= 2 =>
            {
                Ok(DiscreteState {
                    short_return: self.short_return,
                    long_return: self.long_return,
                    vol,
                    position_idx: self.position,
                })
            }
            _ => Err(TrainingError::Snapshot(format!(
                "state record out of range: {:?}",
                self
            ))),
        }
    }
}

/// Assigns dense indices to states in first-seen order.
///
/// Indices are never reassigned or reused; the mapping only grows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateIndexer {
    mapping: HashMap<DiscreteState, usize>,
    counter: usize,
}

impl StateIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `state`, assigning the next unused one on first sight.
    pub fn encode(&mut self, state: DiscreteState) -> usize {
        let next = self.counter;
        let index = *self.mapping.entry(state).or_insert(next);
        if index == next {
            self.counter += 1;
        }
        index
    }

    /// Read-only lookup; never assigns.
    pub fn get(&self, state: &DiscreteState) -> Option<usize> {
        self.mapping.get(state).copied()
    }

    pub fn decode_all(&self) -> &HashMap<DiscreteState, usize> {
        &self.mapping
    }

    /// Number of mapped states.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// All states ordered by index.
    pub fn states(&self) -> Vec<(DiscreteState, usize)> {
        let mut entries: Vec<_> = self.mapping.iter().map(|(s, i)| (*s, *i)).collect();
        entries.sort_by_key(|(_, i)| *i);
        entries
    }

    pub fn to_records(&self) -> Vec<StateRecord> {
        self.states()
            .into_iter()
            .map(|(state, index)| {
                let (short_return, long_return, vol_bucket, position) = state.as_tuple();
                StateRecord {
                    short_return,
                    long_return,
                    vol_bucket,
                    position,
                    index,
                }
            })
            .collect()
    }

    /// Rebuild an indexer from exported rows.
    ///
    /// # Errors
    /// `Snapshot` if a state or an index appears twice, or a field is out of range.
    /// Gaps in the index sequence are tolerated; new states get indices past the largest.
    pub fn from_records(records: &[StateRecord]) -> Result<Self> {
        let mut mapping = HashMap::with_capacity(records.len());
        let mut seen = std::collections::HashSet::with_capacity(records.len());
        for record in records {
            let state = record.state()?;
            if !seen.insert(record.index) {
                return Err(TrainingError::Snapshot(format!(
                    "index {} assigned twice",
                    record.index
                )));
            }
            if mapping.insert(state, record.index).is_some() {
                return Err(TrainingError::Snapshot(format!(
                    "state {} listed twice",
                    state
                )));
            }
        }
        let counter = records.iter().map(|r| r.index + 1).max().unwrap_or(0);
        Ok(Self { mapping, counter })
    }
}
