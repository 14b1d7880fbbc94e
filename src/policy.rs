use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::{Action, NUM_ACTIONS};
use crate::agent::QAgent;
use crate::indexer::StateIndexer;
use crate::traits::Policy;

pub type ActionValues = [f64; NUM_ACTIONS];

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &ActionValues) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Action-value table keyed by state index. Unseen rows read as zeros.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QTable {
    table: BTreeMap<usize, ActionValues>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the row for `state`, zeros if it was never touched.
    pub fn row(&self, state: usize) -> ActionValues {
        self.table.get(&state).copied().unwrap_or([0.0; NUM_ACTIONS])
    }

    /// Mutable row, materialized as zeros on first access.
    pub fn row_mut(&mut self, state: usize) -> &mut ActionValues {
        self.table.entry(state).or_insert([0.0; NUM_ACTIONS])
    }

    pub fn q_value(&self, state: usize, action: Action) -> f64 {
        self.row(state)[action.index()]
    }

    pub fn max_value(&self, state: usize) -> f64 {
        let row = self.row(state);
        row[argmax(&row)]
    }

    pub fn best_action(&self, state: usize) -> Action {
        Action::ALL[argmax(&self.row(state))]
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &ActionValues)> {
        self.table.iter()
    }

    pub fn into_inner(self) -> BTreeMap<usize, ActionValues> {
        self.table
    }

    pub fn from_map(table: BTreeMap<usize, ActionValues>) -> Self {
        Self { table }
    }
}

/// Greedy snapshot of a Q-table: one action per state index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GreedyPolicy {
    actions: BTreeMap<usize, Action>,
}

impl GreedyPolicy {
    /// Arg-max action for every state the indexer has assigned.
    pub fn extract(agent: &QAgent, indexer: &StateIndexer) -> Self {
        let actions = indexer
            .decode_all()
            .values()
            .map(|&index| (index, agent.q_table().best_action(index)))
            .collect();
        Self { actions }
    }

    pub fn from_actions(actions: BTreeMap<usize, Action>) -> Self {
        Self { actions }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Policy for GreedyPolicy {
    fn action_for(&self, state_index: usize) -> Option<Action> {
        self.actions.get(&state_index).copied()
    }
}
