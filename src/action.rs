use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrainingError;

/// Position value for each action index. Shared by the environment,
/// the trainer and the backtest so the mapping cannot drift.
pub const ACTION_VALUES: [i8; 3] = [-1, 0, 1];

pub const NUM_ACTIONS: usize = ACTION_VALUES.len();

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Short,
    #[default]
    Flat,
    Long,
}

impl Action {
    pub const ALL: [Action; NUM_ACTIONS] = [Action::Short, Action::Flat, Action::Long];

    /// Action for a Q-table column. Returns `None` outside `0..NUM_ACTIONS`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            Action::Short => 0,
            Action::Flat => 1,
            Action::Long => 2,
        }
    }

    /// Target position: -1 short, 0 flat, +1 long.
    pub fn value(self) -> i8 {
        ACTION_VALUES[self.index()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Short => "short",
            Action::Flat => "flat",
            Action::Long => "long",
        }
    }
}

impl TryFrom<i64> for Action {
    type Error = TrainingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        ACTION_VALUES
            .iter()
            .position(|&v| i64::from(v) == value)
            .and_then(Action::from_index)
            .ok_or(TrainingError::InvalidAction(value))
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(Action::Short),
            "flat" => Ok(Action::Flat),
            "long" => Ok(Action::Long),
            _ => Err(format!("Invalid action: {}", s)),
        }
    }
}
