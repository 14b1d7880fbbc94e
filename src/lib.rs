//! Tabular Q-learning micro-strategy trainer.
//!
//! A single-position environment is replayed over one price series, an
//! epsilon-greedy agent learns a table over a small discrete state space,
//! and the resulting greedy policy is backtested on the same series.

pub mod action;
pub mod agent;
pub mod backtest;
pub mod config;
pub mod env;
pub mod error;
pub mod gbm;
pub mod indexer;
pub mod policy;
pub mod series;
pub mod snapshot;
pub mod state;
pub mod trace;
pub mod trainer;
pub mod traits;

pub use action::{Action, ACTION_VALUES};
pub use agent::QAgent;
pub use backtest::{replay, BacktestReport};
pub use config::{Config, EnvConfig, GbmConfig, TrainingConfig};
pub use env::{MicroEnv, StepOutcome};
pub use error::{Result, TrainingError};
pub use indexer::StateIndexer;
pub use policy::{GreedyPolicy, QTable};
pub use series::PriceSeries;
pub use state::DiscreteState;
pub use trainer::{train, QTrainer};
