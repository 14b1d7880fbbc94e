//! Replay of a frozen greedy policy over a price series.
//!
//! P&L is additive: per-step rewards are summed, not compounded.

use serde::Serialize;
use tracing::debug;

use crate::action::Action;
use crate::config::EnvConfig;
use crate::env::MicroEnv;
use crate::error::Result;
use crate::indexer::StateIndexer;
use crate::series::PriceSeries;
use crate::trace::BacktestTick;
use crate::traits::{Environment, Policy};

pub const PERIODS_PER_YEAR: f64 = 252.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BacktestReport {
    pub total_pnl: f64,
    pub cumulative_pnl: Vec<f64>,
    pub per_step_pnl: Vec<f64>,
    pub sharpe_like: f64,
    /// Position held after each step.
    pub positions: Vec<i8>,
    /// Environment cursor after each step.
    pub cursor_trace: Vec<usize>,
    pub max_drawdown: f64,
    /// Steps on which the position changed.
    pub trades: usize,
}

impl BacktestReport {
    pub fn steps(&self) -> usize {
        self.per_step_pnl.len()
    }

    pub fn ticks(&self) -> Vec<BacktestTick> {
        (0..self.steps())
            .map(|i| {
                BacktestTick::new(
                    i,
                    self.cursor_trace[i],
                    self.positions[i],
                    self.per_step_pnl[i],
                    self.cumulative_pnl[i],
                )
            })
            .collect()
    }
}

/// Replay `policy` once through a fresh environment.
///
/// The indexer is only read: a state it never saw, or an index the policy
/// has no entry for, falls back to [`Action::Flat`].
pub fn replay<P: Policy>(
    prices: &PriceSeries,
    policy: &P,
    indexer: &StateIndexer,
    env_config: &EnvConfig,
) -> Result<BacktestReport> {
    let mut env = MicroEnv::new(prices, env_config.clone())?;
    let mut state = env.reset();

    let mut per_step_pnl = Vec::new();
    let mut cumulative_pnl = Vec::new();
    let mut positions = Vec::new();
    let mut cursor_trace = Vec::new();
    let mut running = 0.0;
    let mut trades = 0;

    loop {
        let action = indexer
            .get(&state)
            .and_then(|index| policy.action_for(index))
            .unwrap_or(Action::Flat);
        let before = env.position();
        let outcome = env.step(action)?;
        if env.position() != before {
            trades += 1;
        }

        running += outcome.reward;
        per_step_pnl.push(outcome.reward);
        cumulative_pnl.push(running);
        positions.push(env.position());
        cursor_trace.push(env.cursor());

        match outcome.next_state {
            Some(next) if !outcome.done => state = next,
            _ => break,
        }
    }

    let report = BacktestReport {
        total_pnl: running,
        sharpe_like: sharpe_like(&per_step_pnl),
        max_drawdown: max_drawdown(&cumulative_pnl),
        cumulative_pnl,
        per_step_pnl,
        positions,
        cursor_trace,
        trades,
    };
    debug!(
        steps = report.steps(),
        total_pnl = report.total_pnl,
        sharpe_like = report.sharpe_like,
        trades = report.trades,
        "backtest finished"
    );
    Ok(report)
}

/// `mean * 252 / (std * sqrt(252))` over per-step P&L, population std.
/// Zero when there are fewer than two steps or no variation.
///
/// A constant series still leaves rounding noise in the std, so "no
/// variation" is anything within `n` ulps of the mean's scale.
pub fn sharpe_like(pnl: &[f64]) -> f64 {
    if pnl.len() < 2 {
        return 0.0;
    }
    let n = pnl.len() as f64;
    let mean = pnl.iter().sum::<f64>() / n;
    let std = (pnl.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n).sqrt();
    if !std.is_finite() || std <= f64::EPSILON * n * mean.abs().max(1.0) {
        return 0.0;
    }
    mean * PERIODS_PER_YEAR / (std * PERIODS_PER_YEAR.sqrt())
}

/// Largest peak-to-trough drop of an additive P&L curve, measured from 0.
pub fn max_drawdown(cumulative: &[f64]) -> f64 {
    let mut peak = 0.0f64;
    let mut worst = 0.0f64;
    for &value in cumulative {
        peak = peak.max(value);
        worst = worst.max(peak - value);
    }
    worst
}
