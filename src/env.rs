use tracing::debug;

use crate::action::Action;
use crate::config::EnvConfig;
use crate::error::{Result, TrainingError};
use crate::series::PriceSeries;
use crate::state::{return_bucket, DiscreteState, VolBucket};
use crate::traits::Environment;

#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome<O> {
    /// `None` once the cursor has run off the end of the series.
    pub next_state: Option<O>,
    pub reward: f64,
    pub done: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Done,
}

/// Single-position trading environment replayed over a fixed price series.
#[derive(Clone, Debug)]
pub struct MicroEnv<'a> {
    prices: &'a PriceSeries,
    config: EnvConfig,
    t: usize,
    position: Action,
    entry_price: Option<f64>,
    phase: Phase,
}

impl<'a> MicroEnv<'a> {
    /// Bind an environment to `prices`.
    ///
    /// # Errors
    /// * `Config` if the windows or costs are out of range
    /// * `InsufficientHistory` if the series cannot supply one full window plus a step
    pub fn new(prices: &'a PriceSeries, config: EnvConfig) -> Result<Self> {
        config.validate()?;
        let required = config.warmup() + 1;
        if prices.len() < required {
            return Err(TrainingError::InsufficientHistory {
                len: prices.len(),
                required,
            });
        }
        Ok(Self {
            prices,
            config,
            t: 0,
            position: Action::Flat,
            entry_price: None,
            phase: Phase::Idle,
        })
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn cursor(&self) -> usize {
        self.t
    }

    pub fn position(&self) -> i8 {
        self.position.value()
    }

    /// Price at which the current non-flat position was opened. Informational only.
    pub fn entry_price(&self) -> Option<f64> {
        self.entry_price
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Step with a raw position value, rejecting anything outside {-1, 0, 1}.
    pub fn step_value(&mut self, value: i64) -> Result<StepOutcome<DiscreteState>> {
        let action = Action::try_from(value)?;
        self.step(action)
    }

    /// Discrete state at cursor `t`. Requires `t >= warmup` and `t < len`,
    /// which `reset` and `step` guarantee.
    fn state_at(&self, t: usize) -> DiscreteState {
        let p = self.prices.as_slice();
        let ws = self.config.window_short;
        let wl = self.config.window_long;

        let short_ret = (p[t] - p[t - ws]) / p[t - ws];
        let long_ret = (p[t] - p[t - wl]) / p[t - wl];

        let returns: Vec<f64> = p[t - wl..=t].windows(2).map(|w| w[1] / w[0] - 1.0).collect();
        let vol = sample_std(&returns);

        DiscreteState::new(
            return_bucket(short_ret),
            return_bucket(long_ret),
            VolBucket::from_vol(vol),
            self.position,
        )
    }
}

impl Environment for MicroEnv<'_> {
    type Obs = DiscreteState;

    /// Reset to the first cursor with enough history, flat, no entry price.
    ///
    /// # Returns
    /// Discrete state at the warm-up cursor
    fn reset(&mut self) -> Self::Obs {
        self.t = self.config.warmup();
        self.position = Action::Flat;
        self.entry_price = None;
        self.phase = Phase::Running;
        self.state_at(self.t)
    }

    /// Move to the position given by `action` and advance the cursor by one.
    ///
    /// # Returns
    /// Next state (or `None` at the end of the series), reward, done flag
    ///
    /// # Invariants
    /// * Holding P&L uses the position held before this step
    /// * Costs are charged only when the position changes, on the current price
    /// * Never reads past the end of the series
    fn step(&mut self, action: Action) -> Result<StepOutcome<Self::Obs>> {
        match self.phase {
            Phase::Idle => return Err(TrainingError::EpisodeNotStarted),
            Phase::Done => return Err(TrainingError::EpisodeFinished),
            Phase::Running => {}
        }

        let price = self.prices.as_slice()[self.t];
        let prev_price = self.prices.as_slice()[self.t - 1];
        let mut reward = (price - prev_price) * f64::from(self.position.value());
        if action != self.position {
            reward -= self.config.transaction_cost * f64::from(action.value().abs()) * price;
            reward -= self.config.slippage_penalty * price;
            if action != Action::Flat {
                self.entry_price = Some(price);
            }
        }
        self.position = action;

        self.t += 1;
        if self.t >= self.prices.len() {
            self.phase = Phase::Done;
            debug!(cursor = self.t, "end of price series");
            return Ok(StepOutcome {
                next_state: None,
                reward,
                done: true,
            });
        }
        Ok(StepOutcome {
            next_state: Some(self.state_at(self.t)),
            reward,
            done: false,
        })
    }
}

/// Sample standard deviation (n - 1). Zero for fewer than two values.
pub(crate) fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> EnvConfig {
        EnvConfig {
            window_short: 2,
            window_long: 3,
            ..EnvConfig::default()
        }
    }

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries::new(prices.to_vec()).unwrap()
    }

    #[test]
    fn reset_places_cursor_after_warmup() {
        let prices = series(&[100.0, 101.0, 99.0, 99.0, 102.0]);
        let mut env = MicroEnv::new(&prices, small_config()).unwrap();
        let state = env.reset();
        assert_eq!(env.cursor(), 3);
        assert_eq!(state.short_return, -1);
        assert_eq!(state.long_return, -1);
        assert_eq!(state.vol, VolBucket::Medium);
        assert_eq!(state.position_idx, 1);
    }

    #[test]
    fn opening_from_flat_pays_costs_only() {
        let prices = series(&[100.0, 101.0, 99.0, 99.0, 102.0]);
        let config = small_config();
        let mut env = MicroEnv::new(&prices, config.clone()).unwrap();
        env.reset();

        let out = env.step(Action::Long).unwrap();
        let cost = (config.transaction_cost + config.slippage_penalty) * 99.0;
        assert!((out.reward + cost).abs() < 1e-12);
        assert!(!out.done);
        assert_eq!(env.position(), 1);
        assert_eq!(env.entry_price(), Some(99.0));
        assert_eq!(out.next_state.unwrap().position_idx, 2);

        let out = env.step(Action::Long).unwrap();
        assert_eq!(out.reward, 3.0);
        assert!(out.done);
        assert!(out.next_state.is_none());
    }

    #[test]
    fn closing_to_flat_skips_transaction_cost() {
        let prices = series(&[100.0, 101.0, 99.0, 99.0, 102.0, 104.0]);
        let config = small_config();
        let mut env = MicroEnv::new(&prices, config.clone()).unwrap();
        env.reset();
        env.step(Action::Short).unwrap();
        let out = env.step(Action::Flat).unwrap();
        let expected = (102.0 - 99.0) * -1.0 - config.slippage_penalty * 102.0;
        assert!((out.reward - expected).abs() < 1e-12);
        assert_eq!(env.entry_price(), Some(99.0));
    }

    #[test]
    fn short_series_is_rejected() {
        let prices = series(&[100.0, 101.0, 99.0]);
        let err = MicroEnv::new(&prices, small_config()).unwrap_err();
        assert!(matches!(
            err,
            TrainingError::InsufficientHistory {
                len: 3,
                required: 4
            }
        ));
    }

    #[test]
    fn step_outside_episode_is_an_error() {
        let prices = series(&[100.0, 101.0, 99.0, 99.0]);
        let mut env = MicroEnv::new(&prices, small_config()).unwrap();
        assert!(matches!(
            env.step(Action::Flat),
            Err(TrainingError::EpisodeNotStarted)
        ));
        env.reset();
        assert!(env.step(Action::Flat).unwrap().done);
        assert!(matches!(
            env.step(Action::Flat),
            Err(TrainingError::EpisodeFinished)
        ));
    }

    #[test]
    fn malformed_action_value_is_rejected() {
        let prices = series(&[100.0, 101.0, 99.0, 99.0, 102.0]);
        let mut env = MicroEnv::new(&prices, small_config()).unwrap();
        env.reset();
        assert!(matches!(
            env.step_value(2),
            Err(TrainingError::InvalidAction(2))
        ));
        assert_eq!(env.cursor(), 3);
    }

    #[test]
    fn sample_std_edge_cases() {
        assert_eq!(sample_std(&[]), 0.0);
        assert_eq!(sample_std(&[0.3]), 0.0);
        assert!((sample_std(&[1.0, 3.0]) - 2f64.sqrt()).abs() < 1e-12);
    }
}
