use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainingError};

fn check(ok: bool, msg: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(TrainingError::Config(msg.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Proportional cost charged on `|action| * price` when the position changes.
    pub transaction_cost: f64,
    /// Proportional cost charged on `price` for any position change.
    pub slippage_penalty: f64,
    pub window_short: usize,
    pub window_long: usize,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            transaction_cost: 0.0005,
            slippage_penalty: 0.0002,
            window_short: 5,
            window_long: 20,
        }
    }
}

impl EnvConfig {
    /// First cursor with enough history for both windows.
    pub fn warmup(&self) -> usize {
        self.window_short.max(self.window_long)
    }

    pub fn validate(&self) -> Result<()> {
        check(self.window_short >= 1, "window_short must be >= 1")?;
        check(self.window_long >= 1, "window_long must be >= 1")?;
        check(
            self.transaction_cost.is_finite() && self.transaction_cost >= 0.0,
            "transaction_cost must be finite and >= 0",
        )?;
        check(
            self.slippage_penalty.is_finite() && self.slippage_penalty >= 0.0,
            "slippage_penalty must be finite and >= 0",
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: usize,
    pub alpha: f64,
    pub gamma: f64,
    pub eps_start: f64,
    pub eps_end: f64,
    pub eps_decay: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 200,
            alpha: 0.1,
            gamma: 0.98,
            eps_start: 0.4,
            eps_end: 0.02,
            eps_decay: 0.98,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        check(self.alpha > 0.0 && self.alpha <= 1.0, "alpha must be in (0, 1]")?;
        check((0.0..=1.0).contains(&self.gamma), "gamma must be in [0, 1]")?;
        check(
            (0.0..=1.0).contains(&self.eps_start),
            "eps_start must be in [0, 1]",
        )?;
        check((0.0..=1.0).contains(&self.eps_end), "eps_end must be in [0, 1]")?;
        check(
            self.eps_decay > 0.0 && self.eps_decay <= 1.0,
            "eps_decay must be in (0, 1]",
        )
    }
}

/// Synthetic geometric Brownian motion parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbmConfig {
    pub s0: f64,
    pub mu: f64,
    pub sigma: f64,
    pub n: usize,
    /// Step as a fraction of a trading day (1/390 is one minute).
    pub dt: f64,
    pub seed: u64,
}

impl Default for GbmConfig {
    fn default() -> Self {
        Self {
            s0: 100.0,
            mu: 0.0,
            sigma: 0.02,
            n: 2000,
            dt: 1.0 / 390.0,
            seed: 42,
        }
    }
}

impl GbmConfig {
    pub fn validate(&self) -> Result<()> {
        check(self.s0.is_finite() && self.s0 > 0.0, "s0 must be > 0")?;
        check(self.mu.is_finite(), "mu must be finite")?;
        check(self.sigma.is_finite() && self.sigma >= 0.0, "sigma must be >= 0")?;
        check(self.dt.is_finite() && self.dt > 0.0, "dt must be > 0")?;
        check(self.n >= 1, "n must be >= 1")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub env: EnvConfig,
    pub training: TrainingConfig,
    pub gbm: GbmConfig,
}

impl Config {
    /// Loads a config file: `.json` through serde_json, anything else as TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.env.validate()?;
        self.training.validate()?;
        self.gbm.validate()
    }
}
