use rand::Rng;
use rand_distr::StandardNormal;

use crate::config::GbmConfig;
use crate::error::Result;
use crate::series::PriceSeries;

/// Generate a synthetic price path by geometric Brownian motion.
///
/// # Arguments
/// * `params` - Start price, drift, volatility, length and step size
/// * `rng` - Generator for the normal shocks; seed it for reproducible paths
///
/// # Returns
/// Series of `params.n` prices starting at `params.s0`
///
/// # Invariants
/// * `S_i = S_{i-1} * exp((mu - sigma^2 / 2) dt + sigma sqrt(dt) z)`, `z ~ N(0, 1)`
/// * Exactly `n - 1` normal draws are consumed
pub fn generate_gbm<R: Rng + ?Sized>(params: &GbmConfig, rng: &mut R) -> Result<PriceSeries> {
    params.validate()?;
    let drift = (params.mu - 0.5 * params.sigma * params.sigma) * params.dt;
    let diffusion = params.sigma * params.dt.sqrt();

    let mut prices = Vec::with_capacity(params.n);
    let mut price = params.s0;
    prices.push(price);
    for _ in 1..params.n {
        let z: f64 = rng.sample(StandardNormal);
        price *= (drift + diffusion * z).exp();
        prices.push(price);
    }
    PriceSeries::new(prices)
}
