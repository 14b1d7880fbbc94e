use serde::{Deserialize, Serialize};

/// One backtest step, flattened for CSV export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BacktestTick {
    pub step: usize,
    pub cursor: usize,
    pub position: i8,
    pub pnl: f64,
    pub cumulative_pnl: f64,
}

impl BacktestTick {
    pub fn new(step: usize, cursor: usize, position: i8, pnl: f64, cumulative_pnl: f64) -> Self {
        Self {
            step,
            cursor,
            position,
            pnl,
            cumulative_pnl,
        }
    }
}

pub fn write_ticks_csv<W: std::io::Write>(ticks: &[BacktestTick], writer: W) -> crate::error::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for tick in ticks {
        wtr.serialize(tick)?;
    }
    wtr.flush()?;
    Ok(())
}
