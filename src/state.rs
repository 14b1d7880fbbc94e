use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// Returns within this band of zero bucket to 0.
pub const RETURN_DEADBAND: f64 = 0.002;
pub const VOL_LOW_CUTOFF: f64 = 0.005;
pub const VOL_MEDIUM_CUTOFF: f64 = 0.02;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VolBucket {
    #[default]
    Low,
    Medium,
    High,
}

impl VolBucket {
    pub fn from_vol(vol: f64) -> Self {
        if vol < VOL_LOW_CUTOFF {
            VolBucket::Low
        } else if vol < VOL_MEDIUM_CUTOFF {
            VolBucket::Medium
        } else {
            VolBucket::High
        }
    }

    pub fn index(self) -> u8 {
        match self {
            VolBucket::Low => 0,
            VolBucket::Medium => 1,
            VolBucket::High => 2,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(VolBucket::Low),
            1 => Some(VolBucket::Medium),
            2 => Some(VolBucket::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VolBucket::Low => "low",
            VolBucket::Medium => "medium",
            VolBucket::High => "high",
        }
    }
}

impl FromStr for VolBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(VolBucket::Low),
            "medium" => Ok(VolBucket::Medium),
            "high" => Ok(VolBucket::High),
            _ => Err(format!("Invalid volatility bucket: {}", s)),
        }
    }
}

/// Sign bucket of a percentage return: -1, 0 or 1.
pub fn return_bucket(ret: f64) -> i8 {
    if ret > RETURN_DEADBAND {
        1
    } else if ret < -RETURN_DEADBAND {
        -1
    } else {
        0
    }
}

/// Discretized observation `(sr, lr, vb, pos_idx)`.
///
/// At most 3 x 3 x 3 x 3 = 81 distinct values exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscreteState {
    pub short_return: i8,
    pub long_return: i8,
    pub vol: VolBucket,
    /// Position shifted by +1: 0 short, 1 flat, 2 long.
    pub position_idx: u8,
}

impl DiscreteState {
    pub fn new(short_return: i8, long_return: i8, vol: VolBucket, position: Action) -> Self {
        Self {
            short_return,
            long_return,
            vol,
            position_idx: position.index() as u8,
        }
    }

    pub fn position(&self) -> i8 {
        self.position_idx as i8 - 1
    }

    pub fn as_tuple(&self) -> (i8, i8, u8, u8) {
        (
            self.short_return,
            self.long_return,
            self.vol.index(),
            self.position_idx,
        )
    }
}

impl fmt::Display for DiscreteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sr, lr, vb, pos) = self.as_tuple();
        write!(f, "({}, {}, {}, {})", sr, lr, vb, pos)
    }
}
