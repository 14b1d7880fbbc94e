use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrainingError>;

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Insufficient history: series has {len} prices, need at least {required}")]
    InsufficientHistory { len: usize, required: usize },

    #[error("Invalid action: {0} (expected -1, 0 or 1)")]
    InvalidAction(i64),

    #[error("Invalid price at index {index}: {value}")]
    InvalidPrice { index: usize, value: f64 },

    #[error("Invalid date in row {row}: {value:?} (expected DD/MM/YYYY or YYYY-MM-DD)")]
    InvalidDate { row: usize, value: String },

    #[error("Price series is empty")]
    EmptySeries,

    #[error("Episode not started: call reset() before step()")]
    EpisodeNotStarted,

    #[error("Episode finished: end of price series reached")]
    EpisodeFinished,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
