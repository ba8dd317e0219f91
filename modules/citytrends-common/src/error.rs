use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrendError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
