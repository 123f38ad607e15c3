use core::fmt::{Debug, Display};

use secret_santa_config::ConfigError;
use secret_santa_exchange::ExchangeError;

#[derive(thiserror::Error)]
pub enum DrawError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Exchange(#[from] ExchangeError),
    #[error("failed to read exchange file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse exchange file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("only {sent} of {attempted} messages were sent")]
    Incomplete { sent: usize, attempted: usize },
}

// main prints errors with Debug
impl Debug for DrawError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
