use pagewire_core::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("invalid launch configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("chromium error: {0}")]
    Chromium(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("script evaluation failed: {0}")]
    Evaluation(String),

    #[error("interception failed: {0}")]
    Interception(String),

    #[error("tab closed")]
    Closed,
}
