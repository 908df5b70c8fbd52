use thiserror::Error;

#[derive(Error, Debug)]
pub enum HunterError {
    #[error("Failed to connect to Chrome: {0}")]
    ConnectionFailed(String),

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("No page available")]
    NoPage,

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid XPath '{expression}': {reason}")]
    InvalidXPath { expression: String, reason: String },

    #[error("Invalid DOM snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("No elements to export")]
    NothingToExport,

    #[error("Capture engine is not loaded for this page")]
    EngineNotLoaded,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl HunterError {
    pub(crate) fn selector(selector: &str, reason: impl Into<String>) -> Self {
        HunterError::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn xpath(expression: &str, reason: impl Into<String>) -> Self {
        HunterError::InvalidXPath {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HunterError>;
