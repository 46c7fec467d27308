//! Error types for Synheart Titra

use thiserror::Error;

/// Errors that can occur during classification or titration
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Flow window is empty")]
    EmptyWindow,

    #[error("Sample rate must be a positive integer, got {0} Hz")]
    InvalidSampleRate(u32),

    #[error("Invalid controller configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
