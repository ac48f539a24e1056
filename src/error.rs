//! Error handling for vaso-trace
//!
//! This module defines the error type shared by the trace model, the edit
//! log and the point editor, plus a Result alias. Validation always happens
//! before any state is touched, so an `Err` means nothing changed.

use thiserror::Error;

use crate::types::Channel;

/// Main error type for trace model operations
#[derive(Error, Debug)]
pub enum TraceError {
    /// Array shapes or lengths that cannot form a trace
    #[error("Validation error: {0}")]
    Validation(String),

    /// Edit indices outside the series
    #[error("Edit index {index} out of bounds for trace of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Channel name that is not a known alias of inner/outer
    #[error("Unsupported channel: {0}")]
    UnknownChannel(String),

    /// Channel is valid but absent from this trace
    #[error("Trace does not include an {} diameter channel", .0.name())]
    ChannelUnavailable(Channel),

    /// Edit operation name that the model cannot apply
    #[error("Unsupported edit operation: {0}")]
    UnsupportedOperation(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TraceError>,
    },
}

impl TraceError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TraceError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping any context wrappers
    pub fn root(&self) -> &TraceError {
        match self {
            TraceError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for TraceError {
    fn from(err: serde_json::Error) -> Self {
        TraceError::Serialization(err.to_string())
    }
}

/// Result type alias for vaso-trace operations
pub type Result<T> = std::result::Result<T, TraceError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
