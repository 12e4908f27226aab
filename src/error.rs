//! Typed errors for mbt-conform.
//!
//! Conformance violations, timeouts and implementation failures are not
//! errors: they end a test case with a failing [`TestResult`](crate::TestResult).
//! The types here cover what cannot be recovered inside a test case.

#[cfg(feature = "replay")]
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for mbt-conform operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid run configuration, raised before any test case runs.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Resetting the implementation between test cases failed.
    ///
    /// Fatal to the whole session.
    #[error("Reset failed before run {run}: {source}")]
    Reset {
        run: usize,
        #[source]
        source: ImplementationError,
    },

    /// Error loading a fixed test suite.
    #[cfg(feature = "replay")]
    #[error("Test suite error: {0}")]
    Suite(#[from] SuiteError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invalid step budget or symbol partition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The hard step ceiling is below the step budget.
    #[error("maxStepsCnt ({max}) must be 0 or at least stepsCnt ({steps})")]
    StepCeiling { steps: usize, max: usize },

    /// A symbol set names an action the model does not know.
    #[error("Unknown action symbol '{symbol}' in {set} actions")]
    UnknownSymbol { set: &'static str, symbol: String },

    /// A cleanup or internal symbol is not a tester action.
    #[error("Action symbol '{symbol}' in {set} actions is not a tester action")]
    NotTesterAction { set: &'static str, symbol: String },

    /// The strategy exposes no action symbols at all.
    #[error("Model has no action symbols")]
    EmptyVocabulary,
}

/// Failure raised by the implementation under test.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ImplementationError {
    /// The implementation does not handle this action.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The implementation rejected or failed to perform an action.
    #[error("Action '{action}' failed: {reason}")]
    ActionFailed { action: String, reason: String },

    /// The implementation panicked while handling a call.
    #[error("Implementation panicked: {0}")]
    Panicked(String),

    /// The invocation thread could not be started.
    #[error("Failed to start invocation thread: {0}")]
    Spawn(String),

    /// The implementation could not be brought back to its initial state.
    #[error("Reset failed: {0}")]
    Reset(String),
}

impl ImplementationError {
    /// Shorthand for [`ImplementationError::ActionFailed`].
    pub fn failed(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ActionFailed {
            action: action.into(),
            reason: reason.into(),
        }
    }
}

/// Error loading a fixed test suite.
#[cfg(feature = "replay")]
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SuiteError {
    /// Failed to parse a suite file.
    #[error("Failed to parse test suite {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Failed to read a suite directory.
    #[error("Failed to read directory {path}: {reason}")]
    DirectoryRead { path: PathBuf, reason: String },

    /// Path given to a directory loader is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The suite holds no test cases.
    #[error("Test suite has no test cases")]
    Empty,
}

/// Result type alias using mbt-conform's Error.
pub type ConformResult<T> = std::result::Result<T, Error>;
