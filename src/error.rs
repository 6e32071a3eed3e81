//! Error types used by the agent lifecycle core.
//!
//! This module defines two error enums:
//!
//! - [`ConfigError`] — configuration resolution failed (a required
//!   environment variable is missing or empty).
//! - [`AgentError`] — a lifecycle stage failed; the run is aborted.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for
//! logging, naming the stage at which the failure occurred. Every variant
//! is fatal to the current run: the core never retries.

use thiserror::Error;

/// Boxed error used at the collaborator boundaries (conductor, engine).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by configuration resolution.
///
/// Validation is ordered and short-circuiting: the error always names the
/// *first* missing variable in priority order (connection string, then
/// exchange, then topic), never an aggregate.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("environment variable {name} is empty")]
    MissingVar {
        /// Name of the first missing variable in priority order.
        name: &'static str,
    },
}

impl ConfigError {
    /// Returns the name of the variable that failed validation.
    ///
    /// # Example
    /// ```
    /// use atomizer_agent::ConfigError;
    ///
    /// let err = ConfigError::MissingVar { name: "EXCHANGE" };
    /// assert_eq!(err.variable(), "EXCHANGE");
    /// ```
    pub fn variable(&self) -> &'static str {
        match self {
            ConfigError::MissingVar { name } => name,
        }
    }
}

/// # Errors produced by the lifecycle orchestrator.
///
/// Each variant corresponds to the stage that failed. There is no
/// partial-success mode: the first failing stage aborts the run and the
/// process exits non-zero.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration could not be resolved from the environment.
    #[error("error while pulling environment variables: {0}")]
    Config(#[from] ConfigError),

    /// The conductor connection could not be established.
    #[error("error while initializing conductor: {error}")]
    Connect {
        /// The underlying error message.
        error: String,
    },

    /// The engine builder produced no engine.
    #[error("engine builder returned no engine")]
    EngineUnavailable,

    /// The engine failed to start processing.
    #[error("error while starting engine: {error}")]
    EngineStart {
        /// The underlying error message.
        error: String,
    },
}

impl AgentError {
    /// Returns a short stable label (snake_case) naming the failed stage.
    ///
    /// # Example
    /// ```
    /// use atomizer_agent::AgentError;
    ///
    /// let err = AgentError::EngineUnavailable;
    /// assert_eq!(err.as_label(), "construct_engine");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            AgentError::Config(_) => "resolve_config",
            AgentError::Connect { .. } => "connect_conductor",
            AgentError::EngineUnavailable => "construct_engine",
            AgentError::EngineStart { .. } => "start_engine",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            AgentError::Config(e) => format!("configuration: {e}"),
            AgentError::Connect { error } => format!("conductor: {error}"),
            AgentError::EngineUnavailable => "engine builder returned no engine".to_string(),
            AgentError::EngineStart { error } => format!("engine start: {error}"),
        }
    }
}
