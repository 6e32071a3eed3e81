//! # Conductor boundary.
//!
//! A conductor represents the agent's connection to a work-distribution
//! channel (typically a message broker), identified by a unique ID. Its
//! internals (broker protocol, subscriptions, acknowledgment semantics)
//! are out of scope for this crate; only the boundary is specified here.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::RunConfig;
use crate::error::BoxError;

/// Connected handle to a work-distribution channel.
pub trait Conductor: Send + Sync + 'static {
    /// Returns the stable, unique identity of this conductor.
    fn identity(&self) -> &str;
}

/// Establishes conductor connections from resolved run configuration.
///
/// A failed connection is fatal to the run; the orchestrator never
/// retries.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens the connection described by `config`.
    async fn connect(&self, config: &RunConfig) -> Result<Arc<dyn Conductor>, BoxError>;
}
