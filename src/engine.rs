//! # Processing-engine boundary.
//!
//! The engine executes units of work and exposes two read-only output
//! streams (informational events and errors) plus a drain-wait operation.
//! Task scheduling, worker pools, and per-unit retry logic are the
//! engine's own business; this crate only drives its lifecycle.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::conductor::Conductor;
use crate::error::BoxError;

/// A processing engine bound to the run's cancellation token.
///
/// The stream takers are single-shot: the first call returns the live
/// stream, later calls return an already-closed one. Buffer hints are
/// clamped to a minimum of 1.
#[async_trait]
pub trait Engine: Send {
    /// Takes the informational output stream.
    fn events(&mut self, buffer: usize) -> mpsc::Receiver<String>;

    /// Takes the error output stream.
    fn errors(&mut self, buffer: usize) -> mpsc::Receiver<BoxError>;

    /// Begins processing work units.
    fn start(&mut self) -> Result<(), BoxError>;

    /// Waits until cancellation-driven shutdown has propagated through the
    /// engine and all in-flight work is accounted for.
    async fn drained(&mut self);
}

/// Constructs engines and tracks registered conductors.
pub trait EngineBuilder: Send + Sync + 'static {
    /// Registers a connected conductor under its own identity.
    ///
    /// Registration exposes no failure path; should a collaborator grow
    /// one, callers must treat it as fatal like every other stage.
    fn register(&self, id: &str, conductor: Arc<dyn Conductor>);

    /// Builds an engine bound to `token`.
    ///
    /// `None` means no engine could be constructed, which is fatal to the
    /// caller.
    fn construct(&self, token: CancellationToken) -> Option<Box<dyn Engine>>;
}

/// Returns a receiver that is already closed.
///
/// Useful for implementing the single-shot stream-taker contract.
pub fn closed_stream<T>() -> mpsc::Receiver<T> {
    let (tx, rx) = mpsc::channel(1);
    drop(tx);
    rx
}
