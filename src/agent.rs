//! # Agent: lifecycle orchestration and graceful shutdown.
//!
//! [`Agent`] is the top-level driver. It owns the run's
//! [`CancellationToken`], starts the signal monitor, resolves
//! configuration, connects and registers the conductor, constructs and
//! starts the engine, bridges the engine's two output streams into the log
//! sink, and coordinates a deterministic shutdown.
//!
//! ## Stage flow
//! ```text
//! run():
//!   token = CancellationToken::new()
//!   spawn signal::monitor(token)                    (SIGINT/SIGTERM → cancel)
//!
//!   RunConfig::resolve(args)          ── fail → fatal (resolve_config)
//!   connector.connect(config)         ── fail → fatal (connect_conductor)
//!   engines.register(id, conductor)
//!   engines.construct(token)          ── None → fatal (construct_engine)
//!
//!   bridge(token, engine.events(0)) ──► sink.consume_events(...)
//!   bridge(token, engine.errors(0)) ──► sink.consume_errors(...)
//!
//!   engine.start()                    ── fail → fatal (start_engine)
//!   log "online"
//!   engine.drained().await            (blocks until cancellation propagated)
//!   log "cleanup complete"
//!
//! shutdown (every exit path):
//!   token.cancel()                    (idempotent)
//!   join signal monitor + both bridges
//!   sink.flush(50ms)
//! ```
//!
//! Transitions are strictly sequential and forward-only. The first failing
//! stage aborts the run; there is no partial rollback and no retry. The
//! shutdown tail runs on the failure paths too, so no spawned task
//! outlives the run.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::bridge::bridge;
use crate::conductor::Connector;
use crate::config::{Args, RunConfig};
use crate::engine::EngineBuilder;
use crate::error::AgentError;
use crate::signal;
use crate::sink::LogSink;

/// Grace period for the sink to land buffered output before returning.
const FLUSH_GRACE: Duration = Duration::from_millis(50);

/// Top-level lifecycle driver.
pub struct Agent {
    connector: Arc<dyn Connector>,
    engines: Arc<dyn EngineBuilder>,
    sink: Arc<dyn LogSink>,
}

impl Agent {
    /// Creates an agent over the given collaborators.
    pub fn new(
        connector: Arc<dyn Connector>,
        engines: Arc<dyn EngineBuilder>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            connector,
            engines,
            sink,
        }
    }

    /// Runs the full lifecycle.
    ///
    /// Returns `Ok(())` after a clean drain (normally following a
    /// termination signal), or the fatal error of the first failing
    /// stage.
    pub async fn run(&self, args: &Args) -> Result<(), AgentError> {
        self.run_with_shutdown(CancellationToken::new(), args).await
    }

    /// Same as [`Agent::run`], but observing an externally owned shutdown
    /// token in addition to OS termination signals.
    ///
    /// Whichever fires first wins; the token stays cancelled either way.
    pub async fn run_with_shutdown(
        &self,
        token: CancellationToken,
        args: &Args,
    ) -> Result<(), AgentError> {
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();
        tasks.push(signal::monitor(token.clone()));

        let result = self.drive(&token, args, &mut tasks).await;

        // Release the monitor and any bridges regardless of how drive()
        // exited; cancelling an already-cancelled token is a no-op.
        token.cancel();
        for task in tasks {
            let _ = task.await;
        }
        self.sink.flush(FLUSH_GRACE).await;
        result
    }

    /// The forward-only stage sequence.
    ///
    /// Spawned bridge handles are pushed into `tasks` so the caller can
    /// join them on every exit path.
    async fn drive(
        &self,
        token: &CancellationToken,
        args: &Args,
        tasks: &mut Vec<JoinHandle<()>>,
    ) -> Result<(), AgentError> {
        let config = RunConfig::resolve(args)?;

        let conductor = self
            .connector
            .connect(&config)
            .await
            .map_err(|e| AgentError::Connect {
                error: e.to_string(),
            })?;
        self.engines
            .register(conductor.identity(), Arc::clone(&conductor));

        let mut engine = self
            .engines
            .construct(token.clone())
            .ok_or(AgentError::EngineUnavailable)?;

        let (events, events_task) = bridge(token.clone(), engine.events(0));
        let (errors, errors_task) = bridge(token.clone(), engine.errors(0));
        tasks.push(events_task);
        tasks.push(errors_task);
        self.sink.consume_events(events);
        self.sink.consume_errors(errors);

        engine.start().map_err(|e| AgentError::EngineStart {
            error: e.to_string(),
        })?;
        info!("online");

        engine.drained().await;
        info!("cleanup complete");
        Ok(())
    }
}
