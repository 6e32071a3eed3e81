//! # Embedded reference collaborators.
//!
//! In-process implementations of the conductor, engine, and builder
//! boundaries, used by the shipped binary and the integration tests. Real
//! deployments implement the same traits against an actual broker and
//! work scheduler.
//!
//! - [`LocalConnector`] / [`LocalConductor`] — connection-free conductor
//!   whose identity derives from the resolved exchange and topic.
//! - [`LocalEngines`] / [`LocalEngine`] — engine factory keeping
//!   registered conductors by identity, producing a heartbeat engine that
//!   emits periodic informational events until cancelled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::conductor::{Conductor, Connector};
use crate::config::RunConfig;
use crate::engine::{closed_stream, Engine, EngineBuilder};
use crate::error::BoxError;

/// Conductor handle with a precomputed identity.
pub struct LocalConductor {
    identity: String,
}

impl Conductor for LocalConductor {
    fn identity(&self) -> &str {
        &self.identity
    }
}

/// Connection-free connector.
///
/// Derives the conductor identity from the resolved exchange and topic;
/// never fails.
#[derive(Default)]
pub struct LocalConnector;

#[async_trait]
impl Connector for LocalConnector {
    async fn connect(&self, config: &RunConfig) -> Result<Arc<dyn Conductor>, BoxError> {
        Ok(Arc::new(LocalConductor {
            identity: format!("{}/{}", config.exchange, config.topic),
        }))
    }
}

/// Engine factory keeping registered conductors by identity.
pub struct LocalEngines {
    conductors: Mutex<HashMap<String, Arc<dyn Conductor>>>,
    heartbeat: Duration,
}

impl Default for LocalEngines {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEngines {
    /// Creates a factory producing engines with a 500 ms heartbeat.
    #[must_use]
    pub fn new() -> Self {
        Self {
            conductors: Mutex::new(HashMap::new()),
            heartbeat: Duration::from_millis(500),
        }
    }

    /// Overrides the heartbeat period of constructed engines.
    #[must_use]
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Number of registered conductors.
    pub fn registered(&self) -> usize {
        self.conductors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl EngineBuilder for LocalEngines {
    fn register(&self, id: &str, conductor: Arc<dyn Conductor>) {
        self.conductors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.to_string(), conductor);
    }

    fn construct(&self, token: CancellationToken) -> Option<Box<dyn Engine>> {
        Some(Box::new(LocalEngine::new(token, self.heartbeat)))
    }
}

/// Heartbeat engine.
///
/// Emits `heartbeat #n` informational events on a fixed period until the
/// run token is cancelled. The error stream stays open and idle. Draining
/// joins the worker, so it completes only after cancellation has been
/// honored.
pub struct LocalEngine {
    token: CancellationToken,
    heartbeat: Duration,
    events_tx: Option<mpsc::Sender<String>>,
    events_taken: bool,
    errors_tx: Option<mpsc::Sender<BoxError>>,
    errors_taken: bool,
    worker: Option<JoinHandle<()>>,
}

impl LocalEngine {
    /// Creates an engine bound to `token`.
    #[must_use]
    pub fn new(token: CancellationToken, heartbeat: Duration) -> Self {
        Self {
            token,
            heartbeat,
            events_tx: None,
            events_taken: false,
            errors_tx: None,
            errors_taken: false,
            worker: None,
        }
    }
}

#[async_trait]
impl Engine for LocalEngine {
    fn events(&mut self, buffer: usize) -> mpsc::Receiver<String> {
        if self.events_taken {
            return closed_stream();
        }
        self.events_taken = true;
        let (tx, rx) = mpsc::channel(buffer.max(1));
        self.events_tx = Some(tx);
        rx
    }

    fn errors(&mut self, buffer: usize) -> mpsc::Receiver<BoxError> {
        if self.errors_taken {
            return closed_stream();
        }
        self.errors_taken = true;
        let (tx, rx) = mpsc::channel(buffer.max(1));
        self.errors_tx = Some(tx);
        rx
    }

    fn start(&mut self) -> Result<(), BoxError> {
        if self.worker.is_some() {
            return Err("engine already started".into());
        }

        let token = self.token.clone();
        let events = self.events_tx.take();
        let heartbeat = self.heartbeat;

        self.worker = Some(tokio::spawn(async move {
            let mut ticker = interval(heartbeat);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut beat: u64 = 0;
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        beat += 1;
                        let Some(tx) = &events else { continue };
                        let message = format!("heartbeat #{beat}");
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => break,
                            sent = tx.send(message) => {
                                if sent.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        }));
        Ok(())
    }

    async fn drained(&mut self) {
        match self.worker.take() {
            Some(worker) => {
                let _ = worker.await;
            }
            // Never started: drain completes once cancellation fires.
            None => self.token.cancelled().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        RunConfig {
            connection: "amqp://localhost:5672".into(),
            exchange: "atomizer".into(),
            topic: "electrons".into(),
        }
    }

    #[tokio::test]
    async fn test_conductor_identity_derives_from_config() {
        let conductor = LocalConnector
            .connect(&config())
            .await
            .expect("local connect never fails");
        assert_eq!(conductor.identity(), "atomizer/electrons");
    }

    #[tokio::test]
    async fn test_register_tracks_conductors_by_identity() {
        let engines = LocalEngines::new();
        let conductor = LocalConnector
            .connect(&config())
            .await
            .expect("local connect never fails");

        let id = conductor.identity().to_string();
        engines.register(&id, Arc::clone(&conductor));
        engines.register(&id, conductor);
        assert_eq!(engines.registered(), 1, "same identity registers once");
    }

    #[tokio::test]
    async fn test_engine_heartbeats_until_cancelled_then_drains() {
        let token = CancellationToken::new();
        let engines = LocalEngines::new().with_heartbeat(Duration::from_millis(10));
        let mut engine = engines
            .construct(token.clone())
            .expect("local construct never fails");

        let mut events = engine.events(4);
        engine.start().expect("first start succeeds");

        let first = events.recv().await.expect("heartbeat arrives");
        assert_eq!(first, "heartbeat #1");

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), engine.drained())
            .await
            .expect("drain completes after cancellation");
    }

    #[tokio::test]
    async fn test_stream_takers_are_single_shot() {
        let token = CancellationToken::new();
        let mut engine = LocalEngine::new(token, Duration::from_millis(10));

        let _live = engine.events(1);
        let mut second = engine.events(1);
        assert!(second.recv().await.is_none(), "second take is closed");
    }

    #[tokio::test]
    async fn test_double_start_is_an_error() {
        let token = CancellationToken::new();
        let mut engine = LocalEngine::new(token.clone(), Duration::from_millis(10));

        engine.start().expect("first start succeeds");
        assert!(engine.start().is_err(), "second start must fail");

        token.cancel();
        engine.drained().await;
    }

    #[tokio::test]
    async fn test_drain_without_start_completes_on_cancellation() {
        let token = CancellationToken::new();
        let mut engine = LocalEngine::new(token.clone(), Duration::from_millis(10));

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), engine.drained())
            .await
            .expect("drain must not hang");
    }
}
