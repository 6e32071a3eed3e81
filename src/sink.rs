//! # Log-sink boundary and the tracing-backed implementation.
//!
//! The sink is the single consumer of both bridged output streams. Its
//! buffering, formatting, and transport are collaborator concerns; the
//! boundary only requires that consumption is non-blocking for the caller
//! and that a best-effort flush exists for shutdown.
//!
//! [`TracingSink`] is the in-tree implementation: one worker task per
//! consumed stream, forwarding envelopes to the process-wide `tracing`
//! dispatcher. Workers end when their stream closes (the bridges
//! guarantee that on cancellation); `flush` joins them under a timeout.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bridge::Envelope;

/// Single sink for both bridged engine streams.
///
/// The two `consume_*` calls return immediately; processing happens on
/// sink-owned workers. No relative ordering between the two streams is
/// guaranteed; the sink must tolerate interleaving.
#[async_trait]
pub trait LogSink: Send + Sync + 'static {
    /// Consumes the informational stream until it closes.
    fn consume_events(&self, stream: mpsc::Receiver<Envelope>);

    /// Consumes the error stream until it closes.
    fn consume_errors(&self, stream: mpsc::Receiver<Envelope>);

    /// Best-effort flush: waits up to `timeout` for pending output to
    /// land.
    async fn flush(&self, timeout: Duration);
}

/// Sink forwarding envelopes to the `tracing` dispatcher.
#[derive(Default)]
pub struct TracingSink {
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TracingSink {
    /// Creates a new sink with no active workers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn adopt(&self, worker: JoinHandle<()>) {
        self.workers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(worker);
    }

    fn take_workers(&self) -> Vec<JoinHandle<()>> {
        let mut guard = self
            .workers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *guard)
    }
}

#[async_trait]
impl LogSink for TracingSink {
    fn consume_events(&self, mut stream: mpsc::Receiver<Envelope>) {
        self.adopt(tokio::spawn(async move {
            while let Some(envelope) = stream.recv().await {
                tracing::info!("{envelope}");
            }
        }));
    }

    fn consume_errors(&self, mut stream: mpsc::Receiver<Envelope>) {
        self.adopt(tokio::spawn(async move {
            while let Some(envelope) = stream.recv().await {
                tracing::error!("{envelope}");
            }
        }));
    }

    async fn flush(&self, timeout: Duration) {
        let workers = self.take_workers();
        let drain = async {
            for worker in workers {
                let _ = worker.await;
            }
        };
        let _ = tokio::time::timeout(timeout, drain).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flush_joins_workers_after_streams_close() {
        let sink = TracingSink::new();

        let (events_tx, events_rx) = mpsc::channel(1);
        let (errors_tx, errors_rx) = mpsc::channel(1);
        sink.consume_events(events_rx);
        sink.consume_errors(errors_rx);

        events_tx
            .send(Envelope::Info("online".into()))
            .await
            .expect("worker is live");
        drop(events_tx);
        drop(errors_tx);

        sink.flush(Duration::from_secs(1)).await;
        assert!(sink.take_workers().is_empty(), "flush consumed the workers");
    }

    #[tokio::test]
    async fn test_flush_with_no_workers_is_a_noop() {
        let sink = TracingSink::new();
        sink.flush(Duration::from_millis(10)).await;
    }
}
