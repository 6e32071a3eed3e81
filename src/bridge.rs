//! # Stream bridging into the observability sink.
//!
//! [`bridge`] converts a typed, receive-only stream of engine output into a
//! stream of the common erased [`Envelope`] type consumed by the log sink.
//! It is instantiated twice per run, once for informational events and
//! once for errors; the two instances share no state.
//!
//! ## Rules
//! - **Order preserved**: values are forwarded in exact arrival order; the
//!   bridge never reorders or deduplicates.
//! - **Backpressure propagated**: the output channel holds a single item;
//!   a slow consumer slows the bridge, it is not buffered away.
//! - **Cancellation wins**: each iteration waits for cancellation *or* the
//!   next value, with cancellation checked first. A value racing
//!   cancellation may be dropped; that race is accepted, not worked
//!   around with buffering.
//! - **Single close**: the output stream is closed exactly once, by the
//!   bridge task alone, when the task exits.
//!
//! ## Input close
//! The input stream's lifetime is expected to be bounded by the same
//! cancellation token. If the input closes *before* cancellation, the
//! bridge treats that as terminal for itself: it stops and closes its
//! output. It never cancels the shared token on behalf of the run.

use std::fmt;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::BoxError;

/// Erased payload forwarded to the log sink.
///
/// Carries no metadata beyond the payload itself; ownership transfers to
/// the sink on send.
#[derive(Debug)]
pub enum Envelope {
    /// Informational event emitted by the engine.
    Info(String),
    /// Error surfaced by the engine.
    Error(BoxError),
}

impl From<String> for Envelope {
    fn from(value: String) -> Self {
        Envelope::Info(value)
    }
}

impl From<BoxError> for Envelope {
    fn from(value: BoxError) -> Self {
        Envelope::Error(value)
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Envelope::Info(message) => write!(f, "{message}"),
            Envelope::Error(error) => write!(f, "{error}"),
        }
    }
}

/// Bridges a typed input stream into an erased output stream.
///
/// Returns immediately with the output stream and the handle of the
/// forwarding task; the caller owns the handle and joins it at shutdown.
///
/// # Example
/// ```
/// use tokio::sync::mpsc;
/// use tokio_util::sync::CancellationToken;
/// use atomizer_agent::{bridge, Envelope};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let token = CancellationToken::new();
///     let (tx, rx) = mpsc::channel::<String>(1);
///     let (mut out, task) = bridge(token.clone(), rx);
///
///     tx.send("ready".to_string()).await.unwrap();
///     match out.recv().await {
///         Some(Envelope::Info(message)) => assert_eq!(message, "ready"),
///         other => panic!("unexpected envelope: {other:?}"),
///     }
///
///     token.cancel();
///     task.await.unwrap();
/// }
/// ```
pub fn bridge<T>(
    token: CancellationToken,
    mut input: mpsc::Receiver<T>,
) -> (mpsc::Receiver<Envelope>, JoinHandle<()>)
where
    T: Into<Envelope> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                next = input.recv() => {
                    let Some(value) = next else { break };
                    // Forwarding applies backpressure; stay cancel-aware
                    // while the downstream consumer catches up.
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        sent = tx.send(value.into()) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }
    });
    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::sync::mpsc::error::TryRecvError;

    #[tokio::test]
    async fn test_forwards_in_order_and_stays_open() {
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel::<String>(8);
        let (mut out, task) = bridge(token.clone(), rx);

        for value in ["v1", "v2", "v3"] {
            tx.send(value.to_string()).await.expect("bridge is live");
        }

        for expected in ["v1", "v2", "v3"] {
            match out.recv().await {
                Some(Envelope::Info(message)) => assert_eq!(message, expected),
                other => panic!("expected Info({expected:?}), got {other:?}"),
            }
        }

        // No implicit close: with the input still open and no
        // cancellation, the output stream stays open and empty.
        assert!(matches!(out.try_recv(), Err(TryRecvError::Empty)));

        token.cancel();
        assert!(out.recv().await.is_none(), "output closes on cancellation");
        task.await.expect("bridge task must not panic");
    }

    #[tokio::test]
    async fn test_cancel_before_input_closes_without_values() {
        let token = CancellationToken::new();
        token.cancel();

        let (_tx, rx) = mpsc::channel::<String>(1);
        let (mut out, task) = bridge(token, rx);

        assert!(out.recv().await.is_none(), "no value may be emitted");
        task.await.expect("bridge task must not panic");
    }

    #[tokio::test]
    async fn test_input_close_is_terminal_for_the_bridge() {
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel::<String>(1);
        let (mut out, task) = bridge(token.clone(), rx);

        tx.send("last".to_string()).await.expect("bridge is live");
        drop(tx);

        match out.recv().await {
            Some(Envelope::Info(message)) => assert_eq!(message, "last"),
            other => panic!("expected the final value, got {other:?}"),
        }
        assert!(out.recv().await.is_none(), "output closes after input");
        task.await.expect("bridge task must not panic");
        // The shared token is untouched by the bridge.
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_backpressure_holds_values_until_consumed() {
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel::<String>(8);
        let (mut out, task) = bridge(token.clone(), rx);

        tx.send("first".to_string()).await.expect("bridge is live");
        tx.send("second".to_string()).await.expect("bridge is live");

        // Let the bridge fill its single-slot output and block on the
        // second forward.
        tokio::time::sleep(Duration::from_millis(20)).await;

        match out.recv().await {
            Some(Envelope::Info(message)) => assert_eq!(message, "first"),
            other => panic!("expected first, got {other:?}"),
        }
        match out.recv().await {
            Some(Envelope::Info(message)) => assert_eq!(message, "second"),
            other => panic!("expected second, got {other:?}"),
        }

        token.cancel();
        task.await.expect("bridge task must not panic");
    }

    #[tokio::test]
    async fn test_error_envelope_display() {
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel::<BoxError>(1);
        let (mut out, task) = bridge(token.clone(), rx);

        let error: BoxError = "work unit exploded".into();
        tx.send(error).await.expect("bridge is live");

        match out.recv().await {
            Some(envelope @ Envelope::Error(_)) => {
                assert_eq!(envelope.to_string(), "work unit exploded");
            }
            other => panic!("expected Error envelope, got {other:?}"),
        }

        token.cancel();
        task.await.expect("bridge task must not panic");
    }
}
