use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::trace;

/// Capacity of the line broadcast channel. Subscribers that fall this far
/// behind skip lines rather than block the read loop.
const BUS_CAPACITY: usize = 128;

/// One received line, trimmed, with its receipt instant.
#[derive(Debug, Clone)]
pub struct LineEvent {
    pub line: String,
    pub received_at: Instant,
}

/// Broadcast bus carrying every line the module emits.
///
/// Passive consumers hold long-lived subscriptions via [`subscribe`];
/// one-shot expectations use [`await_line`], which registers before the
/// caller performs the write it expects an answer to and deregisters on
/// resolve or timeout.
///
/// [`subscribe`]: LineBus::subscribe
/// [`await_line`]: LineBus::await_line
#[derive(Debug, Clone)]
pub struct LineBus {
    tx: broadcast::Sender<LineEvent>,
}

impl Default for LineBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Publish a line to all current subscribers, in arrival order.
    pub fn publish(&self, line: String) {
        let event = LineEvent {
            line,
            received_at: Instant::now(),
        };
        // Err just means nobody is listening right now.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LineEvent> {
        self.tx.subscribe()
    }

    /// Wait for the first line matching `predicate`, up to `timeout`.
    ///
    /// Subscription happens inside this call, before the returned future
    /// is polled, so lines published after `await_line` returns are never
    /// missed. Resolves to `None` on timeout.
    pub fn await_line(
        &self,
        timeout: Duration,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> impl Future<Output = Option<LineEvent>> + Send {
        let mut rx = self.tx.subscribe();
        async move {
            let wait = async {
                loop {
                    match rx.recv().await {
                        Ok(event) if predicate(&event.line) => return Some(event),
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            trace!(skipped, "line bus subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            };
            tokio::time::timeout(timeout, wait).await.unwrap_or(None)
        }
    }
}
