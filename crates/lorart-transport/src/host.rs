use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::link::{Link, LinkEvent, LinkEvents, LinkWriter};

/// Push-style backend for embedding hosts.
///
/// When the application runs inside a host that owns the physical port
/// (a mobile shell, a native container), the host constructs one
/// `HostBridge` at startup with its send callback, and thereafter delivers
/// inbound bytes and disconnect notifications by calling [`push_data`] and
/// [`notify_disconnect`]. The bridge side attaches with [`attach`], which
/// always succeeds — the host is assumed to have the port pre-connected.
///
/// The inbound channel is unbounded: push calls never block and never
/// drop, whatever the consumer's pace.
///
/// [`push_data`]: HostBridge::push_data
/// [`notify_disconnect`]: HostBridge::notify_disconnect
/// [`attach`]: HostBridge::attach
pub struct HostBridge {
    send: Arc<dyn Fn(&str) + Send + Sync>,
    inbound: Mutex<Option<mpsc::UnboundedSender<LinkEvent>>>,
}

impl HostBridge {
    /// Create a host bridge around the host's send function.
    ///
    /// The callback receives complete CRLF-terminated command lines and is
    /// responsible for putting them on the wire.
    pub fn new(send: impl Fn(&str) + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            send: Arc::new(send),
            inbound: Mutex::new(None),
        })
    }

    /// Attach a [`Link`] to this bridge, replacing any previous attachment.
    pub fn attach(&self) -> Link {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        if let Ok(mut inbound) = self.inbound.lock() {
            *inbound = Some(events_tx);
        }
        debug!("host bridge attached");
        Link::new(
            LinkWriter::from_host(Arc::clone(&self.send)),
            LinkEvents::unbounded(events_rx),
        )
    }

    /// Deliver inbound bytes from the host. Chunk boundaries are arbitrary.
    ///
    /// Bytes pushed while no link is attached are dropped.
    pub fn push_data(&self, data: &[u8]) {
        self.forward(LinkEvent::Data(Bytes::copy_from_slice(data)));
    }

    /// Report that the host lost the physical port.
    pub fn notify_disconnect(&self) {
        self.forward(LinkEvent::Closed);
    }

    fn forward(&self, event: LinkEvent) {
        let Ok(inbound) = self.inbound.lock() else {
            return;
        };
        match inbound.as_ref() {
            Some(tx) => {
                // Send only fails once the link side is gone.
                if tx.send(event).is_err() {
                    warn!("host bridge event dropped (link detached)");
                }
            }
            None => debug!("host bridge event dropped (no link attached)"),
        }
    }
}

impl std::fmt::Debug for HostBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let attached = self
            .inbound
            .lock()
            .map(|inbound| inbound.is_some())
            .unwrap_or(false);
        f.debug_struct("HostBridge")
            .field("attached", &attached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pushed_bytes_arrive_on_attached_link() {
        let host = HostBridge::new(|_line: &str| {});
        let link = host.attach();
        let (_writer, mut events) = link.split();

        host.push_data(b"+JOIN: OK\r\n");

        match events.recv().await {
            Some(LinkEvent::Data(data)) => assert_eq!(data.as_ref(), b"+JOIN: OK\r\n"),
            other => panic!("expected data event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn disconnect_notification_closes_link() {
        let host = HostBridge::new(|_line: &str| {});
        let (_writer, mut events) = host.attach().split();

        host.notify_disconnect();

        assert!(matches!(events.recv().await, Some(LinkEvent::Closed)));
    }

    #[test]
    fn push_without_attachment_is_dropped() {
        let host = HostBridge::new(|_line: &str| {});
        // Must not panic or block.
        host.push_data(b"stray");
        host.notify_disconnect();
    }

    #[tokio::test]
    async fn burst_pushes_are_delivered_in_full() {
        let host = HostBridge::new(|_line: &str| {});
        let (_writer, mut events) = host.attach().split();

        // Far more chunks than any fixed channel capacity, pushed before
        // the consumer reads a single one.
        for _ in 0..500 {
            host.push_data(b"x");
        }

        let mut received = 0usize;
        while received < 500 {
            match events.recv().await {
                Some(LinkEvent::Data(data)) => received += data.len(),
                other => panic!("expected data event, got {other:?}"),
            }
        }
        assert_eq!(received, 500);
    }

    #[tokio::test]
    async fn reattach_replaces_previous_link() {
        let host = HostBridge::new(|_line: &str| {});
        let (_w1, mut first) = host.attach().split();
        let (_w2, mut second) = host.attach().split();

        host.push_data(b"x");

        assert!(matches!(second.recv().await, Some(LinkEvent::Data(_))));
        assert!(first.try_recv().is_err());
    }
}
