use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::Result;

/// One inbound event from a transport backend.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// A chunk of raw bytes arrived. Chunk boundaries are arbitrary and
    /// carry no framing meaning.
    Data(Bytes),
    /// The backend lost the device (serial EOF/error, host disconnect).
    Closed,
}

/// An open duplex channel to the radio module.
///
/// This is the fundamental type returned by transport operations. Both
/// backends produce the same shape: a line writer and an async stream of
/// byte chunks.
pub struct Link {
    writer: LinkWriter,
    events: LinkEvents,
}

impl Link {
    pub(crate) fn new(writer: LinkWriter, events: LinkEvents) -> Self {
        Self { writer, events }
    }

    /// Split into the writer half and the inbound event stream.
    pub fn split(self) -> (LinkWriter, LinkEvents) {
        (self.writer, self.events)
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").field("writer", &self.writer).finish()
    }
}

/// The inbound half of a [`Link`].
///
/// The serial backend feeds a bounded channel (its reader thread blocks
/// when the consumer falls behind); the host backend feeds an unbounded
/// one, since the host's push calls must never block or drop. Consumers
/// see a single stream either way.
pub struct LinkEvents {
    inner: EventsInner,
}

enum EventsInner {
    Bounded(mpsc::Receiver<LinkEvent>),
    Unbounded(mpsc::UnboundedReceiver<LinkEvent>),
}

impl LinkEvents {
    pub(crate) fn bounded(rx: mpsc::Receiver<LinkEvent>) -> Self {
        Self {
            inner: EventsInner::Bounded(rx),
        }
    }

    pub(crate) fn unbounded(rx: mpsc::UnboundedReceiver<LinkEvent>) -> Self {
        Self {
            inner: EventsInner::Unbounded(rx),
        }
    }

    /// Receive the next event; `None` once the backend is gone. Cancel
    /// safe, like the underlying channel receivers.
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        match &mut self.inner {
            EventsInner::Bounded(rx) => rx.recv().await,
            EventsInner::Unbounded(rx) => rx.recv().await,
        }
    }

    pub fn try_recv(&mut self) -> std::result::Result<LinkEvent, mpsc::error::TryRecvError> {
        match &mut self.inner {
            EventsInner::Bounded(rx) => rx.try_recv(),
            EventsInner::Unbounded(rx) => rx.try_recv(),
        }
    }
}

impl std::fmt::Debug for LinkEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.inner {
            EventsInner::Bounded(_) => "bounded",
            EventsInner::Unbounded(_) => "unbounded",
        };
        f.debug_struct("LinkEvents").field("channel", &kind).finish()
    }
}

/// The outbound half of a [`Link`] — writes CRLF-terminated command lines.
pub struct LinkWriter {
    inner: WriterInner,
}

enum WriterInner {
    Serial(Box<dyn serialport::SerialPort>),
    Host(Arc<dyn Fn(&str) + Send + Sync>),
}

impl LinkWriter {
    pub(crate) fn from_serial(port: Box<dyn serialport::SerialPort>) -> Self {
        Self {
            inner: WriterInner::Serial(port),
        }
    }

    pub(crate) fn from_host(send: Arc<dyn Fn(&str) + Send + Sync>) -> Self {
        Self {
            inner: WriterInner::Host(send),
        }
    }

    /// Write one command line, appending the `\r\n` terminator.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let framed = format!("{line}\r\n");
        trace!(%line, "transport write");
        match &mut self.inner {
            WriterInner::Serial(port) => {
                port.write_all(framed.as_bytes())?;
                port.flush()?;
                Ok(())
            }
            WriterInner::Host(send) => {
                send(&framed);
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for LinkWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            WriterInner::Serial(_) => f
                .debug_struct("LinkWriter")
                .field("backend", &"serial")
                .finish(),
            WriterInner::Host(_) => f
                .debug_struct("LinkWriter")
                .field("backend", &"host-bridge")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn host_writer_appends_crlf() {
        let sent: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sent);
        let mut writer = LinkWriter::from_host(Arc::new(move |text: &str| {
            sink.lock().unwrap().push(text.to_string());
        }));

        writer.write_line("AT+NJS=?").unwrap();
        writer.write_line("AT+JOIN").unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.as_slice(), ["AT+NJS=?\r\n", "AT+JOIN\r\n"]);
    }
}
