use std::io::{ErrorKind, Read};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::link::{Link, LinkEvent, LinkEvents, LinkWriter};

/// Baud rate the radio module speaks.
pub const DEFAULT_BAUD_RATE: u32 = 9_600;

/// Capacity of the inbound chunk channel; the reader thread blocks when
/// the consumer falls this far behind, so nothing is dropped.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Poll interval for the blocking reader; short enough that dropping the
/// receiving side tears the thread down promptly.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

const READ_CHUNK_SIZE: usize = 256;

/// Open a serial device and start its reader thread.
///
/// The returned [`Link`] owns a cloned write handle; inbound bytes are
/// pulled on a dedicated blocking thread and forwarded as [`LinkEvent`]s.
/// The thread exits when the device reports EOF or a fatal error, or when
/// the event receiver is dropped.
pub fn open(device: &str, baud_rate: u32) -> Result<Link> {
    let port = serialport::new(device, baud_rate)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|source| TransportError::Open {
            device: device.to_string(),
            source,
        })?;

    let reader = port.try_clone().map_err(|source| TransportError::Open {
        device: device.to_string(),
        source,
    })?;

    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let device_name = device.to_string();
    std::thread::Builder::new()
        .name("lorart-serial-read".to_string())
        .spawn(move || read_thread(reader, events_tx, device_name))
        .map_err(TransportError::Io)?;

    info!(%device, baud_rate, "serial device opened");
    Ok(Link::new(
        LinkWriter::from_serial(port),
        LinkEvents::bounded(events_rx),
    ))
}

fn read_thread(
    mut reader: Box<dyn serialport::SerialPort>,
    events_tx: mpsc::Sender<LinkEvent>,
    device: String,
) {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => {
                debug!(%device, "serial device reached EOF");
                let _ = events_tx.blocking_send(LinkEvent::Closed);
                break;
            }
            Ok(n) => {
                let data = Bytes::copy_from_slice(&chunk[..n]);
                if events_tx.blocking_send(LinkEvent::Data(data)).is_err() {
                    // Receiver dropped: the bridge disconnected.
                    debug!(%device, "event receiver dropped; stopping reader");
                    break;
                }
            }
            Err(err) if err.kind() == ErrorKind::TimedOut => {
                if events_tx.is_closed() {
                    debug!(%device, "event receiver dropped; stopping reader");
                    break;
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(%device, %err, "serial read failed");
                let _ = events_tx.blocking_send(LinkEvent::Closed);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_device_fails_cleanly() {
        let result = open("/dev/lorart-does-not-exist", DEFAULT_BAUD_RATE);
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }
}
