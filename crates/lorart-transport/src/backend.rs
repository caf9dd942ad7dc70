use std::sync::Arc;

use tracing::info;

use crate::error::{Result, TransportError};
use crate::host::HostBridge;
use crate::link::Link;
use crate::serial::{self, DEFAULT_BAUD_RATE};

/// Parameters for the direct serial backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub device: String,
    pub baud_rate: u32,
}

impl SerialConfig {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// The transport backend the bridge was configured with.
///
/// Detection runs once at startup and the choice never changes afterwards.
/// A present host bridge always wins over a serial device.
#[derive(Debug, Clone)]
pub enum Backend {
    Host(Arc<HostBridge>),
    Serial(SerialConfig),
}

impl Backend {
    /// Pick a backend from what the environment offers.
    ///
    /// Preference order: host bridge, then serial. Errors with
    /// [`TransportError::Unavailable`] when neither is present.
    pub fn detect(host: Option<Arc<HostBridge>>, serial: Option<SerialConfig>) -> Result<Self> {
        if let Some(host) = host {
            info!("transport backend: host bridge");
            return Ok(Backend::Host(host));
        }
        if let Some(config) = serial {
            info!(device = %config.device, "transport backend: serial");
            return Ok(Backend::Serial(config));
        }
        Err(TransportError::Unavailable)
    }

    /// Open a fresh [`Link`] on this backend.
    ///
    /// The host backend cannot fail to attach; the serial backend fails if
    /// the device cannot be opened.
    pub fn open(&self) -> Result<Link> {
        match self {
            Backend::Host(host) => Ok(host.attach()),
            Backend::Serial(config) => serial::open(&config.device, config.baud_rate),
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Host(_) => "host-bridge",
            Backend::Serial(_) => "serial",
        }
    }
}
