use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use lorart_frame::{DownlinkFrame, LineFramer, UplinkCommand};
use lorart_transport::{Backend, LinkEvent, LinkEvents, LinkWriter, TransportError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::LineBus;
use crate::error::{JoinError, Result};
use crate::join;
use crate::profile::RadioProfile;

/// Banner substring the module prints when it (re)boots.
const BOOT_BANNER: &str = "DRAGINO";

/// Marker the module prints when a downlink is buffered and ready to be
/// fetched with `AT+RECVB=?`.
const RX_DONE_MARKER: &str = "rxDone";

/// Called with `(fport, payload)` for every decoded downlink.
pub type DataHandler = Arc<dyn Fn(u8, serde_json::Value) + Send + Sync>;
/// Called when the connection or the network session is lost.
pub type DisconnectHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    on_data: Option<DataHandler>,
    on_disconnected: Option<DisconnectHandler>,
}

pub(crate) struct Shared {
    pub(crate) profile: RadioProfile,
    backend: Backend,
    port_connected: AtomicBool,
    pub(crate) network_joined: AtomicBool,
    join_active: AtomicBool,
    writer: Mutex<Option<LinkWriter>>,
    pub(crate) bus: LineBus,
    cancel: Mutex<Option<CancellationToken>>,
    callbacks: Mutex<Callbacks>,
}

impl Shared {
    /// Write one command line through the stored writer.
    pub(crate) fn write_line(&self, line: &str) -> lorart_transport::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match writer.as_mut() {
            Some(writer) => writer.write_line(line),
            None => Err(TransportError::NotConnected),
        }
    }

    /// Handle one complete line from the module. Runs inline on the read
    /// loop, so ordering is end to end.
    fn process_line(&self, line: &str) {
        debug!(%line, "module line");
        self.bus.publish(line.to_string());

        // A boot banner outside a join attempt means the module power
        // cycled and lost its network session.
        if line.contains(BOOT_BANNER) && !self.join_active.load(Ordering::SeqCst) {
            if self.network_joined.swap(false, Ordering::SeqCst) {
                info!("module reboot detected, network session lost");
                self.fire_disconnected();
            }
            return;
        }

        if line.contains(RX_DONE_MARKER) {
            if let Err(err) = self.write_line("AT+RECVB=?") {
                warn!(%err, "downlink fetch request failed");
            }
            return;
        }

        if let Some(frame) = DownlinkFrame::parse(line) {
            match frame.decode_json() {
                Ok(value) => {
                    debug!(fport = frame.fport, "downlink decoded");
                    self.fire_data(frame.fport, value);
                }
                Err(err) => warn!(%err, %line, "dropping malformed downlink"),
            }
        }
    }

    fn handle_link_closed(&self) {
        info!("transport link closed");
        self.port_connected.store(false, Ordering::SeqCst);
        self.network_joined.store(false, Ordering::SeqCst);
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.fire_disconnected();
    }

    fn fire_data(&self, fport: u8, value: serde_json::Value) {
        let handler = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_data
            .clone();
        if let Some(handler) = handler {
            handler(fport, value);
        }
    }

    fn fire_disconnected(&self) {
        let handler = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_disconnected
            .clone();
        if let Some(handler) = handler {
            handler();
        }
    }
}

/// Driver for one LoRaWAN module behind one transport backend.
///
/// Cheap to clone through `Arc` internally; all operations take `&self`.
/// Connection state, the join handshake, the uplink path, and downlink
/// dispatch are all owned here.
pub struct LoraBridge {
    shared: Arc<Shared>,
}

impl LoraBridge {
    pub fn new(backend: Backend) -> Self {
        Self::with_profile(backend, RadioProfile::default())
    }

    pub fn with_profile(backend: Backend, profile: RadioProfile) -> Self {
        Self {
            shared: Arc::new(Shared {
                profile,
                backend,
                port_connected: AtomicBool::new(false),
                network_joined: AtomicBool::new(false),
                join_active: AtomicBool::new(false),
                writer: Mutex::new(None),
                bus: LineBus::new(),
                cancel: Mutex::new(None),
                callbacks: Mutex::new(Callbacks::default()),
            }),
        }
    }

    /// Open the backend and start the read loop.
    ///
    /// Idempotent: returns `true` immediately when already connected.
    /// Open failures are logged and reported as `false`, never raised.
    /// Must be called from within a tokio runtime.
    pub fn connect(
        &self,
        on_data: impl Fn(u8, serde_json::Value) + Send + Sync + 'static,
        on_disconnected: impl Fn() + Send + Sync + 'static,
    ) -> bool {
        let shared = &self.shared;
        if shared.port_connected.load(Ordering::SeqCst) {
            debug!("connect: already connected");
            return true;
        }

        let link = match shared.backend.open() {
            Ok(link) => link,
            Err(err) => {
                warn!(%err, backend = shared.backend.name(), "transport open failed");
                return false;
            }
        };
        let (writer, events) = link.split();

        {
            let mut callbacks = shared
                .callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            callbacks.on_data = Some(Arc::new(on_data));
            callbacks.on_disconnected = Some(Arc::new(on_disconnected));
        }
        shared
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(writer);

        let token = CancellationToken::new();
        if let Some(old) = shared
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone())
        {
            old.cancel();
        }

        shared.port_connected.store(true, Ordering::SeqCst);
        tokio::spawn(read_loop(Arc::clone(shared), events, token));
        info!(backend = shared.backend.name(), "bridge connected");
        true
    }

    /// Tear the connection down. Safe to call at any time, any number of
    /// times; never raises.
    pub fn disconnect(&self) {
        let shared = &self.shared;
        if let Some(token) = shared
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            token.cancel();
        }
        shared
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let was_connected = shared.port_connected.swap(false, Ordering::SeqCst);
        shared.network_joined.store(false, Ordering::SeqCst);
        if was_connected {
            info!("bridge disconnected");
        }
    }

    /// Run the OTAA join handshake.
    ///
    /// At most one attempt runs at a time; a concurrent call fails with
    /// [`JoinError::AlreadyInProgress`] without disturbing the first. The
    /// whole attempt races the profile's global join timeout.
    pub async fn join(&self) -> Result<()> {
        let shared = &self.shared;
        if !shared.port_connected.load(Ordering::SeqCst) {
            return Err(JoinError::NotConnected);
        }
        if shared.join_active.swap(true, Ordering::SeqCst) {
            warn!("join refused: attempt already in progress");
            return Err(JoinError::AlreadyInProgress);
        }
        let _active = ActiveGuard {
            flag: &shared.join_active,
        };

        let result = match tokio::time::timeout(shared.profile.join_timeout, join::run(shared))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(JoinError::Timeout),
        };
        match &result {
            Ok(()) => info!("network joined"),
            Err(err) => warn!(%err, "join failed"),
        }
        result
    }

    /// Transmit a JSON payload as an unconfirmed uplink on the default
    /// port. Fire and forget: dropped with a warning when not joined or
    /// when the write fails.
    pub fn send(&self, payload: &serde_json::Value) {
        match UplinkCommand::from_json(payload) {
            Ok(command) => self.send_uplink(command),
            Err(err) => warn!(%err, "uplink dropped: unencodable payload"),
        }
    }

    /// Transmit a prepared uplink command. Same fire-and-forget contract
    /// as [`send`](Self::send).
    pub fn send_uplink(&self, command: UplinkCommand) {
        if !self.is_joined() {
            warn!("uplink dropped: not joined");
            return;
        }
        let line = command.to_line();
        debug!(%line, "uplink");
        if let Err(err) = self.shared.write_line(&line) {
            warn!(%err, "uplink write failed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.port_connected.load(Ordering::SeqCst)
    }

    /// Connected to the port and joined to the network.
    pub fn is_joined(&self) -> bool {
        self.shared.port_connected.load(Ordering::SeqCst)
            && self.shared.network_joined.load(Ordering::SeqCst)
    }

    /// The bus every received line is published on. Long-lived consumers
    /// (monitoring, diagnostics) subscribe here.
    pub fn bus(&self) -> &LineBus {
        &self.shared.bus
    }
}

impl std::fmt::Debug for LoraBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoraBridge")
            .field("backend", &self.shared.backend.name())
            .field("connected", &self.is_connected())
            .field("joined", &self.is_joined())
            .finish()
    }
}

/// Clears the join-active flag exactly once, however the attempt ends.
struct ActiveGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

async fn read_loop(shared: Arc<Shared>, mut events: LinkEvents, cancel: CancellationToken) {
    let mut framer = LineFramer::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("read loop cancelled");
                break;
            }
            event = events.recv() => match event {
                Some(LinkEvent::Data(chunk)) => {
                    for line in framer.push(&chunk) {
                        shared.process_line(&line);
                    }
                }
                Some(LinkEvent::Closed) | None => {
                    shared.handle_link_closed();
                    break;
                }
            }
        }
    }
}
