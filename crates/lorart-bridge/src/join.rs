//! The OTAA join handshake sequence.
//!
//! `Idle -> Probing -> (Joined | Configuring -> Joining -> (Joined |
//! Failed))`. The caller (the bridge) owns the single-attempt gate and
//! the global timeout; this module owns the command traffic and marker
//! interpretation.

use std::sync::atomic::Ordering;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::bridge::Shared;
use crate::error::{JoinError, Result};

const PROBE_COMMAND: &str = "AT+NJS=?";
const JOIN_COMMAND: &str = "AT+JOIN";

const SUCCESS_MARKERS: [&str; 2] = ["JOINED", "+JOIN: OK"];
const FAILURE_MARKERS: [&str; 2] = ["+JOIN: Failed", "Failed"];
const ERROR_MARKER: &str = "AT_ERROR";

pub(crate) async fn run(shared: &Shared) -> Result<()> {
    let profile = &shared.profile;

    // Probe first: if the module still holds a session there is nothing
    // to do. Register for the answer before writing the probe.
    let probe = shared
        .bus
        .await_line(profile.probe_timeout, |line| line == "1" || line == "0");
    shared
        .write_line(PROBE_COMMAND)
        .map_err(|_| JoinError::NotConnected)?;

    match probe.await {
        Some(event) if event.line == "1" => {
            info!("module already joined, skipping configuration");
            shared.network_joined.store(true, Ordering::SeqCst);
            return Ok(());
        }
        Some(_) => debug!("module not joined, configuring"),
        // Fail open on probe silence: treat the module as not joined and
        // run the full sequence.
        None => warn!("join-status probe unanswered, configuring anyway"),
    }

    for command in profile.config_commands() {
        shared
            .write_line(&command)
            .map_err(|_| JoinError::NotConnected)?;
        tokio::time::sleep(profile.inter_command_delay).await;
    }

    // Subscribe before the join command so no marker can slip past.
    let mut lines = shared.bus.subscribe();
    let started = Instant::now();
    shared
        .write_line(JOIN_COMMAND)
        .map_err(|_| JoinError::NotConnected)?;
    info!("join requested");

    loop {
        let event = match lines.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "join listener lagged behind the line bus");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("line bus closed during join");
                return Err(JoinError::ProtocolError);
            }
        };
        let line = event.line.as_str();

        if SUCCESS_MARKERS.iter().any(|marker| line.contains(marker)) {
            shared.network_joined.store(true, Ordering::SeqCst);
            return Ok(());
        }
        if FAILURE_MARKERS.iter().any(|marker| line.contains(marker)) {
            shared.network_joined.store(false, Ordering::SeqCst);
            return Err(JoinError::RejectedByDevice);
        }
        // AT_ERROR right after the join command is residue from the
        // configuration writes; only a late one is fatal.
        if line.contains(ERROR_MARKER)
            && event.received_at.duration_since(started) >= profile.error_grace
        {
            return Err(JoinError::ProtocolError);
        }
    }
}
