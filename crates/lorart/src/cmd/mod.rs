use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use lorart_bridge::{LoraBridge, SpotCodeMap};
use lorart_transport::{Backend, SerialConfig};
use tokio::sync::mpsc;

use crate::exit::{CliError, CliResult, TRANSPORT_ERROR, USAGE};
use crate::output::OutputFormat;

pub mod join;
pub mod monitor;
pub mod send;
pub mod spots;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect and run the OTAA join handshake.
    Join(JoinArgs),
    /// Join, then transmit one uplink payload.
    Send(SendArgs),
    /// Join, then print decoded downlinks as they arrive.
    Monitor(MonitorArgs),
    /// Print the spot-code table derived from a POI file.
    Spots(SpotsArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Global settings shared by every subcommand.
pub struct Context {
    pub port: Option<String>,
    pub baud: u32,
    pub format: OutputFormat,
}

pub async fn run(command: Command, ctx: Context) -> CliResult<i32> {
    match command {
        Command::Join(args) => join::run(args, ctx).await,
        Command::Send(args) => send::run(args, ctx).await,
        Command::Monitor(args) => monitor::run(args, ctx).await,
        Command::Spots(args) => spots::run(args, ctx),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct JoinArgs {}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// JSON payload to transmit.
    #[arg(long, conflicts_with = "spot")]
    pub json: Option<String>,
    /// Transmit the one-byte code of this spot id instead of JSON.
    #[arg(long, requires = "poi")]
    pub spot: Option<String>,
    /// POI file the spot-code table is derived from.
    #[arg(long, value_name = "FILE")]
    pub poi: Option<PathBuf>,
    /// Wait for one downlink and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait when --wait is set (e.g. 30s, 500ms).
    #[arg(long, default_value = "60s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug, Default)]
pub struct MonitorArgs {
    /// Exit after printing N downlinks.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SpotsArgs {
    /// POI file to derive codes from.
    #[arg(long, value_name = "FILE")]
    pub poi: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn open_bridge(ctx: &Context) -> CliResult<LoraBridge> {
    let port = ctx
        .port
        .clone()
        .ok_or_else(|| CliError::new(USAGE, "--port is required (or set LORART_PORT)"))?;
    let serial = SerialConfig {
        device: port,
        baud_rate: ctx.baud,
    };
    let backend = Backend::detect(None, Some(serial))
        .map_err(|err| CliError::new(TRANSPORT_ERROR, format!("no transport: {err}")))?;
    Ok(LoraBridge::new(backend))
}

/// Connect the bridge, streaming decoded downlinks into a channel.
pub(crate) fn connect_streaming(
    bridge: &LoraBridge,
) -> CliResult<mpsc::UnboundedReceiver<(u8, serde_json::Value)>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let connected = bridge.connect(
        move |fport, value| {
            let _ = tx.send((fport, value));
        },
        || {},
    );
    if !connected {
        return Err(CliError::new(
            TRANSPORT_ERROR,
            "failed to open the serial device",
        ));
    }
    Ok(rx)
}

/// Load spot ids from a POI file: a JSON array of id strings, or of
/// objects carrying an `"id"` field.
pub(crate) fn load_spot_map(path: &Path) -> CliResult<SpotCodeMap> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        CliError::new(
            USAGE,
            format!("failed reading {}: {err}", path.display()),
        )
    })?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(|err| {
        CliError::new(
            crate::exit::DATA_INVALID,
            format!("{} is not valid JSON: {err}", path.display()),
        )
    })?;
    let entries = value.as_array().ok_or_else(|| {
        CliError::new(
            crate::exit::DATA_INVALID,
            format!("{} must contain a JSON array", path.display()),
        )
    })?;

    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = entry
            .as_str()
            .or_else(|| entry.get("id").and_then(serde_json::Value::as_str))
            .ok_or_else(|| {
                CliError::new(
                    crate::exit::DATA_INVALID,
                    "POI entries must be id strings or objects with an \"id\" field",
                )
            })?;
        ids.push(id.to_string());
    }
    Ok(SpotCodeMap::build(ids))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<std::time::Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(std::time::Duration::from_millis(value)),
        _ => Ok(std::time::Duration::from_secs(value)),
    }
}
