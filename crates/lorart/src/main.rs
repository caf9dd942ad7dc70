mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, Context};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "lorart", version, about = "LoRaWAN serial bridge CLI")]
struct Cli {
    /// Serial device path, e.g. /dev/ttyUSB0.
    #[arg(long, value_name = "DEVICE", env = "LORART_PORT", global = true)]
    port: Option<String>,

    /// Serial baud rate.
    #[arg(long, value_name = "RATE", default_value_t = lorart_transport::DEFAULT_BAUD_RATE, global = true)]
    baud: u32,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let ctx = Context {
        port: cli.port,
        baud: cli.baud,
        format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
    };
    let result = cmd::run(cli.command, ctx).await;

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join_with_port() {
        let cli = Cli::try_parse_from(["lorart", "join", "--port", "/dev/ttyUSB0"])
            .expect("join args should parse");
        assert!(matches!(cli.command, Command::Join(_)));
        assert_eq!(cli.port.as_deref(), Some("/dev/ttyUSB0"));
    }

    #[test]
    fn parses_send_with_json_payload() {
        let cli = Cli::try_parse_from([
            "lorart",
            "send",
            "--port",
            "/dev/ttyUSB0",
            "--json",
            "{\"x\":1}",
            "--wait",
        ])
        .expect("send args should parse");
        assert!(matches!(cli.command, Command::Send(_)));
    }

    #[test]
    fn rejects_json_and_spot_together() {
        let err = Cli::try_parse_from([
            "lorart",
            "send",
            "--json",
            "{}",
            "--spot",
            "dock-1",
            "--poi",
            "spots.json",
        ])
        .expect_err("conflicting payload args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn spot_requires_the_poi_file() {
        let err = Cli::try_parse_from(["lorart", "send", "--spot", "dock-1"])
            .expect_err("--spot without --poi should fail");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn baud_defaults_to_the_module_rate() {
        let cli = Cli::try_parse_from(["lorart", "version"]).expect("version should parse");
        assert_eq!(cli.baud, 9600);
    }
}
