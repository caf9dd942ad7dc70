use lorart_frame::UplinkCommand;

use crate::cmd::{connect_streaming, load_spot_map, open_bridge, parse_duration, Context, SendArgs};
use crate::exit::{join_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::print_downlink;

pub async fn run(args: SendArgs, ctx: Context) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let command = resolve_payload(&args)?;

    let bridge = open_bridge(&ctx)?;
    let mut downlinks = connect_streaming(&bridge)?;

    bridge
        .join()
        .await
        .map_err(|err| join_error("join failed", err))?;
    bridge.send_uplink(command);

    if args.wait {
        match tokio::time::timeout(wait_timeout, downlinks.recv()).await {
            Ok(Some((fport, payload))) => print_downlink(fport, &payload, ctx.format),
            Ok(None) => {
                bridge.disconnect();
                return Err(CliError::new(
                    crate::exit::TRANSPORT_ERROR,
                    "connection lost while waiting for a downlink",
                ));
            }
            Err(_) => {
                bridge.disconnect();
                return Err(CliError::new(TIMEOUT, "no downlink before the wait timeout"));
            }
        }
    }

    bridge.disconnect();
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<UplinkCommand> {
    if let Some(json) = &args.json {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return UplinkCommand::from_json(&value)
            .map_err(|err| CliError::new(USAGE, format!("payload encoding failed: {err}")));
    }
    if let (Some(spot), Some(poi)) = (&args.spot, &args.poi) {
        let map = load_spot_map(poi)?;
        let code = map.code(spot).ok_or_else(|| {
            CliError::new(USAGE, format!("spot {spot:?} not found in {}", poi.display()))
        })?;
        return Ok(UplinkCommand::from_bytes(vec![code]));
    }
    Err(CliError::new(USAGE, "one of --json or --spot is required"))
}
