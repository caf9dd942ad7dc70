use tracing::info;

use crate::cmd::{connect_streaming, open_bridge, Context, MonitorArgs};
use crate::exit::{join_error, CliResult, SUCCESS};
use crate::output::print_downlink;

pub async fn run(args: MonitorArgs, ctx: Context) -> CliResult<i32> {
    let bridge = open_bridge(&ctx)?;
    let mut downlinks = connect_streaming(&bridge)?;

    bridge
        .join()
        .await
        .map_err(|err| join_error("join failed", err))?;
    info!("monitoring downlinks, Ctrl-C to stop");

    let mut printed = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = downlinks.recv() => match received {
                Some((fport, payload)) => {
                    print_downlink(fport, &payload, ctx.format);
                    printed = printed.saturating_add(1);
                    if args.count.is_some_and(|count| printed >= count) {
                        break;
                    }
                }
                // Connection lost; the bridge already logged why.
                None => break,
            }
        }
    }

    bridge.disconnect();
    Ok(SUCCESS)
}
