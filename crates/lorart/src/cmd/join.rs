use crate::cmd::{connect_streaming, open_bridge, Context, JoinArgs};
use crate::exit::{join_error, CliResult, SUCCESS};

pub async fn run(_args: JoinArgs, ctx: Context) -> CliResult<i32> {
    let bridge = open_bridge(&ctx)?;
    let _downlinks = connect_streaming(&bridge)?;

    bridge
        .join()
        .await
        .map_err(|err| join_error("join failed", err))?;
    println!("joined");

    bridge.disconnect();
    Ok(SUCCESS)
}
