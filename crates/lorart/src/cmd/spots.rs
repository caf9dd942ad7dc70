use crate::cmd::{load_spot_map, Context, SpotsArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::print_spots;

pub fn run(args: SpotsArgs, ctx: Context) -> CliResult<i32> {
    let map = load_spot_map(&args.poi)?;
    print_spots(&map, ctx.format);
    Ok(SUCCESS)
}
