use super::load;
use crate::cli::CheckArgs;
use crate::error::Result;
use tracing::info;

pub fn run(args: CheckArgs) -> Result<()> {
    let report = load(&args.input)?;
    info!("Consistency audit passed for '{}'", args.input.input.display());
    print!("{}", report.summary);
    Ok(())
}
