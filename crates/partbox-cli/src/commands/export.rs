use super::load;
use crate::cli::ExportArgs;
use crate::error::{CliError, Result};
use tracing::info;

pub fn run(args: ExportArgs) -> Result<()> {
    if args.snapshot.is_none() && args.frame.is_none() {
        return Err(CliError::Argument(
            "nothing to export, pass --snapshot and/or --frame".to_string(),
        ));
    }
    let report = load(&args.input)?;
    if let Some(path) = &args.snapshot {
        report.configuration.save_snapshot(path)?;
        info!("Wrote snapshot to '{}'", path.display());
    }
    if let Some(path) = &args.frame {
        report.configuration.write_frame(path)?;
        info!("Wrote frame to '{}'", path.display());
    }
    Ok(())
}
