pub mod check;
pub mod constants;
pub mod export;

use crate::cli::InputArgs;
use crate::error::{CliError, Result};
use anyhow::Context;
use partbox::workflows::setup::{self, SetupReport};
use tracing::debug;

/// Builds or restores the configuration named by the input arguments.
pub(crate) fn load(input: &InputArgs) -> Result<SetupReport> {
    debug!(
        "Loading {} '{}'",
        if input.from_snapshot { "snapshot" } else { "setup" },
        input.input.display()
    );
    let report = if input.from_snapshot {
        setup::restore(&input.input).context("snapshot could not be restored")
    } else {
        setup::run(&input.input).context("setup could not be built")
    };
    report.map_err(|source| CliError::FileParsing {
        path: input.input.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_failure_names_the_input_and_the_cause() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = load(&InputArgs {
            input: path.clone(),
            from_snapshot: false,
        })
        .unwrap_err();
        match &err {
            CliError::FileParsing { path: reported, .. } => assert_eq!(reported, &path),
            other => panic!("unexpected error: {other:?}"),
        }
        let message = err.to_string();
        assert!(message.contains("missing.toml"));
        assert!(message.contains("setup could not be built"));
    }

    #[test]
    fn load_failure_on_snapshot_mentions_restore() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.toml");
        fs::write(&path, "wrap = \"yes\"\n").unwrap();
        let err = load(&InputArgs {
            input: path,
            from_snapshot: true,
        })
        .unwrap_err();
        assert!(matches!(err, CliError::FileParsing { .. }));
        assert!(err.to_string().contains("snapshot could not be restored"));
    }
}
