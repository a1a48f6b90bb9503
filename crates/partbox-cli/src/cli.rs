use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "partbox - build, audit and export particle configurations for Monte Carlo simulation.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Silence console logging (a --log-file still records warnings)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a configuration, audit its caches and print a summary.
    Check(CheckArgs),
    /// Build a configuration and write it as a snapshot and/or coordinate frame.
    Export(ExportArgs),
    /// List the available physical constant sets, or show one of them.
    Constants(ConstantsArgs),
}

/// Where the configuration comes from.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Path to a TOML setup file (or a snapshot with --from-snapshot).
    #[arg(required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Treat the input as a snapshot written by `export --snapshot`.
    #[arg(long)]
    pub from_snapshot: bool,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

/// Arguments for the `export` subcommand.
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Write a TOML snapshot of the complete configuration.
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Write site coordinates as a CSV frame.
    #[arg(long, value_name = "PATH")]
    pub frame: Option<PathBuf>,
}

/// Arguments for the `constants` subcommand.
#[derive(Args, Debug)]
pub struct ConstantsArgs {
    /// Name of a constant set (e.g., CODATA2018).
    #[arg(value_name = "NAME")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn export_accepts_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "partbox", "export", "setup.toml", "--snapshot", "out.toml", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.input.input, PathBuf::from("setup.toml"));
                assert!(!args.input.from_snapshot);
                assert_eq!(args.snapshot, Some(PathBuf::from("out.toml")));
                assert_eq!(args.frame, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["partbox", "check", "a.toml", "-q", "-v"]).is_err());
    }
}
