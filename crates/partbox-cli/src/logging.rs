use crate::error::Result;
use std::fs::{self, File};
use std::path::Path;
use tracing_subscriber::{Layer, Registry, filter::LevelFilter, fmt, prelude::*};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console level for a `-v` count, or `OFF` with `--quiet`.
pub fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn console_layer(level: LevelFilter) -> BoxedLayer {
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(level)
        .boxed()
}

/// Plain-text layer writing to `path`, creating missing parent directories.
fn file_layer(path: &Path, level: LevelFilter) -> Result<BoxedLayer> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    Ok(fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_target(true)
        .with_filter(level)
        .boxed())
}

/// Installs the global subscriber.
///
/// `--quiet` silences the console only; a log file still records events at
/// the level chosen by `-v`.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let mut layers = vec![console_layer(level_for(verbosity, quiet))];
    if let Some(path) = log_file {
        layers.push(file_layer(path, level_for(verbosity, false))?);
    }
    tracing_subscriber::registry().with(layers).init();
    Ok(())
}
