//! Log setup shared by the command line tools.

use std::{fs::OpenOptions, io, path::Path, sync::Arc};

use tracing_subscriber::{
    EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Install the global tracing subscriber.
///
/// Events are pretty printed to stdout, filtered by `RUST_LOG` and defaulting
/// to `info`. If `log_file` is given, debug level events are also appended to
/// that file.
///
/// # Errors
///
/// Returns an error if `log_file` cannot be opened for appending.
pub fn setup_logging(log_file: Option<&Path>) -> Result<(), io::Error> {
    let stdout_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(stdout_filter);

    let debug_log = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;

            Some(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(filter::LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    // Ignore the error raised when a subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(stdout_log)
        .with(debug_log)
        .try_init();

    Ok(())
}
