use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::BotError;

/// Install the global subscriber.
///
/// The terminal layer writes to stderr at `default_level` (or `debug` with
/// `verbose`); `RUST_LOG` overrides both. The optional file layer always
/// captures `pvebot=debug` without ANSI colors.
pub fn init(default_level: &str, verbose: bool, log_file: Option<&Path>) -> Result<(), BotError> {
    let terminal_filter = if verbose {
        EnvFilter::new("pvebot=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("pvebot={default_level}")))
    };

    let terminal_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(terminal_filter);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).map_err(|source| BotError::Io {
                    context: format!("creating log directory {}", parent.display()),
                    source,
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| BotError::Io {
                    context: format!("opening log file {}", path.display()),
                    source,
                })?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new("pvebot=debug")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(terminal_layer)
        .with(file_layer)
        .init();

    Ok(())
}
