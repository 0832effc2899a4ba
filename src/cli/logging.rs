//! Tracing setup
//!
//! `RUST_LOG` selects what is logged; `-v` and `-vv` raise the floor to info
//! and debug. Events go to stderr and, for releases, to the build log in the
//! output directory. Step failure details only go to the build log; the
//! console already shows a status line for them.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{Level, Metadata};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::core::step::FAILURE_TARGET;

/// Log level for a `-v` count
pub fn level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

/// Whether an event is shown on the console
fn on_console(meta: &Metadata<'_>) -> bool {
    meta.target() != FAILURE_TARGET
}

/// Install the global subscriber
pub fn init(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(level(verbose).into());

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter_fn(on_console)),
        )
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}
