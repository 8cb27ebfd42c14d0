//! Logging setup.
//!
//! Records go to the systemd journal when one is reachable; otherwise a
//! daily rolling file receives them. `PHOTOCAT_LOG` selects the level
//! (trace, debug, info, warn, error), defaulting to `info`.

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    #[cfg(target_os = "linux")]
    if let Ok(journal) = tracing_journald::layer() {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        tracing_subscriber::registry()
            .with(level_filter())
            .with(journal)
            .init();
        return Ok(());
    }

    init_file(log_dir)
}

fn level_filter() -> EnvFilter {
    EnvFilter::try_from_env("PHOTOCAT_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_file(log_dir: Option<PathBuf>) -> Result<()> {
    let dir = log_dir
        .or_else(|| dirs::state_dir().map(|d| d.join("photocat")))
        .or_else(|| dirs::data_local_dir().map(|d| d.join("photocat").join("logs")))
        .unwrap_or_else(std::env::temp_dir);

    std::fs::create_dir_all(&dir)?;

    let appender = tracing_appender::rolling::daily(&dir, "photocat.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // The writer thread must run for the rest of the process; dropping the
    // guard would lose buffered records on exit.
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(level_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(())
}
