//! Logging init for the server process. Config-driven rather than
//! clap-flag-driven (the CLI binaries in this workspace use
//! `tsdb-cli-common`'s flag-based setup instead): `[logging] level`
//! seeds a `tracing_subscriber::EnvFilter`, overridable by `RUST_LOG`,
//! and `[logging] file` redirects output from stderr to a file. The
//! timer/span-event choices mirror `tsdb-cli-common::init_logging`.

use crate::config::LoggingSettings;
use std::fs::OpenOptions;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

pub fn init(settings: &LoggingSettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(true);

    if settings.file.is_empty() {
        builder.with_writer(std::io::stderr).init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&settings.file)?;
        builder.with_ansi(false).with_writer(move || {
            file.try_clone().expect("log file handle is clonable")
        }).init();
    }

    Ok(())
}
