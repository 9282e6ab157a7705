//! Logging bootstrap.
//!
//! Logs always go to stderr: stdout is reserved for the completion line and
//! command output.

use anyhow::anyhow;
use mongoseed_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG` when set, otherwise from settings.
pub fn build_filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => Ok(EnvFilter::try_new(directives)?),
        _ => EnvFilter::try_new(&settings.filter)
            .map_err(|err| anyhow!("invalid telemetry.filter '{}': {}", settings.filter, err)),
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = build_filter(settings)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(format = ?settings.log_format, "telemetry initialized");
    }

    Ok(())
}
