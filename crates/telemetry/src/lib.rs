//! Tracing bootstrap for SHELF binaries.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

use shelf_kernel::settings::{LogFormat, TelemetrySettings};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Install the global tracing subscriber.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`. Idempotent: repeated
/// calls (tests, embedded use) are no-ops, and losing the race to another
/// subscriber is tolerated.
pub fn init(settings: &TelemetrySettings) {
    INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let builder = tracing_subscriber::fmt().with_env_filter(filter);

        let installed = match settings.log_format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.try_init(),
        };

        if installed.is_ok() {
            tracing::debug!(format = ?settings.log_format, "telemetry initialized");
        }
    });
}
