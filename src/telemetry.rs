//! Tracing initialization for embedding binaries
//!
//! The library itself only emits `tracing` events; a service that embeds
//! the bus calls [`init`] once at startup (or installs its own subscriber
//! and skips this entirely).

use crate::error::BusError;

/// Install a JSON tracing subscriber filtered by `log_level`
///
/// `log_level` applies to this crate; the NATS client is pinned to `warn`
/// to keep reconnect chatter out of production logs. Safe to call when a
/// subscriber is already installed (the second install is a no-op).
pub fn init(log_level: &str) -> Result<(), BusError> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(
            format!("arrakis_bus={log_level}")
                .parse()
                .map_err(|e| BusError::Config(format!("invalid log level '{log_level}': {e}")))?,
        )
        .add_directive(
            "async_nats=warn"
                .parse()
                .map_err(|e| BusError::Config(format!("invalid directive: {e}")))?,
        );

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .try_init();

    Ok(())
}
