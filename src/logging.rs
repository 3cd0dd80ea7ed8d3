use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, SimError};

/// Install the stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise the filter comes from the `-v` count
/// (`warn`, `info`, then `debug`).
pub fn init(verbosity: u8) -> Result<()> {
    let fallback = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_names(true),
        )
        .try_init()
        .map_err(|e| SimError::Config(format!("failed to initialize tracing: {e}")))
}
