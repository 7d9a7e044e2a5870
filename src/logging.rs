use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "ROOTCAT_LOG";

/// Install the stderr subscriber.
///
/// `-v` selects `info`, `-vv` and above select `debug`; without it the
/// filter comes from `ROOTCAT_LOG`, falling back to `warn`.
pub fn init_logger(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}
