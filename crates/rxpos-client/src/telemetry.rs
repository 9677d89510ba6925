//! Logging setup for register front ends.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,rxpos=debug";

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set. Calling this twice is harmless; the second
/// call leaves the first subscriber in place.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init_tracing();
        init_tracing();
    }
}
