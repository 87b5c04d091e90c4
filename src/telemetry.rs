use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::MwanamamaError;

/// Install a global fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// For binaries embedding the client; libraries should leave subscriber
/// setup to their host.
pub fn init_tracing(default_filter: &str) -> Result<(), MwanamamaError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| MwanamamaError::Config(format!("invalid log filter {default_filter:?}: {e}")))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| MwanamamaError::Config(format!("tracing already initialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error() {
        // Another test may already have installed a subscriber, so only the
        // second call's outcome is certain.
        let _ = init_tracing("mwanamama_client=debug");
        assert!(init_tracing("info").is_err());
    }
}
