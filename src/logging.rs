use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::GhgError;

pub const DEFAULT_FILTER: &str = "info";

/// Install a global fmt subscriber. `RUST_LOG` wins over `filter` when set.
///
/// Fails if a subscriber is already installed or the filter does not parse.
pub fn init(filter: Option<&str>) -> Result<(), GhgError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(env) => env,
        Err(_) => EnvFilter::try_new(filter.unwrap_or(DEFAULT_FILTER))
            .map_err(|e| GhgError::InvalidData(format!("Invalid log filter: {}", e)))?,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| GhgError::General(format!("Logging already initialised: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_filter() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let err = init(Some("ghg=verbose")).unwrap_err();
        assert!(err.is_input_error());
    }
}
