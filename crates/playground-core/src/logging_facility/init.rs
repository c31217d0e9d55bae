//! Logging initialization module

use std::str::FromStr;
use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Directives used when `RUST_LOG` is unset
const DEV_FILTER: &str = "playground=debug,jsonnet_playground=debug,tower_http=debug";
const PROD_FILTER: &str = "playground=info,jsonnet_playground=info,tower_http=info";

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output for development
    Development,
    /// JSON structured output for production
    Production,
    /// Test capture mode for deterministic testing
    Test,
}

impl FromStr for Profile {
    type Err = String;

    /// Accepts the `LOG_FORMAT` values `text` and `json`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "dev" | "development" => Ok(Self::Development),
            "json" | "prod" | "production" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(format!(
                "unknown log format '{}', expected 'json' or 'text'",
                other
            )),
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility
///
/// Only the first call has an effect.
///
/// # Profiles
///
/// - **Development**: Human-readable logs with debug level
/// - **Production**: JSON structured logs with info level
/// - **Test**: Bare registry; tests install capture via `init_test_capture`
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let result = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEV_FILTER)),
                )
                .finish()
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_current_span(true)
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new(PROD_FILTER)),
                )
                .finish()
                .try_init(),
            Profile::Test => tracing_subscriber::registry().try_init(),
        };
        // A subscriber installed earlier (e.g. by test capture) wins
        let _ = result;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        init(Profile::Test);
        init(Profile::Test);
        init(Profile::Test);
    }

    #[test]
    fn test_profile_from_log_format() {
        assert_eq!("json".parse::<Profile>(), Ok(Profile::Production));
        assert_eq!("TEXT".parse::<Profile>(), Ok(Profile::Development));
        assert!("yaml".parse::<Profile>().is_err());
    }
}
