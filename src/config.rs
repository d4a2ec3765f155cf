//! Process configuration
//!
//! Credentials come from the environment. A missing credential is the single
//! fatal misconfiguration path: the process reports it and exits before
//! serving any call.

use crate::error::ConfigError;

pub const DEFAULT_SERVICE: &str = "https://bsky.social";

const IDENTIFIER_VAR: &str = "BLUESKY_IDENTIFIER";
const APP_PASSWORD_VAR: &str = "BLUESKY_APP_PASSWORD";
const SERVICE_VAR: &str = "BLUESKY_SERVICE";

/// Startup configuration for the single authenticated account
#[derive(Debug, Clone)]
pub struct Config {
    /// Handle (alice.bsky.social) or DID used as the login identifier
    pub identifier: String,
    /// App password for the account
    pub app_password: String,
    /// PDS service URL
    pub service: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let identifier = require_var(IDENTIFIER_VAR)?;
        let app_password = require_var(APP_PASSWORD_VAR)?;
        let service = std::env::var(SERVICE_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE.to_string());

        Ok(Self {
            identifier,
            app_password,
            service,
        })
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_identifier_is_fatal() {
        // Env-var backed, so keep the variables unset for this test run
        std::env::remove_var(IDENTIFIER_VAR);
        std::env::remove_var(APP_PASSWORD_VAR);

        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::MissingVar(_))));
    }
}
