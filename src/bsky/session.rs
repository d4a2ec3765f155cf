//! Authenticated Bluesky session
//!
//! One session is created at startup with `com.atproto.server.createSession`
//! and shared read-only by every adapter call for the process lifetime. A
//! failed login is a fatal configuration error, not a per-call error.

use crate::config::Config;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Session data from com.atproto.server.createSession
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Access JWT token
    pub access_jwt: String,

    /// Refresh JWT token
    pub refresh_jwt: String,

    /// User's handle
    pub handle: String,

    /// User's DID
    pub did: String,

    /// Service URL
    pub service: String,
}

/// Response from com.atproto.server.createSession
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    access_jwt: String,
    refresh_jwt: String,
    handle: String,
    did: String,
}

impl Session {
    /// Authenticate with identifier + app password
    pub async fn login(client: &reqwest::Client, config: &Config) -> Result<Self, ConfigError> {
        let url = format!("{}/xrpc/com.atproto.server.createSession", config.service);

        let body = serde_json::json!({
            "identifier": config.identifier,
            "password": config.app_password,
        });

        let response = client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConfigError::LoginFailed(format!("login request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ConfigError::LoginFailed(format!(
                "createSession returned status {}: {}",
                status, error_text
            )));
        }

        let session: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| ConfigError::LoginFailed(format!("invalid session response: {}", e)))?;

        Ok(Session {
            access_jwt: session.access_jwt,
            refresh_jwt: session.refresh_jwt,
            handle: session.handle,
            did: session.did,
            service: config.service.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_serialization_roundtrip() {
        let session = Session {
            access_jwt: "access".to_string(),
            refresh_jwt: "refresh".to_string(),
            handle: "test.bsky.social".to_string(),
            did: "did:plc:test".to_string(),
            service: "https://bsky.social".to_string(),
        };

        let json = serde_json::to_string(&session).unwrap();
        let deserialized: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(session.handle, deserialized.handle);
        assert_eq!(session.did, deserialized.did);
    }

    #[test]
    fn test_create_session_response_camel_case() {
        let json = serde_json::json!({
            "accessJwt": "a",
            "refreshJwt": "r",
            "handle": "alice.bsky.social",
            "did": "did:plc:abc",
        });
        let parsed: CreateSessionResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.handle, "alice.bsky.social");
        assert_eq!(parsed.access_jwt, "a");
    }
}
