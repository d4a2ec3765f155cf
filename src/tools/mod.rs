//! MCP tools implementation
//!
//! One module per feature family; each exposes argument structs (which also
//! produce the published input schemas) and the registered handler functions.

pub mod feed;
pub mod list;
pub mod post;
pub mod profile;
pub mod react;
pub mod util;

use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Parse raw call arguments into a typed args struct
///
/// The host is expected to validate against the published schema, but the
/// core does not assume it always does.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, AppError> {
    serde_json::from_value(args)
        .map_err(|e| AppError::InvalidInput(format!("Invalid arguments: {}", e)))
}

/// Clamp a requested page size into the upstream's accepted range
pub(crate) fn clamp_limit(limit: Option<u32>, default: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        value: String,
    }

    #[test]
    fn test_parse_args_reports_invalid_input() {
        let result: Result<Probe, _> = parse_args(serde_json::json!({ "wrong": 1 }));
        match result {
            Err(AppError::InvalidInput(msg)) => assert!(msg.contains("Invalid arguments")),
            other => panic!("expected InvalidInput, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 50), 50);
        assert_eq!(clamp_limit(Some(25), 50), 25);
        assert_eq!(clamp_limit(Some(0), 50), 1);
        assert_eq!(clamp_limit(Some(500), 50), 100);
    }
}
