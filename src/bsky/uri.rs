//! AT URI parsing and manipulation
//!
//! Tools accept post references as at:// URIs or https://bsky.app URLs; this
//! module normalizes both forms into {repo, collection, rkey} parts.

use crate::error::AppError;

/// Parsed at:// URI or bsky.app URL pointing at a record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRef {
    /// Repository: a DID, or a handle still needing resolution
    pub repo: String,
    pub collection: String,
    pub rkey: String,
}

impl RecordRef {
    /// Parse from at:// URI format: at://did:plc:xyz/app.bsky.feed.post/abc123
    /// or https://bsky.app/profile/handle.bsky.social/post/abc123
    pub fn parse(uri_or_url: &str) -> Result<Self, AppError> {
        let trimmed = uri_or_url.trim();

        if let Some(at_uri) = trimmed.strip_prefix("at://") {
            let parts: Vec<&str> = at_uri.split('/').collect();
            if parts.len() == 3 && parts.iter().all(|p| !p.is_empty()) {
                return Ok(RecordRef {
                    repo: parts[0].to_string(),
                    collection: parts[1].to_string(),
                    rkey: parts[2].to_string(),
                });
            }
            return Err(AppError::InvalidInput(format!(
                "Invalid at:// URI: {}",
                uri_or_url
            )));
        }

        // Web URL form always points at a post
        if let Some(rest) = trimmed.strip_prefix("https://bsky.app/profile/") {
            if let Some((actor, rkey)) = rest.split_once("/post/") {
                let rkey = rkey.split(['/', '?']).next().unwrap_or(rkey);
                if !actor.is_empty() && !rkey.is_empty() {
                    return Ok(RecordRef {
                        repo: actor.to_string(),
                        collection: "app.bsky.feed.post".to_string(),
                        rkey: rkey.to_string(),
                    });
                }
            }
            return Err(AppError::InvalidInput(format!(
                "Invalid bsky.app URL: {}",
                uri_or_url
            )));
        }

        Err(AppError::InvalidInput(format!(
            "Post reference must be an at:// URI or https://bsky.app/... URL: {}",
            uri_or_url
        )))
    }

    /// Check if the repo is a handle that still needs DID resolution
    pub fn needs_resolution(&self) -> bool {
        !self.repo.starts_with("did:")
    }

    /// Reconstruct the canonical at:// URI
    pub fn to_at_uri(&self) -> String {
        format!("at://{}/{}/{}", self.repo, self.collection, self.rkey)
    }
}

/// Convert an at:// URI to a bsky.app web URL, using the handle when known
pub fn at_uri_to_bsky_url(at_uri: &str, handle: &str) -> String {
    let record = match RecordRef::parse(at_uri) {
        Ok(r) => r,
        Err(_) => return at_uri.to_string(),
    };

    let profile = if handle.is_empty() {
        &record.repo
    } else {
        handle
    };

    format!("https://bsky.app/profile/{}/post/{}", profile, record.rkey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_at_uri() {
        let uri = "at://did:plc:abc123/app.bsky.feed.post/xyz789";
        let result = RecordRef::parse(uri).unwrap();
        assert_eq!(result.repo, "did:plc:abc123");
        assert_eq!(result.collection, "app.bsky.feed.post");
        assert_eq!(result.rkey, "xyz789");
        assert!(!result.needs_resolution());
        assert_eq!(result.to_at_uri(), uri);
    }

    #[test]
    fn test_parse_like_uri() {
        let uri = "at://did:plc:abc/app.bsky.feed.like/3kq8a";
        let result = RecordRef::parse(uri).unwrap();
        assert_eq!(result.collection, "app.bsky.feed.like");
    }

    #[test]
    fn test_parse_bsky_url() {
        let url = "https://bsky.app/profile/alice.bsky.social/post/xyz789";
        let result = RecordRef::parse(url).unwrap();
        assert_eq!(result.repo, "alice.bsky.social");
        assert_eq!(result.collection, "app.bsky.feed.post");
        assert_eq!(result.rkey, "xyz789");
        assert!(result.needs_resolution());
    }

    #[test]
    fn test_parse_bsky_url_with_query() {
        let url = "https://bsky.app/profile/did:plc:abc/post/xyz?ref=share";
        let result = RecordRef::parse(url).unwrap();
        assert_eq!(result.repo, "did:plc:abc");
        assert_eq!(result.rkey, "xyz");
        assert!(!result.needs_resolution());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(RecordRef::parse("https://example.com/post/123").is_err());
        assert!(RecordRef::parse("at://invalid").is_err());
        assert!(RecordRef::parse("").is_err());
    }

    #[test]
    fn test_at_uri_to_bsky_url() {
        let uri = "at://did:plc:abc123/app.bsky.feed.post/xyz789";
        assert_eq!(
            at_uri_to_bsky_url(uri, "alice.bsky.social"),
            "https://bsky.app/profile/alice.bsky.social/post/xyz789"
        );
        assert_eq!(
            at_uri_to_bsky_url(uri, ""),
            "https://bsky.app/profile/did:plc:abc123/post/xyz789"
        );
        // Unparseable URIs pass through untouched
        assert_eq!(at_uri_to_bsky_url("nonsense", "alice"), "nonsense");
    }
}
