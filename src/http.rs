//! HTTP client utilities
//!
//! Provides a reqwest::Client configured with a timeout and system proxy
//! support (HTTP_PROXY / HTTPS_PROXY / ALL_PROXY / NO_PROXY env vars).

use reqwest::{Client, Proxy};
use std::time::Duration;
use url::Url;

/// Build a reqwest Client with the given timeout, honoring proxy env vars
pub fn client_with_timeout(timeout: Duration) -> Client {
    let mut builder = Client::builder().timeout(timeout);

    let https_proxy = env_any(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]);
    let http_proxy = env_any(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]);

    if https_proxy.is_some() || http_proxy.is_some() {
        let bypass = env_any(&["NO_PROXY", "no_proxy"]).unwrap_or_default();
        let bypass: Vec<String> = bypass
            .split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let proxy = Proxy::custom(move |url: &Url| {
            let host = url.host_str().unwrap_or("");
            if bypass_proxy(host, &bypass) {
                return None;
            }
            match url.scheme() {
                "https" => https_proxy.clone().or_else(|| http_proxy.clone()),
                "http" => http_proxy.clone().or_else(|| https_proxy.clone()),
                _ => None,
            }
        });
        builder = builder.proxy(proxy);
    }

    builder
        .user_agent(concat!("skywrite/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to create HTTP client")
}

fn env_any(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| std::env::var(k).ok())
        .find(|v| !v.trim().is_empty())
}

fn bypass_proxy(host: &str, rules: &[String]) -> bool {
    if host.is_empty() {
        return false;
    }
    let host = host.to_ascii_lowercase();
    rules.iter().any(|rule| {
        rule == "*"
            || host == rule.trim_start_matches('.')
            || host.ends_with(&format!(".{}", rule.trim_start_matches('.')))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bypass_wildcard() {
        assert!(bypass_proxy("bsky.social", &["*".to_string()]));
    }

    #[test]
    fn test_bypass_domain_suffix() {
        let rules = vec![".bsky.social".to_string()];
        assert!(bypass_proxy("bsky.social", &rules));
        assert!(bypass_proxy("api.bsky.social", &rules));
        assert!(!bypass_proxy("bsky.app", &rules));
    }

    #[test]
    fn test_no_bypass_without_rules() {
        assert!(!bypass_proxy("bsky.social", &[]));
    }
}
