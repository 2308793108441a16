//! HTTP Client Factory
//!
//! Provides a factory function for building reqwest clients with proxy and
//! timeout settings taken from the provider configuration.

use std::time::Duration;

use crate::types::{LlmError, LlmResult};

/// Build a `reqwest::Client`.
///
/// - `Some(proxy_url)` -> route every request through the proxy
/// - `None` -> explicitly disable proxy (`no_proxy`), ignoring env vars
pub fn build_http_client(
    proxy_url: Option<&str>,
    timeout: Option<Duration>,
) -> LlmResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    match proxy_url {
        Some(url) => {
            let proxy = reqwest::Proxy::all(url).map_err(|e| LlmError::InvalidRequest {
                message: format!("invalid proxy URL '{}': {}", url, e),
            })?;
            builder = builder.proxy(proxy);
        }
        None => {
            builder = builder.no_proxy();
        }
    }
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(|e| LlmError::Other {
        message: format!("failed to build HTTP client: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client_no_proxy() {
        assert!(build_http_client(None, None).is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy_and_timeout() {
        let client = build_http_client(Some("http://127.0.0.1:8080"), Some(Duration::from_secs(30)));
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_http_client_rejects_bad_proxy() {
        let err = build_http_client(Some("not a url"), None).unwrap_err();
        assert!(matches!(err, LlmError::InvalidRequest { .. }));
    }
}
