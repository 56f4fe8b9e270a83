//! Shared HTTP client and JSON request helper for provider connectors.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::types::Provider;

/// User-Agent sent when the config does not override it.
pub const DEFAULT_USER_AGENT: &str = concat!("cityscope/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] shared by all connectors.
///
/// The client has the configured per-request timeout, a User-Agent, and
/// gzip/brotli decompression.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}

/// Send `request` and return the response body.
///
/// Non-2xx statuses become [`SearchError::Http`] and timeouts become
/// [`SearchError::Timeout`]. Request URLs are stripped from error messages
/// because some providers carry their key in the query string.
pub async fn get_text(
    request: reqwest::RequestBuilder,
    provider: Provider,
) -> Result<String, SearchError> {
    let response = request
        .send()
        .await
        .map_err(|e| request_error(provider, "request failed", e))?
        .error_for_status()
        .map_err(|e| request_error(provider, "HTTP error", e))?;

    let body = response
        .text()
        .await
        .map_err(|e| request_error(provider, "response read failed", e))?;

    tracing::trace!(%provider, bytes = body.len(), "provider response received");
    Ok(body)
}

/// Decode a provider JSON body, mapping failures to [`SearchError::Parse`].
pub fn decode_json<T: DeserializeOwned>(body: &str, provider: Provider) -> Result<T, SearchError> {
    serde_json::from_str(body)
        .map_err(|e| SearchError::Parse(format!("{provider} returned unexpected JSON: {e}")))
}

fn request_error(provider: Provider, what: &str, err: reqwest::Error) -> SearchError {
    let err = err.without_url();
    if err.is_timeout() {
        SearchError::Timeout(format!("{provider} {what}: {err}"))
    } else {
        SearchError::Http(format!("{provider} {what}: {err}"))
    }
}

/// Join a configured base URL and an API path without doubling slashes.
pub fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_client_with_default_config() {
        assert!(build_client(&SearchConfig::default()).is_ok());
    }

    #[test]
    fn build_client_with_custom_ua() {
        let config = SearchConfig {
            user_agent: Some("CityBot/1.0".into()),
            ..Default::default()
        };
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn default_user_agent_names_crate() {
        assert!(DEFAULT_USER_AGENT.starts_with("cityscope/"));
    }

    #[test]
    fn decode_json_maps_errors_to_parse() {
        #[derive(Debug, serde::Deserialize)]
        struct Body {
            #[allow(dead_code)]
            results: Vec<u32>,
        }
        let err = decode_json::<Body>("{\"nope\": 1}", Provider::Openverse).unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
        assert!(err.to_string().contains("Openverse"));
        assert!(decode_json::<Body>("{\"results\": [1, 2]}", Provider::Openverse).is_ok());
    }

    #[test]
    fn endpoint_joins_cleanly() {
        assert_eq!(
            endpoint("https://api.unsplash.com/", "/search/photos"),
            "https://api.unsplash.com/search/photos"
        );
        assert_eq!(
            endpoint("http://127.0.0.1:9000", "v1/search"),
            "http://127.0.0.1:9000/v1/search"
        );
    }
}
