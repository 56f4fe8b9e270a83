//! Pexels connector: curated stock photography.
//!
//! Calls `GET /v1/search` with the API key in the `Authorization` header, or,
//! when a proxy is configured, calls the proxy with the same query parameters
//! and no credentials. The proxy returns the raw Pexels JSON unchanged, so
//! parsing is identical on both routes.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{usable_key, SearchConfig};
use crate::connector::ImageConnector;
use crate::error::SearchError;
use crate::http;
use crate::types::{Candidate, License, Provider};

/// Pexels caps `per_page` at 80.
const MAX_PER_PAGE: u32 = 80;
const LICENSE_NAME: &str = "Pexels License";
const LICENSE_URL: &str = "https://www.pexels.com/license/";

/// How the connector reaches Pexels.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    /// Direct API call with our own key.
    Direct { base_url: String, api_key: String },
    /// Same-origin proxy that injects the key itself.
    Proxy { url: String },
    /// No key and no proxy: the connector yields nothing.
    Disabled,
}

/// Pexels search API connector.
pub struct PexelsConnector {
    client: reqwest::Client,
    route: Route,
    per_page: u32,
}

impl PexelsConnector {
    /// Build the connector. A configured proxy takes precedence over a key.
    pub fn new(client: reqwest::Client, config: &SearchConfig) -> Self {
        let api_key = config.api_keys.pexels.as_deref().and_then(usable_key);
        let route = match (&config.pexels_proxy_url, api_key) {
            (Some(url), _) => Route::Proxy { url: url.clone() },
            (None, Some(api_key)) => Route::Direct {
                base_url: config.endpoints.pexels.clone(),
                api_key,
            },
            (None, None) => Route::Disabled,
        };
        Self {
            client,
            route,
            per_page: config.per_page.min(MAX_PER_PAGE),
        }
    }
}

#[async_trait]
impl ImageConnector for PexelsConnector {
    async fn fetch(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        let per_page = self.per_page.to_string();
        let params = [("query", query), ("per_page", per_page.as_str())];

        let request = match &self.route {
            Route::Disabled => {
                tracing::debug!("Pexels API key not configured; skipping");
                return Ok(Vec::new());
            }
            Route::Proxy { url } => {
                tracing::trace!(query, "Pexels search via proxy");
                self.client.get(url).query(&params)
            }
            Route::Direct { base_url, api_key } => {
                tracing::trace!(query, "Pexels search");
                self.client
                    .get(http::endpoint(base_url, "v1/search"))
                    .query(&params)
                    .header("Authorization", api_key)
            }
        };

        let body = http::get_text(request, Provider::Pexels).await?;
        parse_pexels_json(&body)
    }

    fn provider(&self) -> Provider {
        Provider::Pexels
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: u64,
    width: Option<u32>,
    height: Option<u32>,
    url: Option<String>,
    alt: Option<String>,
    #[serde(default)]
    src: PhotoSources,
}

#[derive(Debug, Default, Deserialize)]
struct PhotoSources {
    original: Option<String>,
    large2x: Option<String>,
    large: Option<String>,
    medium: Option<String>,
    small: Option<String>,
}

/// Parse a Pexels search response into candidates.
pub(crate) fn parse_pexels_json(json: &str) -> Result<Vec<Candidate>, SearchError> {
    let response: SearchResponse = http::decode_json(json, Provider::Pexels)?;

    let candidates: Vec<Candidate> = response
        .photos
        .into_iter()
        .map(|photo| {
            let mut c =
                Candidate::new(Provider::Pexels, photo.id).with_dimensions(photo.width, photo.height);
            c.title = photo.alt.filter(|alt| !alt.trim().is_empty());
            c.image_url = photo.src.large2x.or(photo.src.large).or(photo.src.original);
            c.thumbnail_url = photo.src.medium.or(photo.src.small);
            c.page_url = photo.url;
            c.license = License::new(LICENSE_NAME, Some(LICENSE_URL.into()));
            c
        })
        .filter(Candidate::has_image)
        .collect();

    tracing::debug!(count = candidates.len(), "Pexels results parsed");
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKeys;

    const FIXTURE: &str = include_str!("../../test-data/pexels.json");

    fn connector(config: &SearchConfig) -> PexelsConnector {
        let client = http::build_client(config).expect("client");
        PexelsConnector::new(client, config)
    }

    #[test]
    fn fixture_maps_photos() {
        let candidates = parse_pexels_json(FIXTURE).expect("fixture should parse");
        assert_eq!(candidates.len(), 2);

        let first = &candidates[0];
        assert_eq!(first.id, "pexels:338515");
        assert_eq!(first.title.as_deref(), Some("Eiffel Tower, Paris"));
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://images.pexels.com/photos/338515/pexels-photo-338515.jpeg?h=650&w=940&dpr=2")
        );
        assert_eq!(
            first.thumbnail_url.as_deref(),
            Some("https://images.pexels.com/photos/338515/pexels-photo-338515.jpeg?h=350")
        );
        assert_eq!(
            first.page_url.as_deref(),
            Some("https://www.pexels.com/photo/eiffel-tower-paris-338515/")
        );
        assert_eq!(first.license.kind, "Pexels License");
        assert_eq!((first.width, first.height), (Some(3264), Some(4896)));
    }

    #[test]
    fn empty_alt_has_no_title_and_original_is_fallback() {
        let candidates = parse_pexels_json(FIXTURE).expect("fixture should parse");
        let second = &candidates[1];
        assert_eq!(second.title, None);
        assert_eq!(
            second.image_url.as_deref(),
            Some("https://images.pexels.com/photos/2363/france-landmark-lights-night.jpg")
        );
    }

    #[test]
    fn drops_photos_without_sources() {
        let candidates = parse_pexels_json(FIXTURE).expect("fixture should parse");
        assert!(candidates.iter().all(|c| c.id != "pexels:999"));
    }

    #[test]
    fn malformed_payload_is_parse_error() {
        let err = parse_pexels_json(r#"{"error":"Unauthorized"}"#).unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[test]
    fn route_selection() {
        let disabled = connector(&SearchConfig::default());
        assert_eq!(disabled.route, Route::Disabled);

        let direct = connector(&SearchConfig {
            api_keys: ApiKeys {
                pexels: Some("k".into()),
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(matches!(direct.route, Route::Direct { .. }));

        let blank = connector(&SearchConfig {
            api_keys: ApiKeys {
                pexels: Some("  ".into()),
                ..Default::default()
            },
            ..Default::default()
        });
        assert_eq!(blank.route, Route::Disabled);

        let proxied = connector(&SearchConfig {
            api_keys: ApiKeys {
                pexels: Some("k".into()),
                ..Default::default()
            },
            pexels_proxy_url: Some("http://localhost:3000/api/pexels".into()),
            ..Default::default()
        });
        assert_eq!(
            proxied.route,
            Route::Proxy {
                url: "http://localhost:3000/api/pexels".into()
            }
        );
    }

    #[tokio::test]
    async fn missing_key_returns_empty() {
        let candidates = connector(&SearchConfig::default())
            .fetch("paris")
            .await
            .expect("no error");
        assert!(candidates.is_empty());
    }
}
