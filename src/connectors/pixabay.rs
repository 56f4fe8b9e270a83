//! Pixabay connector: large free stock library with loose tagging.
//!
//! Pixabay authenticates with a `key` query parameter, so request URLs must
//! never reach logs or error messages. [`crate::http::get_text`] strips them.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{usable_key, SearchConfig};
use crate::connector::ImageConnector;
use crate::error::SearchError;
use crate::http;
use crate::types::{Candidate, License, Provider};

/// Pixabay rejects `per_page` outside 3..=200.
const MIN_PER_PAGE: u32 = 3;
const MAX_PER_PAGE: u32 = 200;
const LICENSE_NAME: &str = "Pixabay Content License";
const LICENSE_URL: &str = "https://pixabay.com/service/license-summary/";

/// Pixabay image search connector.
pub struct PixabayConnector {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    per_page: u32,
    safe_search: bool,
}

impl PixabayConnector {
    pub fn new(client: reqwest::Client, config: &SearchConfig) -> Self {
        Self {
            client,
            base_url: config.endpoints.pixabay.clone(),
            api_key: config.api_keys.pixabay.as_deref().and_then(usable_key),
            per_page: config.per_page.clamp(MIN_PER_PAGE, MAX_PER_PAGE),
            safe_search: config.safe_search,
        }
    }
}

#[async_trait]
impl ImageConnector for PixabayConnector {
    async fn fetch(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        let Some(key) = self.api_key.as_deref() else {
            tracing::debug!("Pixabay API key not configured; skipping");
            return Ok(Vec::new());
        };
        tracing::trace!(query, "Pixabay search");

        let per_page = self.per_page.to_string();
        let request = self
            .client
            .get(http::endpoint(&self.base_url, "api/"))
            .query(&[
                ("key", key),
                ("q", query),
                ("image_type", "photo"),
                ("per_page", per_page.as_str()),
                ("safesearch", if self.safe_search { "true" } else { "false" }),
            ]);

        let body = http::get_text(request, Provider::Pixabay).await?;
        parse_pixabay_json(&body)
    }

    fn provider(&self) -> Provider {
        Provider::Pixabay
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Hit {
    id: u64,
    #[serde(rename = "pageURL")]
    page_url: Option<String>,
    tags: Option<String>,
    #[serde(rename = "previewURL")]
    preview_url: Option<String>,
    #[serde(rename = "webformatURL")]
    webformat_url: Option<String>,
    #[serde(rename = "largeImageURL")]
    large_image_url: Option<String>,
    image_width: Option<u32>,
    image_height: Option<u32>,
}

/// Parse a Pixabay search response into candidates.
///
/// Pixabay has no titles; the comma-separated tag list stands in for one.
pub(crate) fn parse_pixabay_json(json: &str) -> Result<Vec<Candidate>, SearchError> {
    let response: SearchResponse = http::decode_json(json, Provider::Pixabay)?;

    let candidates: Vec<Candidate> = response
        .hits
        .into_iter()
        .map(|hit| {
            let mut c = Candidate::new(Provider::Pixabay, hit.id)
                .with_dimensions(hit.image_width, hit.image_height);
            c.title = hit.tags.filter(|t| !t.trim().is_empty());
            c.image_url = hit.large_image_url.or(hit.webformat_url.clone());
            c.thumbnail_url = hit.webformat_url.or(hit.preview_url);
            c.page_url = hit.page_url;
            c.license = License::new(LICENSE_NAME, Some(LICENSE_URL.into()));
            c
        })
        .filter(Candidate::has_image)
        .collect();

    tracing::debug!(count = candidates.len(), "Pixabay results parsed");
    Ok(candidates)
}
