//! Unsplash connector: curated, high-resolution photography.
//!
//! Uses `GET /search/photos` with a `Client-ID` authorization header.
//! Every Unsplash photo is published under the Unsplash License.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{usable_key, SearchConfig};
use crate::connector::ImageConnector;
use crate::error::SearchError;
use crate::http;
use crate::types::{Candidate, License, Provider};

/// Unsplash caps `per_page` at 30.
const MAX_PER_PAGE: u32 = 30;
const LICENSE_NAME: &str = "Unsplash License";
const LICENSE_URL: &str = "https://unsplash.com/license";

/// Unsplash search API connector.
pub struct UnsplashConnector {
    client: reqwest::Client,
    base_url: String,
    access_key: Option<String>,
    per_page: u32,
    safe_search: bool,
}

impl UnsplashConnector {
    pub fn new(client: reqwest::Client, config: &SearchConfig) -> Self {
        Self {
            client,
            base_url: config.endpoints.unsplash.clone(),
            access_key: config.api_keys.unsplash.as_deref().and_then(usable_key),
            per_page: config.per_page.min(MAX_PER_PAGE),
            safe_search: config.safe_search,
        }
    }
}

#[async_trait]
impl ImageConnector for UnsplashConnector {
    async fn fetch(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        let Some(key) = self.access_key.as_deref() else {
            tracing::debug!("Unsplash access key not configured; skipping");
            return Ok(Vec::new());
        };
        tracing::trace!(query, "Unsplash search");

        let per_page = self.per_page.to_string();
        let content_filter = if self.safe_search { "high" } else { "low" };
        let request = self
            .client
            .get(http::endpoint(&self.base_url, "search/photos"))
            .query(&[
                ("query", query),
                ("per_page", per_page.as_str()),
                ("content_filter", content_filter),
            ])
            .header("Authorization", format!("Client-ID {key}"))
            .header("Accept-Version", "v1");

        let body = http::get_text(request, Provider::Unsplash).await?;
        parse_unsplash_json(&body)
    }

    fn provider(&self) -> Provider {
        Provider::Unsplash
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: String,
    width: Option<u32>,
    height: Option<u32>,
    description: Option<String>,
    alt_description: Option<String>,
    #[serde(default)]
    urls: PhotoUrls,
    #[serde(default)]
    links: PhotoLinks,
}

#[derive(Debug, Default, Deserialize)]
struct PhotoUrls {
    full: Option<String>,
    regular: Option<String>,
    small: Option<String>,
    thumb: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PhotoLinks {
    html: Option<String>,
}

/// Parse an Unsplash search response into candidates.
pub(crate) fn parse_unsplash_json(json: &str) -> Result<Vec<Candidate>, SearchError> {
    let response: SearchResponse = http::decode_json(json, Provider::Unsplash)?;

    let candidates: Vec<Candidate> = response
        .results
        .into_iter()
        .map(|photo| {
            let mut c = Candidate::new(Provider::Unsplash, &photo.id)
                .with_dimensions(photo.width, photo.height);
            c.title = photo
                .description
                .filter(|d| !d.trim().is_empty())
                .or(photo.alt_description);
            c.image_url = photo.urls.regular.or(photo.urls.full);
            c.thumbnail_url = photo.urls.small.or(photo.urls.thumb);
            c.page_url = photo.links.html;
            c.license = License::new(LICENSE_NAME, Some(LICENSE_URL.into()));
            c
        })
        .filter(Candidate::has_image)
        .collect();

    tracing::debug!(count = candidates.len(), "Unsplash results parsed");
    Ok(candidates)
}
