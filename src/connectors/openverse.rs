//! Openverse connector: openly licensed media aggregated from many sources.
//!
//! No authentication is needed for anonymous search. Openverse reports a
//! license short code (`by-sa`, `cc0`, `pdm`) and a version, which are
//! rendered into a human-readable kind such as `CC BY-SA 2.0`.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SearchConfig;
use crate::connector::ImageConnector;
use crate::error::SearchError;
use crate::http;
use crate::types::{Candidate, License, Provider};

/// Anonymous Openverse requests are capped at 20 results per page.
const MAX_PAGE_SIZE: u32 = 20;

/// Openverse image search connector.
pub struct OpenverseConnector {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
    safe_search: bool,
}

impl OpenverseConnector {
    pub fn new(client: reqwest::Client, config: &SearchConfig) -> Self {
        Self {
            client,
            base_url: config.endpoints.openverse.clone(),
            page_size: config.per_page.min(MAX_PAGE_SIZE),
            safe_search: config.safe_search,
        }
    }
}

#[async_trait]
impl ImageConnector for OpenverseConnector {
    async fn fetch(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        tracing::trace!(query, "Openverse search");

        let page_size = self.page_size.to_string();
        let request = self
            .client
            .get(http::endpoint(&self.base_url, "v1/images/"))
            .query(&[
                ("q", query),
                ("page_size", page_size.as_str()),
                ("mature", if self.safe_search { "false" } else { "true" }),
            ]);

        let body = http::get_text(request, Provider::Openverse).await?;
        parse_openverse_json(&body)
    }

    fn provider(&self) -> Provider {
        Provider::Openverse
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    id: String,
    title: Option<String>,
    url: Option<String>,
    thumbnail: Option<String>,
    foreign_landing_url: Option<String>,
    license: Option<String>,
    license_version: Option<String>,
    license_url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Render an Openverse license code and version as a display name.
///
/// `cc0` becomes `CC0 1.0`, `pdm` becomes `Public Domain Mark 1.0`, and the
/// attribution family becomes `CC BY-SA 2.0` and friends.
fn license_kind(code: &str, version: Option<&str>) -> String {
    let code = code.trim().to_lowercase();
    let version = version.map(str::trim).filter(|v| !v.is_empty());
    let name = match code.as_str() {
        "cc0" => "CC0".to_string(),
        "pdm" => "Public Domain Mark".to_string(),
        other => format!("CC {}", other.to_uppercase()),
    };
    match version {
        Some(v) => format!("{name} {v}"),
        None if matches!(code.as_str(), "cc0" | "pdm") => format!("{name} 1.0"),
        None => name,
    }
}

/// Parse an Openverse search response into candidates.
pub(crate) fn parse_openverse_json(json: &str) -> Result<Vec<Candidate>, SearchError> {
    let response: SearchResponse = http::decode_json(json, Provider::Openverse)?;

    let candidates: Vec<Candidate> = response
        .results
        .into_iter()
        .map(|image| {
            let mut c = Candidate::new(Provider::Openverse, &image.id)
                .with_dimensions(image.width, image.height);
            c.title = image.title.filter(|t| !t.trim().is_empty());
            c.image_url = image.url;
            c.thumbnail_url = image.thumbnail;
            c.page_url = image.foreign_landing_url;
            c.license = match image.license.as_deref().filter(|l| !l.trim().is_empty()) {
                Some(code) => License::new(
                    license_kind(code, image.license_version.as_deref()),
                    image.license_url,
                ),
                None => License::unknown(),
            };
            c
        })
        .filter(Candidate::has_image)
        .collect();

    tracing::debug!(count = candidates.len(), "Openverse results parsed");
    Ok(candidates)
}
