//! Wikimedia Commons connector.
//!
//! Uses the MediaWiki action API with a search generator restricted to the
//! File namespace (6), asking for image info with a 640px thumbnail and the
//! license fields from `extmetadata`. No key is required.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SearchConfig;
use crate::connector::ImageConnector;
use crate::error::SearchError;
use crate::http;
use crate::types::{Candidate, License, Provider};

/// MediaWiki limits anonymous generator searches to 50 pages.
const MAX_LIMIT: u32 = 50;
const THUMB_WIDTH: &str = "640";

/// Wikimedia Commons file search connector.
pub struct WikimediaConnector {
    client: reqwest::Client,
    base_url: String,
    limit: u32,
}

impl WikimediaConnector {
    pub fn new(client: reqwest::Client, config: &SearchConfig) -> Self {
        Self {
            client,
            base_url: config.endpoints.wikimedia.clone(),
            limit: config.per_page.min(MAX_LIMIT),
        }
    }
}

#[async_trait]
impl ImageConnector for WikimediaConnector {
    async fn fetch(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        tracing::trace!(query, "Wikimedia Commons search");

        let limit = self.limit.to_string();
        let request = self
            .client
            .get(http::endpoint(&self.base_url, "w/api.php"))
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrnamespace", "6"),
                ("gsrlimit", limit.as_str()),
                ("prop", "imageinfo"),
                ("iiprop", "url|size|extmetadata"),
                ("iiurlwidth", THUMB_WIDTH),
                ("iiextmetadatafilter", "LicenseShortName|LicenseUrl|ObjectName"),
            ]);

        let body = http::get_text(request, Provider::Wikimedia).await?;
        parse_wikimedia_json(&body)
    }

    fn provider(&self) -> Provider {
        Provider::Wikimedia
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    query: Option<QueryBlock>,
}

#[derive(Debug, Deserialize)]
struct QueryBlock {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    pageid: Option<u64>,
    title: String,
    index: Option<u32>,
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    url: Option<String>,
    thumburl: Option<String>,
    descriptionurl: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    extmetadata: HashMap<String, MetadataValue>,
}

#[derive(Debug, Deserialize)]
struct MetadataValue {
    value: serde_json::Value,
}

impl ImageInfo {
    fn metadata(&self, key: &str) -> Option<String> {
        let value = &self.extmetadata.get(key)?.value;
        let text = match value {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }
}

/// `File:Eiffel Tower at night.jpg` → `Eiffel Tower at night`.
fn title_from_page(title: &str) -> String {
    let name = title.strip_prefix("File:").unwrap_or(title);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= 5 => stem.to_string(),
        _ => name.to_string(),
    }
}

/// Parse a MediaWiki `formatversion=2` query response into candidates.
///
/// A response without a `query` block means no matches. Pages are returned
/// in search rank order (`index`), not in the order MediaWiki serialises them.
pub(crate) fn parse_wikimedia_json(json: &str) -> Result<Vec<Candidate>, SearchError> {
    let response: ApiResponse = http::decode_json(json, Provider::Wikimedia)?;
    let Some(query) = response.query else {
        tracing::debug!("Wikimedia returned no query block");
        return Ok(Vec::new());
    };

    let mut pages = query.pages;
    pages.sort_by_key(|p| p.index.unwrap_or(u32::MAX));

    let candidates: Vec<Candidate> = pages
        .into_iter()
        .filter_map(|page| {
            let info = page.imageinfo.into_iter().next()?;
            let native_id = page
                .pageid
                .map_or_else(|| page.title.clone(), |id| id.to_string());
            let mut c = Candidate::new(Provider::Wikimedia, native_id)
                .with_dimensions(info.width, info.height);
            c.title = info
                .metadata("ObjectName")
                .or_else(|| Some(title_from_page(&page.title)));
            c.license = match info.metadata("LicenseShortName") {
                Some(kind) => License::new(kind, info.metadata("LicenseUrl")),
                None => License::unknown(),
            };
            c.image_url = info.url;
            c.thumbnail_url = info.thumburl;
            c.page_url = info.descriptionurl;
            Some(c)
        })
        .filter(Candidate::has_image)
        .collect();

    tracing::debug!(count = candidates.len(), "Wikimedia results parsed");
    Ok(candidates)
}
