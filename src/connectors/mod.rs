//! Image provider connector implementations.
//!
//! Each module provides a struct implementing [`crate::connector::ImageConnector`]
//! that calls one provider's public search API and maps its JSON into
//! [`crate::types::Candidate`]s.

pub mod openverse;
pub mod pexels;
pub mod pixabay;
pub mod unsplash;
pub mod wikimedia;

use std::sync::Arc;

pub use openverse::OpenverseConnector;
pub use pexels::PexelsConnector;
pub use pixabay::PixabayConnector;
pub use unsplash::UnsplashConnector;
pub use wikimedia::WikimediaConnector;

use crate::config::SearchConfig;
use crate::connector::ImageConnector;
use crate::error::SearchError;
use crate::http;
use crate::types::Provider;

/// Build one connector per provider in `config.providers`, in that order.
///
/// All connectors share a single HTTP client. Duplicate providers are
/// registered once.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the HTTP client cannot be built.
pub fn build_connectors(
    config: &SearchConfig,
) -> Result<Vec<Arc<dyn ImageConnector>>, SearchError> {
    let client = http::build_client(config)?;
    let mut seen = Vec::with_capacity(config.providers.len());
    let mut connectors: Vec<Arc<dyn ImageConnector>> = Vec::new();

    for &provider in &config.providers {
        if seen.contains(&provider) {
            continue;
        }
        seen.push(provider);
        connectors.push(connector_for(provider, client.clone(), config));
    }
    Ok(connectors)
}

fn connector_for(
    provider: Provider,
    client: reqwest::Client,
    config: &SearchConfig,
) -> Arc<dyn ImageConnector> {
    match provider {
        Provider::Unsplash => Arc::new(UnsplashConnector::new(client, config)),
        Provider::Pexels => Arc::new(PexelsConnector::new(client, config)),
        Provider::Pixabay => Arc::new(PixabayConnector::new(client, config)),
        Provider::Openverse => Arc::new(OpenverseConnector::new(client, config)),
        Provider::Wikimedia => Arc::new(WikimediaConnector::new(client, config)),
    }
}
