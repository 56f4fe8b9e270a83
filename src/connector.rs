//! Trait definition for pluggable image provider connectors.
//!
//! Each provider (Unsplash, Pexels, Pixabay, Openverse, Wikimedia Commons)
//! implements [`ImageConnector`] to translate its own search API into the
//! common [`Candidate`] shape.

use async_trait::async_trait;

use crate::error::SearchError;
use crate::types::{Candidate, Provider};

/// A pluggable image search backend.
///
/// Implementors are responsible for:
///
/// - building the provider request (query encoding, auth, page size, filters)
/// - parsing the provider-specific JSON response
/// - mapping each record to a [`Candidate`], deriving `license.kind` from
///   whatever license signal the provider exposes
/// - dropping records with neither an image nor a thumbnail URL
///
/// A connector without credentials returns `Ok(vec![])`. Any other failure is
/// returned as an error; the aggregator isolates it from the other connectors.
#[async_trait]
pub trait ImageConnector: Send + Sync {
    /// Search the provider for `query` and return normalised candidates.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the request fails, the provider answers with
    /// a non-success status, or the payload cannot be parsed.
    async fn fetch(&self, query: &str) -> Result<Vec<Candidate>, SearchError>;

    /// Which provider this connector represents.
    fn provider(&self) -> Provider;

    /// Source prior used by the scorer. Delegates to [`Provider::prior`].
    fn prior(&self) -> f64 {
        self.provider().prior()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct StaticConnector {
        provider: Provider,
        candidates: Vec<Candidate>,
    }

    #[async_trait]
    impl ImageConnector for StaticConnector {
        async fn fetch(&self, _query: &str) -> Result<Vec<Candidate>, SearchError> {
            if self.candidates.is_empty() {
                return Err(SearchError::Http("mock connector failure".into()));
            }
            Ok(self.candidates.clone())
        }

        fn provider(&self) -> Provider {
            self.provider
        }
    }

    #[tokio::test]
    async fn trait_objects_can_be_registered_and_called() {
        let mut c = Candidate::new(Provider::Pexels, 1);
        c.image_url = Some("https://images.pexels.com/1.jpg".into());

        let connectors: Vec<Arc<dyn ImageConnector>> = vec![
            Arc::new(StaticConnector {
                provider: Provider::Pexels,
                candidates: vec![c],
            }),
            Arc::new(StaticConnector {
                provider: Provider::Unsplash,
                candidates: vec![],
            }),
        ];

        let ok = connectors[0].fetch("paris").await.expect("should succeed");
        assert_eq!(ok.len(), 1);
        let err = connectors[1].fetch("paris").await.unwrap_err();
        assert!(err.to_string().contains("mock connector failure"));
    }

    #[test]
    fn default_prior_delegates_to_provider() {
        let connector = StaticConnector {
            provider: Provider::Pixabay,
            candidates: vec![],
        };
        assert!((connector.prior() - Provider::Pixabay.prior()).abs() < f64::EPSILON);
    }
}
