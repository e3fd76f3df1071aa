//! Session-scoped tool catalog.
//!
//! The catalog populates lazily on first access (one index fetch, then one
//! definition fetch per listed tool) and caches the result for the session.
//! Invalidation is explicit via `refresh()`.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use verdin_core::error::{Result, VerdinError};
use verdin_core::traits::ToolSource;
use verdin_core::types::ToolListing;

use crate::descriptor::ToolDescriptor;

pub struct ToolCatalog {
    source: Arc<dyn ToolSource>,
    cache: Mutex<Option<Vec<ToolDescriptor>>>,
}

impl ToolCatalog {
    pub fn new(source: Arc<dyn ToolSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(None),
        }
    }

    /// Current descriptors, fetching on first access.
    ///
    /// A tool whose definition fetch fails is dropped from this session's
    /// catalog; the index fetch itself failing is a transient I/O error.
    pub async fn descriptors(&self) -> Result<Vec<ToolDescriptor>> {
        let mut cache = self.cache.lock().await;
        if let Some(descriptors) = cache.as_ref() {
            return Ok(descriptors.clone());
        }

        let descriptors = self.fetch_all().await?;
        *cache = Some(descriptors.clone());
        Ok(descriptors)
    }

    /// Drop the cached catalog; the next access refetches.
    pub async fn refresh(&self) {
        let mut cache = self.cache.lock().await;
        *cache = None;
    }

    async fn fetch_all(&self) -> Result<Vec<ToolDescriptor>> {
        let listings = self.source.list().await?;
        let mut descriptors = Vec::with_capacity(listings.len());

        for listing in &listings {
            match self.source.fetch_definition(listing).await {
                Ok(definition) => {
                    descriptors.push(ToolDescriptor::new(listing.id.clone(), definition));
                }
                Err(e) => {
                    warn!(
                        tool_id = %listing.id,
                        url = %listing.definition_url,
                        error = %e,
                        "Dropping tool with unreachable definition"
                    );
                }
            }
        }

        info!(
            listed = listings.len(),
            loaded = descriptors.len(),
            "Tool catalog populated"
        );
        Ok(descriptors)
    }
}

#[derive(Deserialize)]
struct ToolIndex {
    tools: Vec<ToolListing>,
}

/// `ToolSource` over HTTP: GET the index, GET each definition document.
pub struct HttpToolSource {
    http: reqwest::Client,
    index_url: String,
}

impl HttpToolSource {
    pub fn new(index_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            index_url: index_url.into(),
        }
    }
}

impl ToolSource for HttpToolSource {
    fn list(&self) -> BoxFuture<'_, Result<Vec<ToolListing>>> {
        Box::pin(async move {
            let index: ToolIndex = self
                .http
                .get(&self.index_url)
                .send()
                .await
                .map_err(|e| VerdinError::Http(e.to_string()))?
                .error_for_status()
                .map_err(|e| VerdinError::Http(e.to_string()))?
                .json()
                .await
                .map_err(|e| VerdinError::Http(e.to_string()))?;
            Ok(index.tools)
        })
    }

    fn fetch_definition(&self, listing: &ToolListing) -> BoxFuture<'_, Result<String>> {
        let url = listing.definition_url.clone();
        Box::pin(async move {
            self.http
                .get(&url)
                .send()
                .await
                .map_err(|e| VerdinError::Http(e.to_string()))?
                .error_for_status()
                .map_err(|e| VerdinError::Http(e.to_string()))?
                .text()
                .await
                .map_err(|e| VerdinError::Http(e.to_string()))
        })
    }
}
