//! Object-storage collaborators behind a single `ObjectStore` seam.
//!
//! Listing is page-based so callers can stop enumerating as soon as a result
//! cap is reached instead of materializing whole collections. Prefix filters
//! are passed to the backend, never applied client-side.

pub mod azure_blob;
pub mod gcs;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{resolve_scope, GatewayConfig};
use crate::gateway::{CommandExecutor, Provider};

pub use azure_blob::AzureBlobStore;
pub use gcs::GcsStore;

/// Result cap applied when the caller does not pass `maxResults`.
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Largest page requested from a backend in one call.
pub const MAX_PAGE_SIZE: usize = 1000;

/// A bucket (GCS) or container (Azure Blob).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// An object (GCS) or blob (Azure Blob).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

/// Continuation token plus the number of entries wanted from this page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub token: Option<String>,
    pub size: usize,
}

/// One page of a backend enumeration.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

/// Storage operations exposed as tools. Backends return their own errors;
/// handlers add the operation prefix.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_containers(
        &self,
        prefix: Option<&str>,
        page: PageRequest,
    ) -> crate::Result<Page<ContainerInfo>>;

    async fn list_objects(
        &self,
        container: &str,
        prefix: Option<&str>,
        page: PageRequest,
    ) -> crate::Result<Page<ObjectInfo>>;

    /// Full object content as text (lossy for non-UTF-8 data).
    async fn read_object(&self, container: &str, name: &str) -> crate::Result<String>;

    /// Backend-native metadata document.
    async fn object_metadata(&self, container: &str, name: &str)
        -> crate::Result<serde_json::Value>;
}

/// Produces scoped `ObjectStore` handles. Built once per process and shared
/// by every call.
pub trait StoreFactory: Send + Sync {
    /// Store for `provider`, scoped to a project (GCP) or storage account
    /// (Azure). `None` falls back to the configured default.
    fn store(&self, provider: Provider, scope: Option<&str>) -> crate::Result<Arc<dyn ObjectStore>>;
}

/// Pull pages from `fetch` until `max_results` entries are collected or the
/// backend runs out. No page is requested once the cap is reached, and
/// entries keep backend order.
pub async fn collect_capped<T, F, Fut>(max_results: usize, mut fetch: F) -> crate::Result<Vec<T>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = crate::Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token = None;

    while items.len() < max_results {
        let remaining = max_results - items.len();
        let page = fetch(PageRequest {
            token: token.take(),
            size: remaining.min(MAX_PAGE_SIZE),
        })
        .await?;

        let fetched = page.items.len();
        items.extend(page.items.into_iter().take(remaining));

        match page.next_token {
            // An empty page with a token would loop forever on a misbehaving backend.
            Some(next) if fetched > 0 => token = Some(next),
            _ => break,
        }
    }

    Ok(items)
}

/// The production `StoreFactory`: one shared HTTP client and executor,
/// cheap per-call store handles built from them.
#[derive(Clone)]
pub struct ClientFactory {
    http: reqwest::Client,
    executor: CommandExecutor,
    gcs_endpoint: String,
    default_project: Option<String>,
    default_account: Option<String>,
}

impl ClientFactory {
    pub fn new(config: &GatewayConfig, executor: CommandExecutor) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(executor.policy().timeout)
            .build()
            .map_err(|e| crate::GatewayError::Transport(format!("HTTP client init: {}", e)))?;
        Ok(Self {
            http,
            executor,
            gcs_endpoint: gcs::DEFAULT_ENDPOINT.to_string(),
            default_project: resolve_scope(config.gcp.default_project.as_deref()),
            default_account: resolve_scope(config.azure.storage_account.as_deref()),
        })
    }
}

impl StoreFactory for ClientFactory {
    fn store(&self, provider: Provider, scope: Option<&str>) -> crate::Result<Arc<dyn ObjectStore>> {
        match provider {
            Provider::Gcp => {
                let project = scope.map(str::to_string).or_else(|| self.default_project.clone());
                Ok(Arc::new(GcsStore::new(
                    self.http.clone(),
                    self.executor.clone(),
                    &self.gcs_endpoint,
                    project,
                )))
            }
            Provider::Azure => {
                let account = scope
                    .map(str::to_string)
                    .or_else(|| self.default_account.clone())
                    .ok_or(crate::GatewayError::MissingArgument("Storage account name"))?;
                Ok(Arc::new(AzureBlobStore::new(self.executor.clone(), account)))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::VecStore;
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_collect_capped_never_exceeds_cap() {
        let store = VecStore::with_objects(250, 40);
        let items = collect_capped(100, |page| store.list_objects("b", None, page))
            .await
            .unwrap();
        assert_eq!(items.len(), 100);
    }

    #[tokio::test]
    async fn test_collect_capped_stops_fetching_at_cap() {
        let store = VecStore::with_objects(1000, 10);
        let items = collect_capped(25, |page| store.list_objects("b", None, page))
            .await
            .unwrap();
        assert_eq!(items.len(), 25);
        // 10 + 10 + 5: the third page is the last one requested.
        assert_eq!(store.pages_served.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_collect_capped_preserves_backend_order() {
        let store = VecStore::with_objects(30, 7);
        let items = collect_capped(100, |page| store.list_objects("b", None, page))
            .await
            .unwrap();
        let names: Vec<String> = items.into_iter().map(|o| o.name).collect();
        assert_eq!(names, store.objects);
    }

    #[tokio::test]
    async fn test_collect_capped_passes_prefix_through() {
        let store = VecStore::with_objects(30, 100);
        let items = collect_capped(100, |page| store.list_objects("b", Some("obj-001"), page))
            .await
            .unwrap();
        assert_eq!(items.len(), 10);
        assert!(items.iter().all(|o| o.name.starts_with("obj-001")));
    }

    #[tokio::test]
    async fn test_collect_capped_propagates_backend_error() {
        let store = VecStore::failing("403 Forbidden");
        let result = collect_capped(10, |page| store.list_objects("b", None, page)).await;
        assert!(matches!(result, Err(crate::GatewayError::Transport(ref m)) if m == "403 Forbidden"));
    }

    #[tokio::test]
    async fn test_client_factory_azure_requires_account() {
        let config = GatewayConfig::default();
        let executor = CommandExecutor::from_config(&config);
        let factory = ClientFactory::new(&config, executor).unwrap();
        let result = factory.store(Provider::Azure, None);
        assert!(matches!(result, Err(crate::GatewayError::MissingArgument(label)) if label.contains("account")));
        assert!(factory.store(Provider::Azure, Some("acct")).is_ok());
        assert!(factory.store(Provider::Gcp, None).is_ok());
    }
}
