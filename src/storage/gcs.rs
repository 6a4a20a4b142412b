//! Google Cloud Storage backend over the JSON API.
//!
//! Requests carry a bearer token minted by `gcloud auth print-access-token`,
//! so the gateway relies on the same credential chain as the CLI tools.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use crate::error::GatewayError;
use crate::gateway::{CommandExecutor, Provider};
use crate::storage::{ContainerInfo, ObjectInfo, ObjectStore, Page, PageRequest};

pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Bucket {
    name: String,
    time_created: Option<String>,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Object {
    name: String,
    /// The JSON API encodes uint64 as a string.
    size: Option<String>,
    content_type: Option<String>,
    updated: Option<String>,
}

impl From<Bucket> for ContainerInfo {
    fn from(b: Bucket) -> Self {
        ContainerInfo {
            name: b.name,
            created: b.time_created,
            location: b.location,
        }
    }
}

impl From<Object> for ObjectInfo {
    fn from(o: Object) -> Self {
        ObjectInfo {
            name: o.name,
            size: o.size.and_then(|s| s.parse().ok()),
            content_type: o.content_type,
            updated: o.updated,
        }
    }
}

/// A GCS client scoped to an optional project.
pub struct GcsStore {
    http: reqwest::Client,
    executor: CommandExecutor,
    endpoint: String,
    project: Option<String>,
}

impl GcsStore {
    pub fn new(
        http: reqwest::Client,
        executor: CommandExecutor,
        endpoint: &str,
        project: Option<String>,
    ) -> Self {
        Self {
            http,
            executor,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project,
        }
    }

    /// Build `<endpoint>/storage/v1/<segments...>` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> crate::Result<Url> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| GatewayError::Transport(format!("bad GCS endpoint '{}': {}", self.endpoint, e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transport(format!("GCS endpoint '{}' cannot be a base", self.endpoint)))?
            .extend(["storage", "v1"])
            .extend(segments);
        Ok(url)
    }

    async fn access_token(&self) -> crate::Result<String> {
        let args = ["auth".to_string(), "print-access-token".to_string()];
        let result = self.executor.run_internal(Provider::Gcp, &args).await;
        let token = result.stdout.trim();
        if !result.is_success() || token.is_empty() {
            return Err(GatewayError::Transport(format!(
                "could not obtain access token: {}",
                result.stderr.trim()
            )));
        }
        Ok(token.to_string())
    }

    async fn get(&self, url: Url) -> crate::Result<reqwest::Response> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Transport(describe_status(status, &body)))
    }

    async fn get_list<T: serde::de::DeserializeOwned>(&self, url: Url) -> crate::Result<ListResponse<T>> {
        self.get(url)
            .await?
            .json::<ListResponse<T>>()
            .await
            .map_err(|e| GatewayError::Transport(format!("malformed listing: {}", e)))
    }
}

/// Prefer the API's own error message when the body is a GCS error document.
fn describe_status(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, message)
    }
}

/// Read a response body chunk by chunk, failing once it passes `limit`.
/// Object reads share the CLI output cap.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> crate::Result<Vec<u8>> {
    let too_large = || GatewayError::Transport(format!("object exceeds {} bytes", limit));
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?
    {
        if body.len() + chunk.len() > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn apply_paging(url: &mut Url, prefix: Option<&str>, page: &PageRequest) {
    let mut query = url.query_pairs_mut();
    query.append_pair("maxResults", &page.size.to_string());
    if let Some(prefix) = prefix {
        query.append_pair("prefix", prefix);
    }
    if let Some(token) = &page.token {
        query.append_pair("pageToken", token);
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn list_containers(
        &self,
        prefix: Option<&str>,
        page: PageRequest,
    ) -> crate::Result<Page<ContainerInfo>> {
        let project = self
            .project
            .as_deref()
            .ok_or(GatewayError::MissingArgument("Project ID"))?;
        let mut url = self.url(&["b"])?;
        url.query_pairs_mut().append_pair("project", project);
        apply_paging(&mut url, prefix, &page);

        let list = self.get_list::<Bucket>(url).await?;
        Ok(Page {
            items: list.items.into_iter().map(ContainerInfo::from).collect(),
            next_token: list.next_page_token,
        })
    }

    async fn list_objects(
        &self,
        container: &str,
        prefix: Option<&str>,
        page: PageRequest,
    ) -> crate::Result<Page<ObjectInfo>> {
        let mut url = self.url(&["b", container, "o"])?;
        apply_paging(&mut url, prefix, &page);

        let list = self.get_list::<Object>(url).await?;
        Ok(Page {
            items: list.items.into_iter().map(ObjectInfo::from).collect(),
            next_token: list.next_page_token,
        })
    }

    async fn read_object(&self, container: &str, name: &str) -> crate::Result<String> {
        let mut url = self.url(&["b", container, "o", name])?;
        url.query_pairs_mut().append_pair("alt", "media");
        let response = self.get(url).await?;
        let bytes = read_capped(response, self.executor.policy().max_output_bytes).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn object_metadata(
        &self,
        container: &str,
        name: &str,
    ) -> crate::Result<serde_json::Value> {
        let url = self.url(&["b", container, "o", name])?;
        self.get(url)
            .await?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| GatewayError::Transport(format!("malformed metadata: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ExecutionPolicy;

    fn store(project: Option<&str>) -> GcsStore {
        GcsStore::new(
            reqwest::Client::new(),
            CommandExecutor::new(ExecutionPolicy::default()),
            "https://storage.example.test/",
            project.map(str::to_string),
        )
    }

    #[test]
    fn test_url_encodes_object_names() {
        let url = store(None).url(&["b", "my-bucket", "o", "dir/file name.txt"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.example.test/storage/v1/b/my-bucket/o/dir%2Ffile%20name.txt"
        );
    }

    #[test]
    fn test_apply_paging_sets_query() {
        let mut url = store(None).url(&["b", "bkt", "o"]).unwrap();
        let page = PageRequest {
            token: Some("tok".to_string()),
            size: 50,
        };
        apply_paging(&mut url, Some("logs/"), &page);
        assert_eq!(url.query(), Some("maxResults=50&prefix=logs%2F&pageToken=tok"));
    }

    #[test]
    fn test_listing_deserializes_with_missing_items() {
        let list: ListResponse<Object> = serde_json::from_str(r#"{"kind":"storage#objects"}"#).unwrap();
        assert!(list.items.is_empty());
        assert!(list.next_page_token.is_none());
    }

    #[test]
    fn test_object_size_parsed_from_string() {
        let list: ListResponse<Object> = serde_json::from_str(
            r#"{"items":[{"name":"a.txt","size":"42","contentType":"text/plain"}],"nextPageToken":"n1"}"#,
        )
        .unwrap();
        let info = ObjectInfo::from(list.items.into_iter().next().unwrap());
        assert_eq!(info.size, Some(42));
        assert_eq!(info.content_type.as_deref(), Some("text/plain"));
        assert_eq!(list.next_page_token.as_deref(), Some("n1"));
    }

    #[test]
    fn test_describe_status_prefers_api_message() {
        let body = r#"{"error":{"code":404,"message":"No such object: b/o"}}"#;
        assert_eq!(
            describe_status(StatusCode::NOT_FOUND, body),
            "404 Not Found: No such object: b/o"
        );
        assert_eq!(describe_status(StatusCode::FORBIDDEN, ""), "403 Forbidden");
    }

    #[tokio::test]
    async fn test_list_buckets_without_project_fails_before_network() {
        let result = store(None)
            .list_containers(None, PageRequest { token: None, size: 10 })
            .await;
        assert!(matches!(result, Err(GatewayError::MissingArgument("Project ID"))));
    }

    /// Local stand-in for the JSON API: `small` holds a short object, every
    /// other path answers with 5000 bytes.
    async fn serve_objects() -> String {
        use axum::routing::get;

        let app = axum::Router::new()
            .route("/storage/v1/b/small/o/obj", get(|| async { "hello" }))
            .fallback(|| async { "x".repeat(5000) });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn capped_store(endpoint: &str, max_output_bytes: usize) -> GcsStore {
        let policy = ExecutionPolicy {
            max_output_bytes,
            ..ExecutionPolicy::default()
        };
        // `echo` stands in for gcloud, so the token is its echoed arguments.
        GcsStore::new(
            reqwest::Client::new(),
            CommandExecutor::new(policy).with_program(Provider::Gcp, "echo"),
            endpoint,
            None,
        )
    }

    #[tokio::test]
    async fn test_read_object_within_cap() {
        let endpoint = serve_objects().await;
        let content = capped_store(&endpoint, 1000)
            .read_object("small", "obj")
            .await
            .unwrap();
        assert_eq!(content, "hello");
    }

    #[tokio::test]
    async fn test_read_object_over_cap_is_refused() {
        let endpoint = serve_objects().await;
        let result = capped_store(&endpoint, 1000).read_object("big", "obj").await;
        assert!(
            matches!(result, Err(GatewayError::Transport(ref m)) if m == "object exceeds 1000 bytes"),
            "got {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_token_failure_surfaces_cli_stderr() {
        let gcs = GcsStore::new(
            reqwest::Client::new(),
            CommandExecutor::new(ExecutionPolicy::default()).with_program(Provider::Gcp, "false"),
            DEFAULT_ENDPOINT,
            Some("p".to_string()),
        );
        let result = gcs.read_object("b", "o").await;
        assert!(
            matches!(result, Err(GatewayError::Transport(ref m)) if m.contains("access token"))
        );
    }
}
