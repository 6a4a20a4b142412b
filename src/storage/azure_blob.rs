//! Azure Blob backend driven through `az storage`.
//!
//! The Blob data plane speaks XML; `az` already handles it and emits JSON,
//! so listings use `--num-results`/`--marker` paging with
//! `--show-next-marker`, which appends `{"nextMarker": ...}` to the array
//! when more results exist.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GatewayError;
use crate::gateway::{CommandExecutor, ExecutionResult, Provider};
use crate::storage::{ContainerInfo, ObjectInfo, ObjectStore, Page, PageRequest};

/// An Azure Blob client scoped to one storage account.
pub struct AzureBlobStore {
    executor: CommandExecutor,
    account: String,
}

impl AzureBlobStore {
    pub fn new(executor: CommandExecutor, account: String) -> Self {
        Self { executor, account }
    }

    /// `storage <resource> <action> ... --account-name <a> --auth-mode login --output <fmt>`
    fn base_args(&self, resource: &str, action: &str, output: &str) -> Vec<String> {
        [
            "storage",
            resource,
            action,
            "--account-name",
            self.account.as_str(),
            "--auth-mode",
            "login",
            "--output",
            output,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    async fn run(&self, args: Vec<String>) -> crate::Result<String> {
        let result: ExecutionResult = self.executor.run_internal(Provider::Azure, &args).await;
        if result.is_success() {
            Ok(result.stdout)
        } else {
            Err(GatewayError::Transport(result.stderr.trim().to_string()))
        }
    }

    async fn list_page(
        &self,
        mut args: Vec<String>,
        prefix: Option<&str>,
        page: &PageRequest,
    ) -> crate::Result<(Vec<Value>, Option<String>)> {
        args.extend([
            "--num-results".to_string(),
            page.size.to_string(),
            "--show-next-marker".to_string(),
        ]);
        if let Some(prefix) = prefix {
            args.extend(["--prefix".to_string(), prefix.to_string()]);
        }
        if let Some(marker) = &page.token {
            args.extend(["--marker".to_string(), marker.clone()]);
        }
        let stdout = self.run(args).await?;
        split_next_marker(&stdout)
    }
}

/// Separate listing entries from the trailing `nextMarker` element.
fn split_next_marker(stdout: &str) -> crate::Result<(Vec<Value>, Option<String>)> {
    let parsed: Value = serde_json::from_str(stdout.trim())
        .map_err(|e| GatewayError::Transport(format!("malformed az output: {}", e)))?;
    let Value::Array(entries) = parsed else {
        return Err(GatewayError::Transport("expected a JSON array from az".to_string()));
    };

    let mut next_marker = None;
    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.get("nextMarker") {
            Some(marker) => {
                next_marker = marker.as_str().filter(|m| !m.is_empty()).map(str::to_string);
            }
            None => items.push(entry),
        }
    }
    Ok((items, next_marker))
}

fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

fn container_from(value: &Value) -> Option<ContainerInfo> {
    Some(ContainerInfo {
        name: str_at(value, "/name")?,
        created: str_at(value, "/properties/lastModified"),
        location: None,
    })
}

fn blob_from(value: &Value) -> Option<ObjectInfo> {
    Some(ObjectInfo {
        name: str_at(value, "/name")?,
        size: value.pointer("/properties/contentLength").and_then(Value::as_u64),
        content_type: str_at(value, "/properties/contentSettings/contentType"),
        updated: str_at(value, "/properties/lastModified"),
    })
}

#[async_trait]
impl ObjectStore for AzureBlobStore {
    async fn list_containers(
        &self,
        prefix: Option<&str>,
        page: PageRequest,
    ) -> crate::Result<Page<ContainerInfo>> {
        let args = self.base_args("container", "list", "json");
        let (entries, next_token) = self.list_page(args, prefix, &page).await?;
        Ok(Page {
            items: entries.iter().filter_map(container_from).collect(),
            next_token,
        })
    }

    async fn list_objects(
        &self,
        container: &str,
        prefix: Option<&str>,
        page: PageRequest,
    ) -> crate::Result<Page<ObjectInfo>> {
        let mut args = self.base_args("blob", "list", "json");
        args.extend(["--container-name".to_string(), container.to_string()]);
        let (entries, next_token) = self.list_page(args, prefix, &page).await?;
        Ok(Page {
            items: entries.iter().filter_map(blob_from).collect(),
            next_token,
        })
    }

    async fn read_object(&self, container: &str, name: &str) -> crate::Result<String> {
        let mut args = self.base_args("blob", "download", "none");
        args.extend(
            [
                "--container-name",
                container,
                "--name",
                name,
                "--file",
                "/dev/stdout",
                "--no-progress",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        self.run(args).await
    }

    async fn object_metadata(&self, container: &str, name: &str) -> crate::Result<Value> {
        let mut args = self.base_args("blob", "show", "json");
        args.extend(
            ["--container-name", container, "--name", name]
                .iter()
                .map(|s| s.to_string()),
        );
        let stdout = self.run(args).await?;
        serde_json::from_str(stdout.trim())
            .map_err(|e| GatewayError::Transport(format!("malformed az output: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ExecutionPolicy;
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable stand-in for `az` that prints `body` and records its args.
    fn fake_az(dir: &tempfile::TempDir, body: &str) -> String {
        let path = dir.path().join("az");
        let args_log = dir.path().join("args.log");
        let script = format!(
            "#!/bin/sh\necho \"$@\" > '{}'\ncat <<'JSON'\n{}\nJSON\n",
            args_log.display(),
            body
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    fn store_with(program: &str) -> AzureBlobStore {
        let executor =
            CommandExecutor::new(ExecutionPolicy::default()).with_program(Provider::Azure, program);
        AzureBlobStore::new(executor, "acct".to_string())
    }

    #[test]
    fn test_split_next_marker() {
        let (items, marker) =
            split_next_marker(r#"[{"name":"a"},{"name":"b"},{"nextMarker":"m2"}]"#).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(marker.as_deref(), Some("m2"));

        let (items, marker) = split_next_marker(r#"[{"name":"a"},{"nextMarker":null}]"#).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(marker, None);
    }

    #[test]
    fn test_split_next_marker_rejects_non_array() {
        assert!(split_next_marker(r#"{"name":"a"}"#).is_err());
        assert!(split_next_marker("not json").is_err());
    }

    #[test]
    fn test_blob_from_reads_nested_properties() {
        let blob = serde_json::json!({
            "name": "logs/app.log",
            "properties": {
                "contentLength": 512,
                "lastModified": "2026-01-01T00:00:00+00:00",
                "contentSettings": {"contentType": "text/plain"}
            }
        });
        let info = blob_from(&blob).unwrap();
        assert_eq!(info.name, "logs/app.log");
        assert_eq!(info.size, Some(512));
        assert_eq!(info.content_type.as_deref(), Some("text/plain"));
        assert!(blob_from(&serde_json::json!({"properties": {}})).is_none());
    }

    #[tokio::test]
    async fn test_list_objects_pages_through_az() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_az(
            &dir,
            r#"[{"name":"a.txt","properties":{"contentLength":1}},{"nextMarker":"next-1"}]"#,
        );
        let page = store_with(&program)
            .list_objects(
                "logs",
                Some("a"),
                PageRequest {
                    token: Some("m0".to_string()),
                    size: 5,
                },
            )
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "a.txt");
        assert_eq!(page.next_token.as_deref(), Some("next-1"));

        let args = std::fs::read_to_string(dir.path().join("args.log")).unwrap();
        assert!(args.starts_with("storage blob list --account-name acct"));
        assert!(args.contains("--container-name logs"));
        assert!(args.contains("--num-results 5"));
        assert!(args.contains("--prefix a"));
        assert!(args.contains("--marker m0"));
    }

    #[tokio::test]
    async fn test_az_failure_becomes_transport_error() {
        let store = store_with("false");
        let result = store
            .list_containers(None, PageRequest { token: None, size: 10 })
            .await;
        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }
}
