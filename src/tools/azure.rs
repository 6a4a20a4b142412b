//! Azure handlers: `az` pass-through, Blob Storage, virtual machines.

use std::sync::Arc;

use serde_json::json;

use super::args::{self, Args};
use super::{collaborator, ToolContext, ToolResponse};
use crate::error::GatewayError;
use crate::gateway::Provider;
use crate::storage::{collect_capped, ObjectStore};

pub(super) async fn run_command(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let command = args::required_str(args, "command", "Command")?;
    let subscription = ctx.scope(Provider::Azure, args);
    let result = ctx.executor.execute_azure(command, subscription).await?;
    Ok(ToolResponse::from_execution(&result))
}

/// Store for the caller's `accountName`, or the configured account.
fn blob_store(ctx: &ToolContext, args: &Args) -> crate::Result<Arc<dyn ObjectStore>> {
    let account = args::optional_str(args, "accountName")
        .map(|name| args::safe_token("accountName", name, false))
        .transpose()?;
    ctx.stores.store(Provider::Azure, account)
}

pub(super) async fn list_containers(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let prefix = args::optional_str(args, "prefix");
    let max_results = args::max_results(args)?;
    let store = blob_store(ctx, args)?;

    let containers = collect_capped(max_results, |page| store.list_containers(prefix, page))
        .await
        .map_err(collaborator("list containers"))?;
    ToolResponse::json(&json!({ "containers": containers }))
}

pub(super) async fn list_blobs(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let container = args::required_str(args, "containerName", "Container name")?;
    let prefix = args::optional_str(args, "prefix");
    let max_results = args::max_results(args)?;
    let store = blob_store(ctx, args)?;

    let blobs = collect_capped(max_results, |page| store.list_objects(container, prefix, page))
        .await
        .map_err(collaborator("list blobs"))?;
    ToolResponse::json(&json!({ "container": container, "blobs": blobs }))
}

pub(super) async fn read_blob(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let container = args::required_str(args, "containerName", "Container name")?;
    let blob = args::required_str(args, "blobName", "Blob name")?;
    let store = blob_store(ctx, args)?;

    let content = store
        .read_object(container, blob)
        .await
        .map_err(collaborator("read blob"))?;
    Ok(ToolResponse::text(content))
}

pub(super) async fn blob_properties(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let container = args::required_str(args, "containerName", "Container name")?;
    let blob = args::required_str(args, "blobName", "Blob name")?;
    let store = blob_store(ctx, args)?;

    let properties = store
        .object_metadata(container, blob)
        .await
        .map_err(collaborator("get blob properties"))?;
    ToolResponse::json(&properties)
}

pub(super) async fn list_vms(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let subscription = ctx.checked_scope(Provider::Azure, args)?;
    let mut command = "vm list --output json".to_string();
    if let Some(group) = args::optional_str(args, "resourceGroup") {
        command.push_str(&format!(
            " --resource-group {}",
            args::safe_token("resourceGroup", group, false)?
        ));
    }
    let result = ctx.executor.execute_azure(&command, subscription).await?;
    Ok(ToolResponse::from_execution(&result))
}

/// `action` is `start` or `stop`.
pub(super) async fn set_power(
    ctx: &ToolContext,
    args: &Args,
    action: &'static str,
) -> crate::Result<ToolResponse> {
    let target = vm_target(args)?;
    let subscription = ctx.checked_scope(Provider::Azure, args)?;
    let command = format!("vm {} {}", action, target);
    let result = ctx.executor.execute_azure(&command, subscription).await?;
    Ok(ToolResponse::from_execution(&result))
}

/// Size first, then tags.
pub(super) async fn modify_vm(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let target = vm_target(args)?;
    let subscription = ctx.checked_scope(Provider::Azure, args)?;
    let size = args::optional_str(args, "size")
        .map(|size| args::safe_token("size", size, false))
        .transpose()?;
    let tags = args::string_map(args, "tags")?;

    let mut steps = Vec::new();
    if let Some(size) = size {
        steps.push(("resize", format!("vm resize {} --size {}", target, size)));
    }
    if !tags.is_empty() {
        let assignments = tags
            .iter()
            .map(|(k, v)| {
                Ok(format!(
                    "tags.{}={}",
                    args::safe_token("tags", k, false)?,
                    args::safe_token("tags", v, false)?
                ))
            })
            .collect::<crate::Result<Vec<_>>>()?;
        steps.push((
            "update-tags",
            format!("vm update {} --set {}", target, assignments.join(" ")),
        ));
    }
    if steps.is_empty() {
        return Err(GatewayError::MissingArgument("size or tags"));
    }

    Ok(ctx.run_steps(Provider::Azure, subscription, steps).await)
}

/// `--name <vm> --resource-group <rg>`
fn vm_target(args: &Args) -> crate::Result<String> {
    let name = args::required_str(args, "vmName", "VM name")?;
    let group = args::required_str(args, "resourceGroup", "Resource group")?;
    Ok(format!(
        "--name {} --resource-group {}",
        args::safe_token("vmName", name, false)?,
        args::safe_token("resourceGroup", group, false)?
    ))
}

#[cfg(test)]
mod tests {
    use crate::storage::testing::VecStore;
    use crate::tools::testing::router_with;
    use serde_json::{json, Value};

    fn args(value: Value) -> Option<crate::tools::Args> {
        value.as_object().cloned()
    }

    fn stdout_of(text: &str) -> String {
        let body: Value = serde_json::from_str(text).unwrap();
        body["stdout"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_start_vm_with_subscription() {
        let router = router_with("echo", VecStore::with_objects(0, 10));
        let response = router
            .dispatch(
                "azure_start_vm",
                args(json!({"vmName": "vm-1", "resourceGroup": "rg-prod", "subscriptionId": "sub-1"})),
            )
            .await;
        assert!(!response.is_error);
        assert_eq!(
            stdout_of(&response.joined_text()),
            "vm start --name vm-1 --resource-group rg-prod --subscription sub-1\n"
        );
    }

    #[tokio::test]
    async fn test_stop_vm_without_subscription() {
        let router = router_with("echo", VecStore::with_objects(0, 10));
        let response = router
            .dispatch("azure_stop_vm", args(json!({"vmName": "vm-1", "resourceGroup": "rg"})))
            .await;
        assert_eq!(
            stdout_of(&response.joined_text()),
            "vm stop --name vm-1 --resource-group rg\n"
        );
    }

    #[tokio::test]
    async fn test_list_vms_filters_by_group() {
        let router = router_with("echo", VecStore::with_objects(0, 10));
        let response = router
            .dispatch("azure_list_vms", args(json!({"resourceGroup": "rg-a"})))
            .await;
        assert_eq!(
            stdout_of(&response.joined_text()),
            "vm list --output json --resource-group rg-a\n"
        );
    }

    #[tokio::test]
    async fn test_vm_name_required() {
        let router = router_with("echo", VecStore::with_objects(0, 10));
        let response = router
            .dispatch("azure_start_vm", args(json!({"resourceGroup": "rg"})))
            .await;
        assert!(response.is_error);
        assert_eq!(response.joined_text(), "Error: VM name is required");
    }

    #[tokio::test]
    async fn test_modify_vm_steps() {
        let router = router_with("echo", VecStore::with_objects(0, 10));
        let response = router
            .dispatch(
                "azure_modify_vm",
                args(json!({
                    "vmName": "vm-1",
                    "resourceGroup": "rg",
                    "size": "Standard_D2s_v3",
                    "tags": {"env": "prod"}
                })),
            )
            .await;
        assert!(!response.is_error);
        let text = response.joined_text();
        assert!(text.contains("Step 1 (resize): "));
        assert!(text.contains("--size Standard_D2s_v3"));
        assert!(text.contains("Step 2 (update-tags): "));
        assert!(text.contains("--set tags.env=prod"));
    }

    #[tokio::test]
    async fn test_modify_vm_rejects_injected_tag() {
        let router = router_with("echo", VecStore::with_objects(0, 10));
        let response = router
            .dispatch(
                "azure_modify_vm",
                args(json!({"vmName": "vm-1", "resourceGroup": "rg", "tags": {"env": "a b"}})),
            )
            .await;
        assert!(response.is_error);
        assert!(response.joined_text().contains("invalid argument 'tags'"));
    }

    #[tokio::test]
    async fn test_list_containers_and_blob_properties() {
        let router = router_with("echo", VecStore::with_objects(3, 10));
        let response = router
            .dispatch("azure_list_containers", args(json!({"accountName": "acct"})))
            .await;
        let body: Value = serde_json::from_str(&response.joined_text()).unwrap();
        assert_eq!(body["containers"].as_array().unwrap().len(), 2);

        let response = router
            .dispatch(
                "azure_get_blob_properties",
                args(json!({"containerName": "c", "blobName": "b.txt"})),
            )
            .await;
        let body: Value = serde_json::from_str(&response.joined_text()).unwrap();
        assert_eq!(body["name"], "b.txt");
    }

    #[tokio::test]
    async fn test_read_blob_failure_is_prefixed() {
        let router = router_with("echo", VecStore::failing("BlobNotFound"));
        let response = router
            .dispatch("azure_read_blob", args(json!({"containerName": "c", "blobName": "x"})))
            .await;
        assert!(response.is_error);
        assert_eq!(response.joined_text(), "Error: Failed to read blob: BlobNotFound");
    }
}
