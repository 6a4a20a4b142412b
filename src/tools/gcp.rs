//! GCP handlers: `gcloud` pass-through, Cloud Storage, Compute Engine.

use serde_json::json;

use super::args::{self, Args};
use super::{collaborator, ToolContext, ToolResponse};
use crate::error::GatewayError;
use crate::gateway::Provider;
use crate::storage::collect_capped;

pub(super) async fn run_command(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let command = args::required_str(args, "command", "Command")?;
    let project = ctx.scope(Provider::Gcp, args);
    let result = ctx.executor.execute_gcp(command, project).await?;
    Ok(ToolResponse::from_execution(&result))
}

pub(super) async fn list_buckets(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let prefix = args::optional_str(args, "prefix");
    let max_results = args::max_results(args)?;
    let store = ctx.stores.store(Provider::Gcp, ctx.scope(Provider::Gcp, args))?;

    let buckets = collect_capped(max_results, |page| store.list_containers(prefix, page))
        .await
        .map_err(collaborator("list buckets"))?;
    ToolResponse::json(&json!({ "buckets": buckets }))
}

pub(super) async fn list_objects(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let bucket = args::required_str(args, "bucketName", "Bucket name")?;
    let prefix = args::optional_str(args, "prefix");
    let max_results = args::max_results(args)?;
    let store = ctx.stores.store(Provider::Gcp, None)?;

    let objects = collect_capped(max_results, |page| store.list_objects(bucket, prefix, page))
        .await
        .map_err(collaborator("list objects"))?;
    ToolResponse::json(&json!({ "bucket": bucket, "objects": objects }))
}

pub(super) async fn read_object(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let bucket = args::required_str(args, "bucketName", "Bucket name")?;
    let object = args::required_str(args, "objectName", "Object name")?;
    let store = ctx.stores.store(Provider::Gcp, None)?;

    let content = store
        .read_object(bucket, object)
        .await
        .map_err(collaborator("read object"))?;
    Ok(ToolResponse::text(content))
}

pub(super) async fn object_metadata(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let bucket = args::required_str(args, "bucketName", "Bucket name")?;
    let object = args::required_str(args, "objectName", "Object name")?;
    let store = ctx.stores.store(Provider::Gcp, None)?;

    let metadata = store
        .object_metadata(bucket, object)
        .await
        .map_err(collaborator("get object metadata"))?;
    ToolResponse::json(&metadata)
}

pub(super) async fn list_instances(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let project = ctx.checked_scope(Provider::Gcp, args)?;
    let mut command = "compute instances list --format=json".to_string();
    if let Some(zone) = args::optional_str(args, "zone") {
        command.push_str(&format!(" --zones={}", args::safe_token("zone", zone, false)?));
    }
    let result = ctx.executor.execute_gcp(&command, project).await?;
    Ok(ToolResponse::from_execution(&result))
}

/// `action` is `start` or `stop`.
pub(super) async fn set_power(
    ctx: &ToolContext,
    args: &Args,
    action: &'static str,
) -> crate::Result<ToolResponse> {
    let (instance, zone) = instance_target(args)?;
    let project = ctx.checked_scope(Provider::Gcp, args)?;
    let command = format!("compute instances {} {} --zone={}", action, instance, zone);
    let result = ctx.executor.execute_gcp(&command, project).await?;
    Ok(ToolResponse::from_execution(&result))
}

/// Machine type first, then labels.
pub(super) async fn modify_instance(ctx: &ToolContext, args: &Args) -> crate::Result<ToolResponse> {
    let (instance, zone) = instance_target(args)?;
    let project = ctx.checked_scope(Provider::Gcp, args)?;
    let machine_type = args::optional_str(args, "machineType")
        .map(|mt| args::safe_token("machineType", mt, false))
        .transpose()?;
    let labels = args::string_map(args, "labels")?;

    let mut steps = Vec::new();
    if let Some(machine_type) = machine_type {
        steps.push((
            "set-machine-type",
            format!(
                "compute instances set-machine-type {} --zone={} --machine-type={}",
                instance, zone, machine_type
            ),
        ));
    }
    if !labels.is_empty() {
        steps.push((
            "add-labels",
            format!(
                "compute instances add-labels {} --zone={} --labels={}",
                instance,
                zone,
                label_list(&labels)?
            ),
        ));
    }
    if steps.is_empty() {
        return Err(GatewayError::MissingArgument("machineType or labels"));
    }

    Ok(ctx.run_steps(Provider::Gcp, project, steps).await)
}

fn instance_target(args: &Args) -> crate::Result<(&str, &str)> {
    let instance = args::required_str(args, "instanceName", "Instance name")?;
    let zone = args::required_str(args, "zone", "Zone")?;
    Ok((
        args::safe_token("instanceName", instance, false)?,
        args::safe_token("zone", zone, false)?,
    ))
}

/// `k1=v1,k2=v2`
fn label_list(labels: &[(String, String)]) -> crate::Result<String> {
    let pairs = labels
        .iter()
        .map(|(k, v)| {
            Ok(format!(
                "{}={}",
                args::safe_token("labels", k, false)?,
                args::safe_token("labels", v, false)?
            ))
        })
        .collect::<crate::Result<Vec<_>>>()?;
    Ok(pairs.join(","))
}
