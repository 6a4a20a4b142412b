//! The fixed tool catalogue: names, owning provider, and input schemas.

use std::fmt;
use std::sync::Arc;

use rmcp::model::Tool;
use serde_json::{json, Map, Value};

use crate::gateway::Provider;

/// Every tool the gateway exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    /// Run a free-form `gcloud` sub-command.
    GcpRunCommand,
    GcpListBuckets,
    GcpListObjects,
    GcpReadObject,
    GcpGetObjectMetadata,
    GcpListInstances,
    GcpStartInstance,
    GcpStopInstance,
    /// Change machine type and/or labels of a Compute Engine instance.
    GcpModifyInstance,
    /// Run a free-form `az` sub-command.
    AzureRunCommand,
    AzureListContainers,
    AzureListBlobs,
    AzureReadBlob,
    AzureGetBlobProperties,
    AzureListVms,
    AzureStartVm,
    AzureStopVm,
    /// Change size and/or tags of an Azure VM.
    AzureModifyVm,
}

impl ToolName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GcpRunCommand => "gcp_run_command",
            Self::GcpListBuckets => "gcp_list_buckets",
            Self::GcpListObjects => "gcp_list_objects",
            Self::GcpReadObject => "gcp_read_object",
            Self::GcpGetObjectMetadata => "gcp_get_object_metadata",
            Self::GcpListInstances => "gcp_list_instances",
            Self::GcpStartInstance => "gcp_start_instance",
            Self::GcpStopInstance => "gcp_stop_instance",
            Self::GcpModifyInstance => "gcp_modify_instance",
            Self::AzureRunCommand => "azure_run_command",
            Self::AzureListContainers => "azure_list_containers",
            Self::AzureListBlobs => "azure_list_blobs",
            Self::AzureReadBlob => "azure_read_blob",
            Self::AzureGetBlobProperties => "azure_get_blob_properties",
            Self::AzureListVms => "azure_list_vms",
            Self::AzureStartVm => "azure_start_vm",
            Self::AzureStopVm => "azure_stop_vm",
            Self::AzureModifyVm => "azure_modify_vm",
        }
    }

    /// All tools in catalogue order.
    pub const fn all() -> &'static [Self] {
        &[
            Self::GcpRunCommand,
            Self::GcpListBuckets,
            Self::GcpListObjects,
            Self::GcpReadObject,
            Self::GcpGetObjectMetadata,
            Self::GcpListInstances,
            Self::GcpStartInstance,
            Self::GcpStopInstance,
            Self::GcpModifyInstance,
            Self::AzureRunCommand,
            Self::AzureListContainers,
            Self::AzureListBlobs,
            Self::AzureReadBlob,
            Self::AzureGetBlobProperties,
            Self::AzureListVms,
            Self::AzureStartVm,
            Self::AzureStopVm,
            Self::AzureModifyVm,
        ]
    }

    /// Parse a tool name; `None` for anything outside the catalogue.
    pub fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|tool| tool.as_str() == name)
    }

    pub const fn provider(self) -> Provider {
        match self {
            Self::GcpRunCommand
            | Self::GcpListBuckets
            | Self::GcpListObjects
            | Self::GcpReadObject
            | Self::GcpGetObjectMetadata
            | Self::GcpListInstances
            | Self::GcpStartInstance
            | Self::GcpStopInstance
            | Self::GcpModifyInstance => Provider::Gcp,
            Self::AzureRunCommand
            | Self::AzureListContainers
            | Self::AzureListBlobs
            | Self::AzureReadBlob
            | Self::AzureGetBlobProperties
            | Self::AzureListVms
            | Self::AzureStartVm
            | Self::AzureStopVm
            | Self::AzureModifyVm => Provider::Azure,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::GcpRunCommand => {
                "Run a gcloud command (without the leading 'gcloud'). auth, config, init, alpha and beta commands are blocked."
            }
            Self::GcpListBuckets => "List Cloud Storage buckets in a project",
            Self::GcpListObjects => "List objects in a Cloud Storage bucket",
            Self::GcpReadObject => "Read the contents of a Cloud Storage object as text",
            Self::GcpGetObjectMetadata => "Fetch metadata for a Cloud Storage object",
            Self::GcpListInstances => "List Compute Engine instances",
            Self::GcpStartInstance => "Start a Compute Engine instance",
            Self::GcpStopInstance => "Stop a Compute Engine instance",
            Self::GcpModifyInstance => {
                "Change the machine type and/or labels of a Compute Engine instance. Steps run in order and are not rolled back."
            }
            Self::AzureRunCommand => {
                "Run an az command (without the leading 'az'). login, account and config commands are blocked."
            }
            Self::AzureListContainers => "List blob containers in a storage account",
            Self::AzureListBlobs => "List blobs in a storage container",
            Self::AzureReadBlob => "Read the contents of a blob as text",
            Self::AzureGetBlobProperties => "Fetch properties for a blob",
            Self::AzureListVms => "List Azure virtual machines",
            Self::AzureStartVm => "Start an Azure virtual machine",
            Self::AzureStopVm => "Stop an Azure virtual machine",
            Self::AzureModifyVm => {
                "Change the size and/or tags of an Azure virtual machine. Steps run in order and are not rolled back."
            }
        }
    }

    /// JSON schema for the tool's arguments object.
    pub fn input_schema(self) -> Value {
        match self {
            Self::GcpRunCommand => schema(
                &[
                    ("command", "string", "gcloud sub-command, e.g. 'compute instances list'"),
                    PROJECT_ID,
                ],
                &["command"],
            ),
            Self::GcpListBuckets => schema(&[PROJECT_ID, PREFIX, MAX_RESULTS], &[]),
            Self::GcpListObjects => schema(&[BUCKET_NAME, PREFIX, MAX_RESULTS], &["bucketName"]),
            Self::GcpReadObject | Self::GcpGetObjectMetadata => schema(
                &[BUCKET_NAME, ("objectName", "string", "Object name")],
                &["bucketName", "objectName"],
            ),
            Self::GcpListInstances => schema(
                &[PROJECT_ID, ("zone", "string", "Restrict to one zone")],
                &[],
            ),
            Self::GcpStartInstance | Self::GcpStopInstance => schema(
                &[INSTANCE_NAME, ZONE, PROJECT_ID],
                &["instanceName", "zone"],
            ),
            Self::GcpModifyInstance => schema(
                &[
                    INSTANCE_NAME,
                    ZONE,
                    ("machineType", "string", "New machine type, e.g. e2-standard-4"),
                    ("labels", "object", "Labels to add or overwrite"),
                    PROJECT_ID,
                ],
                &["instanceName", "zone"],
            ),
            Self::AzureRunCommand => schema(
                &[
                    ("command", "string", "az sub-command, e.g. 'vm list'"),
                    SUBSCRIPTION_ID,
                ],
                &["command"],
            ),
            Self::AzureListContainers => schema(&[ACCOUNT_NAME, PREFIX, MAX_RESULTS], &[]),
            Self::AzureListBlobs => schema(
                &[CONTAINER_NAME, ACCOUNT_NAME, PREFIX, MAX_RESULTS],
                &["containerName"],
            ),
            Self::AzureReadBlob | Self::AzureGetBlobProperties => schema(
                &[CONTAINER_NAME, ("blobName", "string", "Blob name"), ACCOUNT_NAME],
                &["containerName", "blobName"],
            ),
            Self::AzureListVms => schema(
                &[("resourceGroup", "string", "Restrict to one resource group"), SUBSCRIPTION_ID],
                &[],
            ),
            Self::AzureStartVm | Self::AzureStopVm => schema(
                &[VM_NAME, RESOURCE_GROUP, SUBSCRIPTION_ID],
                &["vmName", "resourceGroup"],
            ),
            Self::AzureModifyVm => schema(
                &[
                    VM_NAME,
                    RESOURCE_GROUP,
                    ("size", "string", "New VM size, e.g. Standard_D2s_v3"),
                    ("tags", "object", "Tags to add or overwrite"),
                    SUBSCRIPTION_ID,
                ],
                &["vmName", "resourceGroup"],
            ),
        }
    }

    /// The rmcp descriptor served by every front-end.
    pub fn descriptor(self) -> Tool {
        let input_schema = Arc::new(self.input_schema().as_object().cloned().unwrap_or_default());
        Tool {
            name: self.as_str().into(),
            title: None,
            description: Some(self.description().into()),
            input_schema,
            output_schema: None,
            annotations: None,
            icons: None,
            meta: None,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Property = (&'static str, &'static str, &'static str);

const PROJECT_ID: Property = ("projectId", "string", "GCP project id (defaults to the configured project)");
const SUBSCRIPTION_ID: Property = ("subscriptionId", "string", "Azure subscription id");
const PREFIX: Property = ("prefix", "string", "Only return names starting with this prefix");
const MAX_RESULTS: Property = ("maxResults", "integer", "Maximum entries to return (default 100)");
const BUCKET_NAME: Property = ("bucketName", "string", "Bucket name");
const CONTAINER_NAME: Property = ("containerName", "string", "Container name");
const ACCOUNT_NAME: Property = ("accountName", "string", "Storage account (defaults to the configured account)");
const INSTANCE_NAME: Property = ("instanceName", "string", "Instance name");
const ZONE: Property = ("zone", "string", "Instance zone, e.g. us-central1-a");
const VM_NAME: Property = ("vmName", "string", "VM name");
const RESOURCE_GROUP: Property = ("resourceGroup", "string", "Resource group");

fn schema(properties: &[Property], required: &[&str]) -> Value {
    let mut props = Map::new();
    for (name, kind, description) in properties {
        let mut prop = json!({ "type": kind, "description": description });
        if *kind == "object" {
            prop["additionalProperties"] = json!({ "type": "string" });
        }
        props.insert(name.to_string(), prop);
    }
    json!({
        "type": "object",
        "properties": props,
        "required": required,
    })
}
