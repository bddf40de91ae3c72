//! REST wire types for the Earth Engine v1 API
//!
//! int64 fields arrive as JSON strings; the `opt_u64` helper accepts both
//! forms.

use eeu_core::path;
use eeu_core::{
    Acl, AssetInfo, AssetType, ExportRequest, IngestRequest, Properties, Quota, TaskState,
    TaskStatus,
};
use jiff::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

pub(crate) const ROLE_OWNER: &str = "roles/owner";
pub(crate) const ROLE_EDITOR: &str = "roles/editor";
pub(crate) const ROLE_VIEWER: &str = "roles/viewer";
pub(crate) const ALL_USERS: &str = "allUsers";

fn opt_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// `EarthEngineAsset`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Asset {
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub name: String,
    #[serde(default)]
    pub update_time: Option<Timestamp>,
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    #[serde(default)]
    pub end_time: Option<Timestamp>,
    #[serde(default, deserialize_with = "opt_u64")]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub quota: Option<FolderQuota>,
}

impl From<Asset> for AssetInfo {
    fn from(asset: Asset) -> Self {
        let mut info = AssetInfo::new(path::asset_id(&asset.name), asset.asset_type);
        if let Some(size) = asset.size_bytes {
            info = info.with_size(size);
        }
        info.update_time = asset.update_time;
        info.start_time = asset.start_time;
        info.end_time = asset.end_time;
        info.properties = asset.properties;
        info.quota = asset.quota.map(Quota::from);
        info
    }
}

/// `FolderQuota`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FolderQuota {
    #[serde(default, deserialize_with = "opt_u64")]
    pub size_bytes: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64")]
    pub max_size_bytes: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64")]
    pub asset_count: Option<u64>,
    #[serde(default, alias = "maxAssets", deserialize_with = "opt_u64")]
    pub max_asset_count: Option<u64>,
}

impl From<FolderQuota> for Quota {
    fn from(quota: FolderQuota) -> Self {
        Quota {
            asset_count: quota.asset_count.unwrap_or_default(),
            max_assets: quota.max_asset_count,
            size_bytes: quota.size_bytes.unwrap_or_default(),
            max_size_bytes: quota.max_size_bytes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListAssetsResponse {
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// IAM `Policy`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Binding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
}

impl Policy {
    fn members(&self, role: &str) -> impl Iterator<Item = &str> {
        self.bindings
            .iter()
            .filter(move |b| b.role == role)
            .flat_map(|b| b.members.iter().map(String::as_str))
    }

    /// Owners currently in the policy, as ACL entries
    pub fn owners(&self) -> Vec<String> {
        self.members(ROLE_OWNER).map(member_to_entry).collect()
    }

    pub fn to_acl(&self) -> Acl {
        let readers: Vec<&str> = self.members(ROLE_VIEWER).collect();
        Acl {
            owners: self.owners(),
            writers: self.members(ROLE_EDITOR).map(member_to_entry).collect(),
            all_users_can_read: readers.contains(&ALL_USERS),
            readers: readers
                .into_iter()
                .filter(|m| *m != ALL_USERS)
                .map(member_to_entry)
                .collect(),
        }
    }

    /// Policy granting an ACL; `owners` is used when the ACL names none
    pub fn from_acl(acl: &Acl, owners: &[String], etag: Option<String>) -> Self {
        let owners = if acl.owners.is_empty() {
            owners
        } else {
            acl.owners.as_slice()
        };

        let mut readers: Vec<String> = acl.readers.iter().map(|e| entry_to_member(e)).collect();
        if acl.all_users_can_read {
            readers.push(ALL_USERS.to_string());
        }

        let owners: Vec<String> = owners.iter().map(|e| entry_to_member(e)).collect();
        let writers: Vec<String> = acl.writers.iter().map(|e| entry_to_member(e)).collect();

        let bindings = [
            (ROLE_OWNER, owners),
            (ROLE_EDITOR, writers),
            (ROLE_VIEWER, readers),
        ]
        .into_iter()
        .filter(|(_, members)| !members.is_empty())
        .map(|(role, members)| Binding {
            role: role.to_string(),
            members,
        })
        .collect();

        Policy {
            version: None,
            bindings,
            etag,
        }
    }
}

/// IAM member (`user:a@b.c`) to ACL entry (`a@b.c`)
///
/// Groups and domains keep their prefix so they survive a round trip.
pub(crate) fn member_to_entry(member: &str) -> String {
    member
        .strip_prefix("user:")
        .or_else(|| member.strip_prefix("serviceAccount:"))
        .unwrap_or(member)
        .to_string()
}

/// ACL entry to IAM member
pub(crate) fn entry_to_member(entry: &str) -> String {
    if entry.contains(':') || entry == ALL_USERS {
        entry.to_string()
    } else if entry.ends_with(".gserviceaccount.com") {
        format!("serviceAccount:{entry}")
    } else {
        format!("user:{entry}")
    }
}

/// Split a resource name into the project that owns it and the asset id
/// `createAsset` expects
pub(crate) fn create_target(name: &str) -> Option<(&str, &str)> {
    let (project, asset_id) = name.split_once("/assets/")?;
    if project.starts_with("projects/") && !asset_id.is_empty() {
        Some((project, asset_id))
    } else {
        None
    }
}

/// Body of `assets.patch` updating properties
pub(crate) fn update_properties_body(properties: &Properties) -> Value {
    let paths: Vec<String> = properties
        .keys()
        .map(|key| format!("properties.{key}"))
        .collect();
    json!({
        "asset": { "properties": properties },
        "updateMask": { "paths": paths },
    })
}

/// Body of `image.import`
pub(crate) fn import_body(request: &IngestRequest, request_id: &str) -> Value {
    let sources: Vec<Value> = request
        .sources
        .iter()
        .map(|uri| json!({ "uris": [uri] }))
        .collect();

    let mut manifest = json!({
        "name": path::resource_name(&request.asset),
        "tilesets": [{ "sources": sources }],
    });

    if !request.bands.is_empty() {
        let bands: Vec<Value> = request
            .bands
            .iter()
            .enumerate()
            .map(|(index, id)| json!({ "id": id, "tilesetBandIndex": index }))
            .collect();
        manifest["bands"] = Value::Array(bands);
    }
    if let Some(start) = request.start_time {
        manifest["startTime"] = json!(start.to_string());
    }
    if let Some(end) = request.end_time {
        manifest["endTime"] = json!(end.to_string());
    }
    if !request.properties.is_empty() {
        manifest["properties"] = Value::Object(request.properties.clone());
    }

    json!({
        "imageManifest": manifest,
        "requestId": request_id,
        "overwrite": request.overwrite,
    })
}

/// Serialized `Image.load(id)` expression
pub(crate) fn image_load_expression(asset: &str) -> Value {
    json!({
        "result": "0",
        "values": {
            "0": {
                "functionInvocationValue": {
                    "functionName": "Image.load",
                    "arguments": { "id": { "constantValue": asset } }
                }
            }
        }
    })
}

/// Body of `image.export` to a GeoTIFF in Cloud Storage
pub(crate) fn export_body(request: &ExportRequest, request_id: &str) -> Value {
    let mut body = json!({
        "expression": image_load_expression(&request.asset),
        "fileExportOptions": {
            "fileFormat": "GEO_TIFF",
            "cloudStorageDestination": {
                "bucket": request.bucket,
                "filenamePrefix": request.file_name_prefix,
            },
        },
        "requestId": request_id,
    });
    if let Some(description) = &request.description {
        body["description"] = json!(description);
    }
    if let Value::Object(map) = &mut body {
        for (key, value) in &request.options {
            map.insert(key.clone(), value.clone());
        }
    }
    body
}

/// Long-running `Operation`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub metadata: Option<OperationMetadata>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OperationMetadata {
    #[serde(default)]
    pub state: Option<TaskState>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OperationError {
    #[serde(default)]
    pub message: Option<String>,
}

impl Operation {
    /// Task id: the last segment of the operation name
    pub fn task_id(&self) -> &str {
        path::basename(&self.name)
    }
}

impl From<Operation> for TaskStatus {
    fn from(op: Operation) -> Self {
        let metadata = op.metadata.clone();
        let state = metadata
            .as_ref()
            .and_then(|m| m.state)
            .unwrap_or(match (op.done, &op.error) {
                (true, Some(_)) => TaskState::Failed,
                (true, None) => TaskState::Succeeded,
                (false, _) => TaskState::Pending,
            });
        let mut status = TaskStatus::new(op.task_id(), state);
        if let Some(m) = metadata {
            status.description = m.description;
            status.progress = m.progress;
        }
        status.error_message = op.error.and_then(|e| e.message);
        status
    }
}

/// Google API error envelope
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Human message of an error body, or the raw body
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .map(|r| r.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string())
}
