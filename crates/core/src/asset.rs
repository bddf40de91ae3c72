//! Asset, ACL and task types shared by the service adapters
//!
//! These are the crate's own view of the remote objects; the REST wire
//! format lives in the Earth Engine adapter.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Free-form asset properties
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Kind of asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Folder,
    ImageCollection,
    Image,
    Table,
    Classifier,
    FeatureView,
    #[serde(other)]
    Unknown,
}

impl AssetType {
    /// Folders and image collections hold other assets
    pub const fn is_container(self) -> bool {
        matches!(self, AssetType::Folder | AssetType::ImageCollection)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            AssetType::Folder => "FOLDER",
            AssetType::ImageCollection => "IMAGE_COLLECTION",
            AssetType::Image => "IMAGE",
            AssetType::Table => "TABLE",
            AssetType::Classifier => "CLASSIFIER",
            AssetType::FeatureView => "FEATURE_VIEW",
            AssetType::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for an asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Asset id (`users/...` or `projects/.../assets/...`)
    pub id: String,

    /// Asset type
    #[serde(rename = "type")]
    pub asset_type: AssetType,

    /// Last update time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<Timestamp>,

    /// Acquisition start time (images)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Timestamp>,

    /// Acquisition end time (images)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,

    /// Size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    /// Human-readable size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,

    /// Asset properties
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub properties: Properties,

    /// Quota, reported for root folders only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<Quota>,
}

impl AssetInfo {
    pub fn new(id: impl Into<String>, asset_type: AssetType) -> Self {
        Self {
            id: id.into(),
            asset_type,
            update_time: None,
            start_time: None,
            end_time: None,
            size_bytes: None,
            size_human: None,
            properties: Properties::new(),
            quota: None,
        }
    }

    /// Set the size and its human-readable form
    pub fn with_size(mut self, size: u64) -> Self {
        self.size_bytes = Some(size);
        self.size_human = Some(humansize::format_size(size, humansize::BINARY));
        self
    }

    pub fn is_container(&self) -> bool {
        self.asset_type.is_container()
    }

    /// Last segment of the id
    pub fn basename(&self) -> &str {
        crate::path::basename(&self.id)
    }
}

/// Storage quota of an asset root
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub asset_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_assets: Option<u64>,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size_bytes: Option<u64>,
}

impl Quota {
    /// Fraction of the byte quota in use, when a limit is known
    pub fn size_ratio(&self) -> Option<f64> {
        self.max_size_bytes
            .filter(|max| *max > 0)
            .map(|max| self.size_bytes as f64 / max as f64)
    }
}

/// Access control list of an asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,
    #[serde(default)]
    pub writers: Vec<String>,
    #[serde(default)]
    pub readers: Vec<String>,
    #[serde(default)]
    pub all_users_can_read: bool,
}

/// Partial ACL: only the fields present are changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_users_can_read: Option<bool>,
}

/// Requested ACL change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclUpdate {
    Public,
    Private,
    Spec(AclSpec),
}

impl std::str::FromStr for AclUpdate {
    type Err = Error;

    /// `public`, `private`, or a JSON ACL object
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(AclUpdate::Public),
            "private" => Ok(AclUpdate::Private),
            other => Ok(AclUpdate::Spec(serde_json::from_str(other)?)),
        }
    }
}

impl Acl {
    /// Apply an update on top of this ACL
    pub fn apply(&mut self, update: &AclUpdate) {
        match update {
            AclUpdate::Public => self.all_users_can_read = true,
            AclUpdate::Private => self.all_users_can_read = false,
            AclUpdate::Spec(spec) => {
                if let Some(writers) = &spec.writers {
                    self.writers = writers.clone();
                }
                if let Some(readers) = &spec.readers {
                    self.readers = readers.clone();
                }
                if let Some(public) = spec.all_users_can_read {
                    self.all_users_can_read = public;
                }
            }
        }
    }
}

/// State of an ingestion or export task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    #[serde(alias = "READY", alias = "UNSUBMITTED")]
    Pending,
    Running,
    #[serde(alias = "CANCEL_REQUESTED")]
    Cancelling,
    #[serde(alias = "COMPLETED")]
    Succeeded,
    Cancelled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Cancelled | TaskState::Failed
        )
    }

    pub const fn is_failure(self) -> bool {
        matches!(self, TaskState::Cancelled | TaskState::Failed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Running => "RUNNING",
            TaskState::Cancelling => "CANCELLING",
            TaskState::Succeeded => "SUCCEEDED",
            TaskState::Cancelled => "CANCELLED",
            TaskState::Failed => "FAILED",
            TaskState::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub id: String,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl TaskStatus {
    pub fn new(id: impl Into<String>, state: TaskState) -> Self {
        Self {
            id: id.into(),
            state,
            description: None,
            error_message: None,
            progress: None,
        }
    }
}

/// Image ingestion from staged files
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRequest {
    /// Destination asset id (resolved)
    pub asset: String,
    /// `gs://` sources of the single tileset
    pub sources: Vec<String>,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    /// Band names, in file order
    pub bands: Vec<String>,
    pub properties: Properties,
    pub overwrite: bool,
}

impl IngestRequest {
    pub fn new(asset: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            sources: vec![source.into()],
            start_time: None,
            end_time: None,
            bands: Vec::new(),
            properties: Properties::new(),
            overwrite: false,
        }
    }

    /// Tag the image with a single acquisition time
    pub fn with_date(mut self, date: Timestamp) -> Self {
        self.start_time = Some(date);
        self.end_time = Some(date);
        self
    }
}

/// GeoTIFF export of an image asset into the staging bucket
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    /// Source image asset id (resolved)
    pub asset: String,
    pub bucket: String,
    /// Object name prefix; `.tif` is appended by the platform
    pub file_name_prefix: String,
    pub description: Option<String>,
    /// Extra export parameters passed through verbatim
    pub options: Properties,
}

/// Parse a date tag
///
/// Accepts milliseconds since the epoch, an RFC 3339 timestamp, or a civil
/// date (`YYYY-MM-DD`, taken as UTC midnight).
pub fn parse_date(value: &str) -> Result<Timestamp> {
    let value = value.trim();
    if let Ok(ms) = value.parse::<i64>() {
        return Timestamp::from_millisecond(ms)
            .map_err(|e| Error::General(format!("Invalid date '{value}': {e}")));
    }
    if let Ok(ts) = value.parse::<Timestamp>() {
        return Ok(ts);
    }
    let date: jiff::civil::Date = value
        .parse()
        .map_err(|e| Error::General(format!("Invalid date '{value}': {e}")))?;
    date.to_zoned(jiff::tz::TimeZone::UTC)
        .map(|z| z.timestamp())
        .map_err(|e| Error::General(format!("Invalid date '{value}': {e}")))
}
