//! Service trait definitions
//!
//! These traits define the interface to the remote platform and the staging
//! bucket. They keep the asset traversal, transfer and polling logic
//! decoupled from the HTTP and S3 clients that implement them.

use std::path::Path;

use async_trait::async_trait;

use crate::asset::{
    Acl, AssetInfo, AssetType, ExportRequest, IngestRequest, Properties, Quota, TaskStatus,
};
use crate::error::Result;

/// Asset tree operations on the remote platform
///
/// All ids are resolved asset ids, never relative paths.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// List the asset roots visible to the current credentials
    async fn list_asset_roots(&self) -> Result<Vec<AssetInfo>>;

    /// Get asset metadata; `Error::NotFound` when missing
    async fn get_asset(&self, id: &str) -> Result<AssetInfo>;

    /// List the direct children of a folder or image collection
    async fn list_assets(&self, parent: &str) -> Result<Vec<AssetInfo>>;

    /// Create an empty folder or image collection
    async fn create_asset(&self, id: &str, asset_type: AssetType, overwrite: bool) -> Result<()>;

    /// Copy a single (non-container) asset
    async fn copy_asset(&self, src: &str, dst: &str, overwrite: bool) -> Result<()>;

    /// Delete a single asset
    async fn delete_asset(&self, id: &str) -> Result<()>;

    async fn get_acl(&self, id: &str) -> Result<Acl>;

    async fn set_acl(&self, id: &str, acl: &Acl) -> Result<()>;

    /// Set (merge) properties on an asset
    async fn update_properties(&self, id: &str, properties: &Properties) -> Result<()>;

    /// Quota of a namespace root
    async fn get_quota(&self, root: &str) -> Result<Quota>;
}

/// Asynchronous jobs on the remote platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Start an image ingestion and return its task id
    async fn start_ingestion(&self, request: &IngestRequest) -> Result<String>;

    /// Start an image export and return its task id
    async fn start_export(&self, request: &ExportRequest) -> Result<String>;

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus>;

    async fn cancel_task(&self, task_id: &str) -> Result<()>;
}

/// Both halves of the remote platform
pub trait EarthEngine: AssetStore + TaskRunner {}

impl<T: AssetStore + TaskRunner + ?Sized> EarthEngine for T {}

/// Object storage bucket used to stage files
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Bucket name
    fn bucket(&self) -> &str;

    async fn bucket_exists(&self) -> Result<bool>;

    async fn create_bucket(&self) -> Result<()>;

    /// Upload a local file, returning the number of bytes written
    async fn upload_file(&self, local: &Path, key: &str) -> Result<u64>;

    /// Download an object to a local file, returning the number of bytes read
    async fn download_file(&self, key: &str, local: &Path) -> Result<u64>;

    /// Delete objects, ignoring ones that do not exist; returns deleted keys
    async fn delete_objects(&self, keys: &[String]) -> Result<Vec<String>>;
}
