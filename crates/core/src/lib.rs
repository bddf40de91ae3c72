//! eeu-core: Core library for the eeutil Earth Engine client
//!
//! This crate provides the core functionality for eeutil, including:
//! - Configuration and profile management
//! - Asset path resolution
//! - Recursive asset operations over the `AssetStore` trait
//! - Task polling and staged transfers through the `StagingStore` trait
//!
//! This crate is independent of the HTTP and storage SDKs, so the traversal,
//! polling and staging logic can be tested against in-memory services.

pub mod asset;
pub mod assets;
pub mod config;
pub mod error;
pub mod path;
pub mod profile;
pub mod tasks;
pub mod traits;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;

pub use asset::{
    Acl, AclSpec, AclUpdate, AssetInfo, AssetType, ExportRequest, IngestRequest, Properties,
    Quota, TaskState, TaskStatus, parse_date,
};
pub use assets::AssetManager;
pub use config::{Config, ConfigManager, Defaults};
pub use error::{Error, Result};
pub use path::{GsUri, Home};
pub use profile::{Profile, ProfileManager};
pub use tasks::{TaskOutcome, WaitOptions};
pub use traits::{AssetStore, EarthEngine, StagingStore, TaskRunner};
pub use transfer::{DownloadOptions, IngestOptions, Transfer, TaskReport, UploadOptions};
