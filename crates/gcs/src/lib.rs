//! eeu-gcs: Cloud Storage staging adapter for eeutil
//!
//! This crate implements the StagingStore trait from eeu-core using
//! aws-sdk-s3 against the Cloud Storage XML interoperability API. It is
//! the only crate that directly depends on the AWS SDK.

pub mod bucket;
pub mod client;

pub use bucket::{default_bucket_name, validate_bucket_name};
pub use client::GcsStaging;
