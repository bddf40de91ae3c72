//! eeu-ee: Earth Engine adapter for eeutil
//!
//! This crate implements the `AssetStore` and `TaskRunner` traits from
//! eeu-core against the Earth Engine REST API.

pub mod auth;
pub mod client;
mod wire;

pub use auth::{Credentials, TokenProvider};
pub use client::EeClient;
