//! Earth Engine REST client
//!
//! Implements `AssetStore` and `TaskRunner` over the v1 REST API with
//! bearer tokens from a [`TokenProvider`].

use std::time::Duration;

use async_trait::async_trait;
use eeu_core::path;
use eeu_core::{
    Acl, AssetInfo, AssetStore, AssetType, Error, ExportRequest, IngestRequest, Profile,
    Properties, Quota, Result, TaskRunner, TaskStatus,
};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::auth::{Credentials, TokenProvider};
use crate::wire::{self, ListAssetsResponse, Operation, Policy};

const PAGE_SIZE: &str = "1000";

/// Earth Engine API client
pub struct EeClient {
    http: Client,
    tokens: TokenProvider,
    endpoint: String,
    project: String,
}

impl EeClient {
    /// Create a client for a profile, loading its credentials
    pub fn new(profile: &Profile) -> Result<Self> {
        let credentials = Credentials::from_profile(profile)?;
        Self::with_credentials(profile, credentials)
    }

    pub fn with_credentials(profile: &Profile, credentials: Credentials) -> Result<Self> {
        let timeout = profile.timeout_config();
        let http = Client::builder()
            .connect_timeout(Duration::from_millis(timeout.connect_ms))
            .timeout(Duration::from_millis(timeout.read_ms))
            .user_agent(concat!("eeutil/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            tokens: TokenProvider::new(http.clone(), credentials),
            http,
            endpoint: profile.ee_endpoint.trim_end_matches('/').to_string(),
            project: profile.project().to_string(),
        })
    }

    /// Cloud project requests are billed to
    pub fn project(&self) -> &str {
        &self.project
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoint, path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<String> {
        let token = self.tokens.token().await?;
        let url = self.url(path);
        tracing::debug!("{method} {url}");

        let mut request_builder = self
            .http
            .request(method, &url)
            .bearer_auth(token)
            .query(query);
        if let Some(body) = body {
            request_builder = request_builder.json(body);
        }

        let response = request_builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Self::map_error(status, &error_body));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response: {e}")))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<T> {
        let text = self.send(method, path, query, body).await?;
        if text.trim().is_empty() {
            Ok(serde_json::from_str("null")?)
        } else {
            Ok(serde_json::from_str(&text)?)
        }
    }

    async fn request_no_response(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<()> {
        self.send(method, path, query, body).await.map(|_| ())
    }

    /// Map HTTP status codes to appropriate errors
    fn map_error(status: StatusCode, body: &str) -> Error {
        let message = wire::error_message(body);
        match status {
            StatusCode::NOT_FOUND => Error::NotFound(message),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => Error::Auth(message),
            StatusCode::CONFLICT => Error::Conflict(message),
            StatusCode::BAD_REQUEST => Error::InvalidPath(message),
            _ => Error::Network(format!("HTTP {}: {}", status.as_u16(), message)),
        }
    }

    /// All children of a resource, following page tokens
    async fn list_all(&self, parent: &str) -> Result<Vec<AssetInfo>> {
        let path = format!("{parent}:listAssets");
        let mut assets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }
            let page: ListAssetsResponse =
                self.request(Method::GET, &path, &query, None).await?;
            assets.extend(page.assets.into_iter().map(AssetInfo::from));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(assets)
    }

    async fn get_policy(&self, name: &str) -> Result<Policy> {
        self.request(
            Method::POST,
            &format!("{name}:getIamPolicy"),
            &[],
            Some(&json!({})),
        )
        .await
    }

    fn operation_name(&self, task_id: &str) -> String {
        if task_id.starts_with("projects/") {
            task_id.to_string()
        } else {
            format!("projects/{}/operations/{task_id}", self.project)
        }
    }
}

#[async_trait]
impl AssetStore for EeClient {
    async fn list_asset_roots(&self) -> Result<Vec<AssetInfo>> {
        self.list_all(&format!("projects/{}", self.project)).await
    }

    async fn get_asset(&self, id: &str) -> Result<AssetInfo> {
        let asset: wire::Asset = self
            .request(Method::GET, &path::resource_name(id), &[], None)
            .await?;
        Ok(asset.into())
    }

    async fn list_assets(&self, parent: &str) -> Result<Vec<AssetInfo>> {
        self.list_all(&path::resource_name(parent)).await
    }

    async fn create_asset(&self, id: &str, asset_type: AssetType, overwrite: bool) -> Result<()> {
        let name = path::resource_name(id);
        let (project, asset_id) = wire::create_target(&name)
            .ok_or_else(|| Error::InvalidPath(format!("Cannot create asset at '{id}'")))?;
        let query = [
            ("assetId", asset_id.to_string()),
            ("overwrite", overwrite.to_string()),
        ];
        self.request_no_response(
            Method::POST,
            &format!("{project}/assets"),
            &query,
            Some(&json!({ "type": asset_type.as_str() })),
        )
        .await
    }

    async fn copy_asset(&self, src: &str, dst: &str, overwrite: bool) -> Result<()> {
        let body = json!({
            "destinationName": path::resource_name(dst),
            "overwrite": overwrite,
        });
        self.request_no_response(
            Method::POST,
            &format!("{}:copy", path::resource_name(src)),
            &[],
            Some(&body),
        )
        .await
    }

    async fn delete_asset(&self, id: &str) -> Result<()> {
        self.request_no_response(Method::DELETE, &path::resource_name(id), &[], None)
            .await
    }

    async fn get_acl(&self, id: &str) -> Result<Acl> {
        let policy = self.get_policy(&path::resource_name(id)).await?;
        Ok(policy.to_acl())
    }

    async fn set_acl(&self, id: &str, acl: &Acl) -> Result<()> {
        let name = path::resource_name(id);
        let current = self.get_policy(&name).await?;
        let policy = Policy::from_acl(acl, &current.owners(), current.etag);
        self.request_no_response(
            Method::POST,
            &format!("{name}:setIamPolicy"),
            &[],
            Some(&json!({ "policy": policy })),
        )
        .await
    }

    async fn update_properties(&self, id: &str, properties: &Properties) -> Result<()> {
        if properties.is_empty() {
            return Ok(());
        }
        self.request_no_response(
            Method::PATCH,
            &path::resource_name(id),
            &[],
            Some(&wire::update_properties_body(properties)),
        )
        .await
    }

    async fn get_quota(&self, root: &str) -> Result<Quota> {
        let asset: wire::Asset = self
            .request(Method::GET, &path::resource_name(root), &[], None)
            .await?;
        asset
            .quota
            .map(Quota::from)
            .ok_or_else(|| Error::NotFound(format!("No quota reported for {root}")))
    }
}

#[async_trait]
impl TaskRunner for EeClient {
    async fn start_ingestion(&self, request: &IngestRequest) -> Result<String> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let body = wire::import_body(request, &request_id);
        let operation: Operation = self
            .request(
                Method::POST,
                &format!("projects/{}/image:import", self.project),
                &[],
                Some(&body),
            )
            .await?;
        Ok(operation.task_id().to_string())
    }

    async fn start_export(&self, request: &ExportRequest) -> Result<String> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let body = wire::export_body(request, &request_id);
        let operation: Operation = self
            .request(
                Method::POST,
                &format!("projects/{}/image:export", self.project),
                &[],
                Some(&body),
            )
            .await?;
        Ok(operation.task_id().to_string())
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus> {
        let operation: Operation = self
            .request(Method::GET, &self.operation_name(task_id), &[], None)
            .await?;
        Ok(operation.into())
    }

    async fn cancel_task(&self, task_id: &str) -> Result<()> {
        tracing::debug!("Cancelling task {task_id}");
        self.request_no_response(
            Method::POST,
            &format!("{}:cancel", self.operation_name(task_id)),
            &[],
            Some(&json!({})),
        )
        .await
    }
}
