//! Staging bucket client
//!
//! Wraps aws-sdk-s3 pointed at the Cloud Storage XML interoperability
//! endpoint and implements the StagingStore trait from eeu-core.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{RequestChecksumCalculation, ResponseChecksumValidation};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use eeu_core::{Error, Profile, Result, StagingStore};
use tokio::io::AsyncWriteExt;

use crate::bucket;

/// Region name Cloud Storage accepts for SigV4 requests
const GCS_REGION: &str = "auto";

/// Cloud Storage bucket used for staging
pub struct GcsStaging {
    inner: aws_sdk_s3::Client,
    bucket: String,
}

impl GcsStaging {
    /// Create a client for `bucket` with the profile's HMAC keys
    pub async fn new(profile: &Profile, bucket: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        bucket::validate_bucket_name(&bucket)?;

        let (Some(access_key), Some(secret_key)) =
            (profile.hmac_access_key.clone(), profile.hmac_secret.clone())
        else {
            return Err(Error::Auth(
                "Staging bucket access needs GCS_HMAC_ACCESS_KEY and GCS_HMAC_SECRET".into(),
            ));
        };

        let credentials = aws_credential_types::Credentials::new(
            access_key,
            secret_key,
            None, // session token
            None, // expiry
            "eeu-hmac-credentials",
        );

        let timeout = profile.timeout_config();
        let timeouts = aws_config::timeout::TimeoutConfig::builder()
            .connect_timeout(Duration::from_millis(timeout.connect_ms))
            .build();

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(GCS_REGION))
            .endpoint_url(&profile.storage_endpoint)
            .timeout_config(timeouts)
            .load()
            .await;

        // Cloud Storage rejects the SDK's default CRC trailers
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            bucket,
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    async fn delete_one(&self, key: &str) -> Result<bool> {
        match self
            .inner
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if error_code(&e) == Some("NoSuchKey") => Ok(false),
            Err(e) => Err(map_sdk_error(e, key)),
        }
    }
}

fn error_code<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> Option<&str> {
    err.code()
}

/// Map SDK errors onto eeu-core errors by their S3 error code
fn map_sdk_error<E, R>(err: SdkError<E, R>, subject: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.code() {
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound") => Error::NotFound(subject.to_string()),
        Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch") => {
            Error::Auth(format!("{subject}: {}", DisplayErrorContext(&err)))
        }
        Some("BucketAlreadyExists" | "BucketAlreadyOwnedByYou") => {
            Error::Conflict(format!("Bucket already exists: {subject}"))
        }
        _ => Error::Network(DisplayErrorContext(&err).to_string()),
    }
}

#[async_trait]
impl StagingStore for GcsStaging {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> Result<bool> {
        match self.inner.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    Ok(false)
                } else {
                    Err(map_sdk_error(e, &self.bucket))
                }
            }
        }
    }

    async fn create_bucket(&self) -> Result<()> {
        self.inner
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &self.bucket))?;
        Ok(())
    }

    async fn upload_file(&self, local: &Path, key: &str) -> Result<u64> {
        let size = tokio::fs::metadata(local).await?.len();
        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| Error::General(format!("Cannot read {}: {e}", local.display())))?;
        let content_type = mime_guess::from_path(local)
            .first_or_octet_stream()
            .to_string();

        self.inner
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;

        Ok(size)
    }

    async fn download_file(&self, key: &str, local: &Path) -> Result<u64> {
        let response = self
            .inner
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;

        if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut body = response.body;
        let mut file = tokio::fs::File::create(local).await?;
        let mut written = 0u64;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<Vec<String>> {
        // The XML API has no multi-object delete, so go one by one
        let mut deleted = Vec::with_capacity(keys.len());
        for key in keys {
            if self.delete_one(key).await? {
                deleted.push(key.clone());
            } else {
                tracing::debug!("gs://{}/{key} was already gone", self.bucket);
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        let mut profile = Profile::new("test");
        profile.hmac_access_key = Some("GOOG1EXAMPLE".into());
        profile.hmac_secret = Some("secret".into());
        profile
    }

    #[tokio::test]
    async fn test_new_requires_hmac_keys() {
        let err = GcsStaging::new(&Profile::new("test"), "staging-bucket")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn test_new_rejects_bad_bucket_name() {
        let err = GcsStaging::new(&profile(), "Bad_Bucket")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_new_uses_bucket() {
        let staging = GcsStaging::new(&profile(), "staging-bucket").await.unwrap();
        assert_eq!(staging.bucket(), "staging-bucket");
        assert_eq!(
            staging.inner().config().region().map(|r| r.as_ref()),
            Some(GCS_REGION)
        );
    }
}
