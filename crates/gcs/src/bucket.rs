//! Staging bucket naming

use eeu_core::{Error, Result};
use sha2::{Digest, Sha256};

/// Prefix of generated bucket names
pub const DEFAULT_BUCKET_PREFIX: &str = "eeutil-";

/// Bucket name derived from an asset root
///
/// Stable for a given root, so every run against the same account reuses
/// the same bucket.
pub fn default_bucket_name(root: &str) -> String {
    let digest = Sha256::digest(root.trim_end_matches('/').as_bytes());
    let hex = hex::encode(digest);
    format!("{DEFAULT_BUCKET_PREFIX}{}", &hex[..16])
}

/// Check a bucket name against the Cloud Storage naming rules
pub fn validate_bucket_name(name: &str) -> Result<()> {
    if name.len() < 3 || name.len() > 63 {
        return Err(Error::InvalidPath(format!(
            "Bucket name '{name}' must be 3-63 characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
    {
        return Err(Error::InvalidPath(format!(
            "Bucket name '{name}' may only contain lowercase letters, digits, '-', '_' and '.'"
        )));
    }
    let alphanumeric = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !alphanumeric(name.chars().next()) || !alphanumeric(name.chars().last()) {
        return Err(Error::InvalidPath(format!(
            "Bucket name '{name}' must start and end with a letter or digit"
        )));
    }
    if name.starts_with("goog") {
        return Err(Error::InvalidPath(format!(
            "Bucket name '{name}' cannot begin with 'goog'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bucket_name_is_stable() {
        let a = default_bucket_name("users/alice");
        assert_eq!(a, default_bucket_name("users/alice/"));
        assert_ne!(a, default_bucket_name("users/bob"));
        assert!(a.starts_with("eeutil-"));
        assert_eq!(a.len(), "eeutil-".len() + 16);
        validate_bucket_name(&a).unwrap();
    }

    #[test]
    fn test_validate_bucket_name() {
        assert!(validate_bucket_name("my-staging.bucket_1").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("Upper").is_err());
        assert!(validate_bucket_name("-leading").is_err());
        assert!(validate_bucket_name("trailing-").is_err());
        assert!(validate_bucket_name("google-stuff").is_err());
    }
}
