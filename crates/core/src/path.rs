//! Path parsing and resolution
//!
//! Handles asset ids relative to a root namespace (`users/<name>` for the
//! legacy project, `projects/<project>/assets/` otherwise), the REST resource
//! names those ids map to, and `gs://` URIs in the staging bucket.

use std::path::Path;

use crate::error::{Error, Result};

/// Project whose assets live under `users/` roots
pub const LEGACY_PROJECT: &str = "earthengine-legacy";

const LEGACY_PREFIX: &str = "projects/earthengine-legacy/assets/";

/// The root that relative asset paths resolve against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Home(String);

impl Home {
    /// Wrap an explicit root id
    pub fn new(root: impl Into<String>) -> Self {
        Self(root.into())
    }

    /// Root of a cloud project
    pub fn for_project(project: &str) -> Self {
        Self(format!("projects/{project}/assets/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Home {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve a user-supplied path into an absolute asset id
///
/// - empty → the root itself
/// - leading `/` → absolute, slash stripped
/// - `users/...` or `projects/...` → already absolute
/// - anything else → joined onto the root
pub fn resolve(path: &str, home: &Home) -> String {
    if path.is_empty() {
        return home.as_str().to_string();
    }
    if let Some(abs) = path.strip_prefix('/') {
        return abs.to_string();
    }
    if is_absolute(path) {
        return path.to_string();
    }
    join(home.as_str(), path)
}

/// Whether a path resolves without consulting the root
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
        || (path.len() > 6 && path.starts_with("users/"))
        || (path.len() > 9 && path.starts_with("projects/"))
}

/// Join two path segments with exactly the separator the base lacks
pub fn join(base: &str, child: &str) -> String {
    if base.is_empty() || base.ends_with('/') {
        format!("{base}{child}")
    } else {
        format!("{base}/{child}")
    }
}

/// Last segment of an asset id
pub fn basename(id: &str) -> &str {
    let id = id.trim_end_matches('/');
    match id.rfind('/') {
        Some(pos) => &id[pos + 1..],
        None => id,
    }
}

/// Everything before the last segment
pub fn parent(id: &str) -> Option<&str> {
    let id = id.trim_end_matches('/');
    id.rfind('/').map(|pos| &id[..pos])
}

/// REST resource name for an asset id
pub fn resource_name(id: &str) -> String {
    let id = id.trim_end_matches('/');
    if id.starts_with("projects/") {
        id.to_string()
    } else {
        format!("{LEGACY_PREFIX}{id}")
    }
}

/// Asset id for a REST resource name
pub fn asset_id(name: &str) -> String {
    name.strip_prefix(LEGACY_PREFIX).unwrap_or(name).to_string()
}

/// The namespace root an asset id lives under
///
/// `projects/<p>/assets` for cloud projects, `users/<u>` for legacy roots.
pub fn root_of(id: &str) -> Result<String> {
    let segments: Vec<&str> = id.trim_end_matches('/').split('/').collect();
    match segments.as_slice() {
        ["projects", project, "assets", ..] if !project.is_empty() => {
            Ok(format!("projects/{project}/assets"))
        }
        ["users", user, ..] if !user.is_empty() => Ok(format!("users/{user}")),
        _ => Err(Error::InvalidPath(format!(
            "'{id}' is not under a users/<name> or projects/<project>/assets root"
        ))),
    }
}

/// Ancestors strictly between the namespace root and the asset, top-down
pub fn intermediate_folders(id: &str) -> Result<Vec<String>> {
    let root = root_of(id)?;
    let id = id.trim_end_matches('/');
    let rest = id
        .strip_prefix(root.as_str())
        .map(|r| r.trim_start_matches('/'))
        .unwrap_or_default();

    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    let mut folders = Vec::new();
    let mut current = root;
    for segment in segments.iter().take(segments.len().saturating_sub(1)) {
        current = format!("{current}/{segment}");
        folders.push(current.clone());
    }
    Ok(folders)
}

/// Object key for a file staged under a prefix
pub fn staging_key(prefix: &str, file: &Path) -> String {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    join(prefix, &name)
}

/// A `gs://<bucket>/<object>` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GsUri {
    pub bucket: String,
    pub object: String,
}

impl GsUri {
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    /// Parse a `gs://bucket/object` string
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("gs://")
            .ok_or_else(|| Error::InvalidPath(format!("'{uri}' is not a gs:// URI")))?;
        match rest.split_once('/') {
            Some((bucket, object)) if !bucket.is_empty() && !object.is_empty() => {
                Ok(Self::new(bucket, object))
            }
            _ => Err(Error::InvalidPath(format!(
                "'{uri}' must have the form gs://<bucket>/<blob>"
            ))),
        }
    }

    /// Object key, provided the URI points into `bucket`
    pub fn key_in(&self, bucket: &str) -> Result<&str> {
        if self.bucket == bucket {
            Ok(&self.object)
        } else {
            Err(Error::InvalidPath(format!(
                "Path {self} does not match gs://{bucket}/<blob>"
            )))
        }
    }

    /// Last segment of the object key
    pub fn file_name(&self) -> &str {
        basename(&self.object)
    }
}

impl std::fmt::Display for GsUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.object)
    }
}

impl std::str::FromStr for GsUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
