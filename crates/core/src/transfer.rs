//! Staging, ingestion and export
//!
//! Files travel between local disk and the platform through the staging
//! bucket: uploads are staged then ingested, downloads are exported then
//! fetched. Staged objects are removed afterwards unless `clean` is off.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jiff::Timestamp;

use crate::asset::{AclUpdate, ExportRequest, IngestRequest, Properties, TaskState};
use crate::assets::AssetManager;
use crate::error::{Error, Result};
use crate::path::{self, GsUri};
use crate::tasks::{self, WaitOptions};
use crate::traits::{EarthEngine, StagingStore};

/// Extension the platform appends to GeoTIFF exports
const EXPORT_EXTENSION: &str = "tif";

/// Parameters of an image ingestion
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Acquisition time tag
    pub date: Option<Timestamp>,
    /// Band names, in file order
    pub bands: Vec<String>,
    pub properties: Properties,
    /// Replace an existing asset
    pub overwrite: bool,
}

/// Options for [`Transfer::upload`] and [`Transfer::upload_many`]
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Object prefix in the staging bucket
    pub gs_prefix: String,
    pub ingest: IngestOptions,
    /// Make the new assets public
    pub public: bool,
    /// Remove staged files afterwards
    pub clean: bool,
    pub wait: WaitOptions,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            gs_prefix: String::new(),
            ingest: IngestOptions::default(),
            public: false,
            clean: true,
            wait: WaitOptions::default().with_timeout(Duration::from_secs(300)),
        }
    }
}

/// Options for [`Transfer::download`] and [`Transfer::download_many`]
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Object prefix in the staging bucket
    pub gs_prefix: String,
    /// Directory for downloaded files
    pub directory: Option<PathBuf>,
    /// Remove exported files from the bucket afterwards
    pub clean: bool,
    /// Extra export parameters (scale, region, crs, ...)
    pub export: Properties,
    pub wait: WaitOptions,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            gs_prefix: String::new(),
            directory: None,
            clean: true,
            export: Properties::new(),
            wait: WaitOptions::default(),
        }
    }
}

/// A started export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportHandle {
    /// Source asset id
    pub asset: String,
    pub task: String,
    /// Object the export will write
    pub uri: GsUri,
}

/// What happened to one asset during an upload or download
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub asset: String,
    pub task: String,
    /// The task succeeded (and, for downloads, the file was fetched)
    pub completed: bool,
    /// Local file written by a download
    pub local: Option<PathBuf>,
}

/// Moves files between local disk, the staging bucket and the platform
pub struct Transfer<'a, E: EarthEngine + ?Sized, S: StagingStore + ?Sized> {
    assets: &'a AssetManager<'a, E>,
    staging: &'a S,
}

impl<'a, E: EarthEngine + ?Sized, S: StagingStore + ?Sized> Transfer<'a, E, S> {
    pub fn new(assets: &'a AssetManager<'a, E>, staging: &'a S) -> Self {
        Self { assets, staging }
    }

    fn engine(&self) -> &'a E {
        self.assets.store()
    }

    pub fn bucket(&self) -> &str {
        self.staging.bucket()
    }

    /// `gs://` URI of an object in the staging bucket
    pub fn uri(&self, key: &str) -> GsUri {
        GsUri::new(self.staging.bucket(), key)
    }

    /// Create the staging bucket if it does not exist yet
    ///
    /// Returns whether the bucket was created.
    pub async fn ensure_bucket(&self) -> Result<bool> {
        if self.staging.bucket_exists().await? {
            return Ok(false);
        }
        tracing::info!(
            "Bucket {} does not exist, creating",
            self.staging.bucket()
        );
        self.staging.create_bucket().await?;
        Ok(true)
    }

    /// Upload local files under `prefix`
    ///
    /// When one upload fails, the files already staged are removed again.
    pub async fn stage(&self, files: &[PathBuf], prefix: &str) -> Result<Vec<GsUri>> {
        let mut uris = Vec::with_capacity(files.len());
        for file in files {
            let key = path::staging_key(prefix, file);
            let uri = self.uri(&key);
            tracing::debug!("Uploading {} to {uri}", file.display());
            if let Err(e) = self.staging.upload_file(file, &key).await {
                self.clean_up(&uris, true).await;
                return Err(e);
            }
            uris.push(uri);
        }
        Ok(uris)
    }

    /// Delete staged objects; missing ones are ignored
    ///
    /// Every URI must point into the staging bucket. Returns the keys that
    /// were actually deleted.
    pub async fn unstage(&self, uris: &[GsUri]) -> Result<Vec<String>> {
        let bucket = self.staging.bucket();
        let keys = uris
            .iter()
            .map(|uri| uri.key_in(bucket).map(str::to_string))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("Deleting {keys:?} from gs://{bucket}");
        self.staging.delete_objects(&keys).await
    }

    /// Download a staged object
    ///
    /// `filename` defaults to the object's basename and is placed in
    /// `directory` when one is given. Returns the local path.
    pub async fn fetch(
        &self,
        uri: &GsUri,
        filename: Option<&Path>,
        directory: Option<&Path>,
    ) -> Result<PathBuf> {
        let key = uri.key_in(self.staging.bucket())?;
        let filename = filename
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(uri.file_name()));
        let local = match directory {
            Some(dir) => dir.join(filename),
            None => filename,
        };
        tracing::debug!("Downloading {uri} to {}", local.display());
        self.staging.download_file(key, &local).await?;
        Ok(local)
    }

    /// Start an image ingestion from a staged object
    ///
    /// Waits for the task when `wait` is given. Returns the task id.
    pub async fn ingest(
        &self,
        uri: &GsUri,
        asset: &str,
        options: &IngestOptions,
        wait: Option<&WaitOptions>,
    ) -> Result<String> {
        let id = self.assets.resolve(asset).await?;
        let request = ingest_request(uri, &id, options);
        let task = self.engine().start_ingestion(&request).await?;
        tracing::debug!("Ingesting {uri} to {id}: {task}");
        if let Some(wait) = wait {
            tasks::wait_for_task(self.engine(), &task, wait).await?;
        }
        Ok(task)
    }

    /// Stage a file, ingest it and wait for the task
    ///
    /// Staged files are removed afterwards (unless `clean` is off) whether or
    /// not the ingestion succeeded; an ingestion error is returned after the
    /// cleanup.
    pub async fn upload(
        &self,
        file: &Path,
        asset: &str,
        options: &UploadOptions,
    ) -> Result<TaskReport> {
        let uris = self
            .stage(&[file.to_path_buf()], &options.gs_prefix)
            .await?;
        let result = self.ingest_staged(&uris, asset, options).await;
        self.clean_up(&uris, options.clean).await;
        if let Err(e) = &result {
            tracing::error!("{e}");
        }
        result
    }

    async fn ingest_staged(
        &self,
        uris: &[GsUri],
        asset: &str,
        options: &UploadOptions,
    ) -> Result<TaskReport> {
        let uri = uris
            .first()
            .ok_or_else(|| Error::General("Nothing was staged".into()))?;
        let id = self.assets.resolve(asset).await?;
        let task = self.ingest(uri, &id, &options.ingest, None).await?;
        let completed = tasks::wait_for_task(self.engine(), &task, &options.wait).await?;
        if completed && options.public {
            self.assets
                .set_acl(&id, &AclUpdate::Public, false, false)
                .await?;
        }
        Ok(TaskReport {
            asset: id,
            task,
            completed,
            local: None,
        })
    }

    /// Stage several files and ingest each into its asset
    ///
    /// `files` and `assets` must have the same length; `dates`, when not
    /// empty, too. All ingestions start before any is waited on.
    pub async fn upload_many(
        &self,
        files: &[PathBuf],
        assets: &[String],
        dates: &[Timestamp],
        options: &UploadOptions,
    ) -> Result<Vec<TaskReport>> {
        if files.len() != assets.len() {
            return Err(Error::General(format!(
                "Got {} files for {} assets",
                files.len(),
                assets.len()
            )));
        }
        if !dates.is_empty() && dates.len() != files.len() {
            return Err(Error::General(format!(
                "Got {} dates for {} files",
                dates.len(),
                files.len()
            )));
        }

        let uris = self.stage(files, &options.gs_prefix).await?;
        let result = self.ingest_many(&uris, assets, dates, options).await;
        self.clean_up(&uris, options.clean).await;
        if let Err(e) = &result {
            tracing::error!("{e}");
        }
        result
    }

    async fn ingest_many(
        &self,
        uris: &[GsUri],
        assets: &[String],
        dates: &[Timestamp],
        options: &UploadOptions,
    ) -> Result<Vec<TaskReport>> {
        let mut started = Vec::with_capacity(uris.len());
        for (i, (uri, asset)) in uris.iter().zip(assets).enumerate() {
            let mut ingest = options.ingest.clone();
            if let Some(date) = dates.get(i) {
                ingest.date = Some(*date);
            }
            let id = self.assets.resolve(asset).await?;
            let task = self.ingest(uri, &id, &ingest, None).await?;
            started.push((id, task));
        }

        let task_ids: Vec<String> = started.iter().map(|(_, task)| task.clone()).collect();
        tasks::wait_for_tasks(self.engine(), &task_ids, &options.wait).await?;

        let mut reports = Vec::with_capacity(started.len());
        for (asset, task) in started {
            let completed = self.succeeded(&task).await?;
            if completed && options.public {
                self.assets
                    .set_acl(&asset, &AclUpdate::Public, false, false)
                    .await?;
            }
            reports.push(TaskReport {
                asset,
                task,
                completed,
                local: None,
            });
        }
        Ok(reports)
    }

    /// Start a GeoTIFF export of an image into the staging bucket
    ///
    /// The object is `{prefix}/{stem}.tif`; `stem` defaults to the asset's
    /// basename.
    pub async fn export(
        &self,
        asset: &str,
        stem: Option<&str>,
        prefix: &str,
        extra: &Properties,
    ) -> Result<ExportHandle> {
        let id = self.assets.resolve(asset).await?;
        let stem = stem.unwrap_or_else(|| path::basename(&id)).to_string();
        let file_name_prefix = path::join(prefix, &stem);
        let request = ExportRequest {
            asset: id.clone(),
            bucket: self.staging.bucket().to_string(),
            file_name_prefix: file_name_prefix.clone(),
            description: Some(export_description(&stem)),
            options: extra.clone(),
        };
        let task = self.engine().start_export(&request).await?;
        let uri = self.uri(&format!("{file_name_prefix}.{EXPORT_EXTENSION}"));
        tracing::debug!("Exporting asset {id} to {uri}");
        Ok(ExportHandle {
            asset: id,
            task,
            uri,
        })
    }

    /// Export an image, wait, and fetch the GeoTIFF
    ///
    /// The local file is `filename` with a `.tif` extension, or
    /// `{basename}.tif` when no filename is given.
    pub async fn download(
        &self,
        asset: &str,
        filename: Option<&Path>,
        options: &DownloadOptions,
    ) -> Result<TaskReport> {
        let stem = filename
            .and_then(Path::file_stem)
            .map(|s| s.to_string_lossy().to_string());
        let handle = self
            .export(asset, stem.as_deref(), &options.gs_prefix, &options.export)
            .await?;

        let local = match filename {
            Some(name) => name.with_extension(EXPORT_EXTENSION),
            None => PathBuf::from(handle.uri.file_name()),
        };

        let completed = tasks::wait_for_task(self.engine(), &handle.task, &options.wait).await?;
        let local = if completed {
            Some(self.fetch_export(&handle, &local, options).await?)
        } else {
            None
        };

        Ok(TaskReport {
            asset: handle.asset,
            task: handle.task,
            completed: local.is_some(),
            local,
        })
    }

    /// Export several images, wait for all, then fetch each
    ///
    /// Each file is named after its asset, so assets sharing a basename are
    /// rejected before anything is exported.
    pub async fn download_many(
        &self,
        assets: &[String],
        options: &DownloadOptions,
    ) -> Result<Vec<TaskReport>> {
        let mut ids = Vec::with_capacity(assets.len());
        let mut stems = HashSet::new();
        for asset in assets {
            let id = self.assets.resolve(asset).await?;
            if !stems.insert(path::basename(&id).to_string()) {
                return Err(Error::Conflict(format!(
                    "More than one asset would download to {}.{EXPORT_EXTENSION}",
                    path::basename(&id)
                )));
            }
            ids.push(id);
        }

        let mut handles = Vec::with_capacity(ids.len());
        for id in &ids {
            handles.push(
                self.export(id, None, &options.gs_prefix, &options.export)
                    .await?,
            );
        }

        let task_ids: Vec<String> = handles.iter().map(|h| h.task.clone()).collect();
        tasks::wait_for_tasks(self.engine(), &task_ids, &options.wait).await?;

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            let local = if self.succeeded(&handle.task).await? {
                let name = PathBuf::from(handle.uri.file_name());
                Some(self.fetch_export(&handle, &name, options).await?)
            } else {
                None
            };
            reports.push(TaskReport {
                asset: handle.asset,
                task: handle.task,
                completed: local.is_some(),
                local,
            });
        }
        Ok(reports)
    }

    async fn fetch_export(
        &self,
        handle: &ExportHandle,
        local: &Path,
        options: &DownloadOptions,
    ) -> Result<PathBuf> {
        let path = self
            .fetch(&handle.uri, Some(local), options.directory.as_deref())
            .await?;
        if options.clean {
            self.unstage(std::slice::from_ref(&handle.uri)).await?;
        }
        Ok(path)
    }

    async fn succeeded(&self, task: &str) -> Result<bool> {
        let status = self.engine().task_status(task).await?;
        Ok(status.state == TaskState::Succeeded)
    }

    async fn clean_up(&self, uris: &[GsUri], clean: bool) {
        if !clean {
            return;
        }
        if let Err(e) = self.unstage(uris).await {
            tracing::warn!("Could not remove staged files: {e}");
        }
    }
}

fn ingest_request(uri: &GsUri, asset: &str, options: &IngestOptions) -> IngestRequest {
    let mut request = IngestRequest::new(asset, uri.to_string());
    if let Some(date) = options.date {
        request = request.with_date(date);
    }
    request.bands = options.bands.clone();
    request.properties = options.properties.clone();
    request.overwrite = options.overwrite;
    request
}

/// Task descriptions are limited to 100 characters of a restricted set
fn export_description(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | ',' | ':' | ';' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(100)
        .collect();
    if cleaned.is_empty() {
        "eeu_export".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetType;
    use crate::path::LEGACY_PROJECT;
    use crate::testing::{FakeEarthEngine, FakeStaging};
    use tempfile::TempDir;

    fn fast_wait() -> WaitOptions {
        WaitOptions {
            timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(1),
            strict: true,
        }
    }

    fn engine() -> FakeEarthEngine {
        let ee = FakeEarthEngine::with_roots(&["users/alice"]);
        ee.add("users/alice/col", AssetType::ImageCollection);
        ee
    }

    fn write_file(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[tokio::test]
    async fn test_ensure_bucket_creates_once() {
        let ee = engine();
        let staging = FakeStaging::missing("stage");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        assert!(transfer.ensure_bucket().await.unwrap());
        assert!(!transfer.ensure_bucket().await.unwrap());
    }

    #[tokio::test]
    async fn test_stage_and_unstage() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.tif", b"aaa");
        let b = write_file(&dir, "b.tif", b"bb");

        let ee = engine();
        let staging = FakeStaging::new("stage");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let uris = transfer.stage(&[a, b], "tmp").await.unwrap();
        assert_eq!(
            uris.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["gs://stage/tmp/a.tif", "gs://stage/tmp/b.tif"]
        );
        assert_eq!(staging.keys(), vec!["tmp/a.tif", "tmp/b.tif"]);

        let mut with_missing = uris.clone();
        with_missing.push(GsUri::new("stage", "tmp/gone.tif"));
        let deleted = transfer.unstage(&with_missing).await.unwrap();
        assert_eq!(deleted, vec!["tmp/a.tif", "tmp/b.tif"]);
        assert!(staging.keys().is_empty());
    }

    #[tokio::test]
    async fn test_stage_failure_removes_partial_uploads() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.tif", b"aaa");
        let missing = dir.path().join("missing.tif");

        let ee = engine();
        let staging = FakeStaging::new("stage");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        assert!(transfer.stage(&[a, missing], "tmp").await.is_err());
        assert!(staging.keys().is_empty());
    }

    #[tokio::test]
    async fn test_unstage_rejects_other_bucket() {
        let ee = engine();
        let staging = FakeStaging::new("stage");
        staging.put("x.tif", b"x");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let err = transfer
            .unstage(&[GsUri::new("stage", "x.tif"), GsUri::new("other", "x.tif")])
            .await
            .unwrap_err();
        assert!(
            err.to_string()
                .contains("Path gs://other/x.tif does not match gs://stage/<blob>")
        );
        // nothing is deleted when any URI is rejected
        assert_eq!(staging.keys(), vec!["x.tif"]);
    }

    #[tokio::test]
    async fn test_fetch_defaults_to_object_name() {
        let dir = TempDir::new().unwrap();
        let ee = engine();
        let staging = FakeStaging::new("stage");
        staging.put("out/img.tif", b"pixels");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let local = transfer
            .fetch(&GsUri::new("stage", "out/img.tif"), None, Some(dir.path()))
            .await
            .unwrap();
        assert_eq!(local, dir.path().join("img.tif"));
        assert_eq!(std::fs::read(&local).unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn test_ingest_builds_request() {
        let ee = engine();
        let staging = FakeStaging::new("stage");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let options = IngestOptions {
            date: Some(crate::asset::parse_date("2020-01-01").unwrap()),
            bands: vec!["red".into(), "nir".into()],
            ..IngestOptions::default()
        };
        let task = transfer
            .ingest(
                &GsUri::new("stage", "a.tif"),
                "col/a",
                &options,
                Some(&fast_wait()),
            )
            .await
            .unwrap();
        assert!(task.starts_with("INGEST_"));

        let request = &ee.ingestions()[0];
        assert_eq!(request.asset, "users/alice/col/a");
        assert_eq!(request.sources, vec!["gs://stage/a.tif"]);
        assert_eq!(request.start_time, request.end_time);
        assert_eq!(request.bands, vec!["red", "nir"]);
    }

    #[tokio::test]
    async fn test_upload_cleans_and_sets_public() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "a.tif", b"aaa");

        let ee = engine();
        let staging = FakeStaging::new("stage");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let options = UploadOptions {
            public: true,
            wait: fast_wait(),
            ..UploadOptions::default()
        };
        let report = transfer.upload(&file, "col/a", &options).await.unwrap();
        assert!(report.completed);
        assert_eq!(report.asset, "users/alice/col/a");
        assert!(ee.acl("users/alice/col/a").unwrap().all_users_can_read);
        assert!(staging.keys().is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_still_cleans() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "a.tif", b"aaa");

        let ee = engine();
        ee.fail_tasks_with(TaskState::Failed);
        let staging = FakeStaging::new("stage");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let options = UploadOptions {
            wait: fast_wait(),
            ..UploadOptions::default()
        };
        let err = transfer.upload(&file, "col/a", &options).await.unwrap_err();
        assert!(matches!(err, Error::TaskFailed { .. }));
        assert!(staging.keys().is_empty());
    }

    #[tokio::test]
    async fn test_upload_keeps_staged_files_without_clean() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "a.tif", b"aaa");

        let ee = engine();
        let staging = FakeStaging::new("stage");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let options = UploadOptions {
            gs_prefix: "keep".into(),
            clean: false,
            wait: fast_wait(),
            ..UploadOptions::default()
        };
        transfer.upload(&file, "col/a", &options).await.unwrap();
        assert_eq!(staging.keys(), vec!["keep/a.tif"]);
    }

    #[tokio::test]
    async fn test_upload_many_lines_up_dates() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.tif", b"a");
        let b = write_file(&dir, "b.tif", b"b");

        let ee = engine();
        let staging = FakeStaging::new("stage");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let d1 = crate::asset::parse_date("2020-01-01").unwrap();
        let d2 = crate::asset::parse_date("2020-02-01").unwrap();
        let options = UploadOptions {
            wait: fast_wait(),
            ..UploadOptions::default()
        };
        let reports = transfer
            .upload_many(
                &[a, b],
                &["col/a".to_string(), "col/b".to_string()],
                &[d1, d2],
                &options,
            )
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.completed));
        let ingestions = ee.ingestions();
        assert_eq!(ingestions[0].start_time, Some(d1));
        assert_eq!(ingestions[1].start_time, Some(d2));
        assert!(staging.keys().is_empty());
    }

    #[tokio::test]
    async fn test_upload_many_rejects_mismatched_lengths() {
        let ee = engine();
        let staging = FakeStaging::new("stage");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let err = transfer
            .upload_many(
                &[PathBuf::from("a.tif")],
                &[],
                &[],
                &UploadOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 files for 0 assets"));
    }

    #[tokio::test]
    async fn test_export_object_name() {
        let ee = engine();
        let staging = FakeStaging::new("stage");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let handle = transfer
            .export("col/scene 1", None, "exports", &Properties::new())
            .await
            .unwrap();
        assert_eq!(handle.asset, "users/alice/col/scene 1");
        assert_eq!(handle.uri.to_string(), "gs://stage/exports/scene 1.tif");

        let request = &ee.exports()[0];
        assert_eq!(request.file_name_prefix, "exports/scene 1");
        assert_eq!(request.description.as_deref(), Some("scene_1"));
    }

    #[tokio::test]
    async fn test_download_fetches_and_cleans() {
        let dir = TempDir::new().unwrap();
        let ee = engine();
        ee.add("users/alice/col/img", AssetType::Image);
        let staging = FakeStaging::new("stage");
        // the platform writes the export before the task succeeds
        staging.put("out.tif", b"pixels");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let options = DownloadOptions {
            directory: Some(dir.path().to_path_buf()),
            wait: fast_wait(),
            ..DownloadOptions::default()
        };
        let report = transfer
            .download("col/img", Some(Path::new("out.geotiff")), &options)
            .await
            .unwrap();

        let local = dir.path().join("out.tif");
        assert_eq!(report.local.as_deref(), Some(local.as_path()));
        assert!(report.completed);
        assert_eq!(std::fs::read(&local).unwrap(), b"pixels");
        assert!(staging.keys().is_empty());
    }

    #[tokio::test]
    async fn test_download_lenient_failure_skips_fetch() {
        let ee = engine();
        ee.fail_tasks_with(TaskState::Failed);
        let staging = FakeStaging::new("stage");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let options = DownloadOptions {
            wait: WaitOptions {
                strict: false,
                ..fast_wait()
            },
            ..DownloadOptions::default()
        };
        let report = transfer.download("col/img", None, &options).await.unwrap();
        assert!(!report.completed);
        assert!(report.local.is_none());
    }

    #[tokio::test]
    async fn test_download_many() {
        let dir = TempDir::new().unwrap();
        let ee = engine();
        let staging = FakeStaging::new("stage");
        staging.put("p/a.tif", b"a");
        staging.put("p/b.tif", b"b");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let options = DownloadOptions {
            gs_prefix: "p".into(),
            directory: Some(dir.path().to_path_buf()),
            clean: false,
            wait: fast_wait(),
            ..DownloadOptions::default()
        };
        let reports = transfer
            .download_many(&["col/a".to_string(), "col/b".to_string()], &options)
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(
            reports[1].local.as_deref(),
            Some(dir.path().join("b.tif").as_path())
        );
        assert_eq!(staging.keys(), vec!["p/a.tif", "p/b.tif"]);
    }

    #[tokio::test]
    async fn test_download_many_rejects_shared_basenames() {
        let ee = engine();
        ee.add("users/alice/a", AssetType::Folder);
        ee.add("users/alice/a/img", AssetType::Image);
        ee.add("users/alice/b", AssetType::Folder);
        ee.add("users/alice/b/img", AssetType::Image);
        let staging = FakeStaging::new("stage");
        let assets = AssetManager::new(&ee, LEGACY_PROJECT);
        let transfer = Transfer::new(&assets, &staging);

        let err = transfer
            .download_many(
                &["a/img".to_string(), "b/img".to_string()],
                &DownloadOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(err.to_string().contains("img.tif"));
        assert!(ee.exports().is_empty());
    }
}
