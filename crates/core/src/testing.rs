//! In-memory service fakes for unit tests

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::asset::{
    Acl, AssetInfo, AssetType, ExportRequest, IngestRequest, Properties, Quota, TaskState,
    TaskStatus,
};
use crate::error::{Error, Result};
use crate::path;
use crate::traits::{AssetStore, StagingStore, TaskRunner};

#[derive(Debug, Clone)]
struct FakeAsset {
    info: AssetInfo,
    acl: Acl,
}

/// Asset tree and task queue kept in memory
///
/// Every mutating call is appended to `calls` as `"<verb> <id>"` so tests can
/// assert on traversal order.
#[derive(Debug, Default)]
pub struct FakeEarthEngine {
    roots: Vec<String>,
    assets: Mutex<BTreeMap<String, FakeAsset>>,
    tasks: Mutex<HashMap<String, TaskStatus>>,
    calls: Mutex<Vec<String>>,
    ingestions: Mutex<Vec<IngestRequest>>,
    exports: Mutex<Vec<ExportRequest>>,
    task_outcome: Mutex<Option<TaskState>>,
}

impl FakeEarthEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fake whose credentials see the given roots
    pub fn with_roots(roots: &[&str]) -> Self {
        Self {
            roots: roots.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Insert an asset without recording a call
    pub fn add(&self, id: &str, asset_type: AssetType) {
        self.assets.lock().unwrap().insert(
            id.to_string(),
            FakeAsset {
                info: AssetInfo::new(id, asset_type),
                acl: Acl {
                    owners: vec!["owner@example.com".into()],
                    ..Acl::default()
                },
            },
        );
    }

    pub fn contains(&self, id: &str) -> bool {
        self.assets.lock().unwrap().contains_key(id)
    }

    pub fn asset_type(&self, id: &str) -> Option<AssetType> {
        self.assets
            .lock()
            .unwrap()
            .get(id)
            .map(|a| a.info.asset_type)
    }

    pub fn acl(&self, id: &str) -> Option<Acl> {
        self.assets.lock().unwrap().get(id).map(|a| a.acl.clone())
    }

    pub fn properties(&self, id: &str) -> Option<Properties> {
        self.assets
            .lock()
            .unwrap()
            .get(id)
            .map(|a| a.info.properties.clone())
    }

    pub fn set_acl_direct(&self, id: &str, acl: Acl) {
        if let Some(asset) = self.assets.lock().unwrap().get_mut(id) {
            asset.acl = acl;
        }
    }

    /// Recorded mutating calls, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls starting with `verb`
    pub fn calls_of(&self, verb: &str) -> Vec<String> {
        let prefix = format!("{verb} ");
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn ingestions(&self) -> Vec<IngestRequest> {
        self.ingestions.lock().unwrap().clone()
    }

    pub fn exports(&self) -> Vec<ExportRequest> {
        self.exports.lock().unwrap().clone()
    }

    /// Make every new task report this state instead of SUCCEEDED
    pub fn fail_tasks_with(&self, state: TaskState) {
        *self.task_outcome.lock().unwrap() = Some(state);
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn new_task(&self, prefix: &str) -> String {
        let mut tasks = self.tasks.lock().unwrap();
        let id = format!("{prefix}{}", tasks.len() + 1);
        let state = self
            .task_outcome
            .lock()
            .unwrap()
            .unwrap_or(TaskState::Succeeded);
        let mut status = TaskStatus::new(&id, state);
        if state.is_failure() {
            status.error_message = Some("simulated failure".into());
        }
        tasks.insert(id.clone(), status);
        id
    }

    fn parent_exists(&self, assets: &BTreeMap<String, FakeAsset>, id: &str) -> bool {
        match path::parent(id) {
            Some(parent) => {
                assets.contains_key(parent)
                    || path::root_of(id).map(|root| root == parent).unwrap_or(false)
            }
            None => false,
        }
    }
}

#[async_trait]
impl AssetStore for FakeEarthEngine {
    async fn list_asset_roots(&self) -> Result<Vec<AssetInfo>> {
        Ok(self
            .roots
            .iter()
            .map(|r| AssetInfo::new(r.clone(), AssetType::Folder))
            .collect())
    }

    async fn get_asset(&self, id: &str) -> Result<AssetInfo> {
        self.assets
            .lock()
            .unwrap()
            .get(id)
            .map(|a| a.info.clone())
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn list_assets(&self, parent: &str) -> Result<Vec<AssetInfo>> {
        let parent = parent.trim_end_matches('/');
        let assets = self.assets.lock().unwrap();
        if let Some(node) = assets.get(parent)
            && !node.info.is_container()
        {
            return Err(Error::InvalidPath(format!("{parent} is not a container")));
        }
        Ok(assets
            .values()
            .filter(|a| path::parent(&a.info.id) == Some(parent))
            .map(|a| a.info.clone())
            .collect())
    }

    async fn create_asset(&self, id: &str, asset_type: AssetType, overwrite: bool) -> Result<()> {
        {
            let assets = self.assets.lock().unwrap();
            if assets.contains_key(id) && !overwrite {
                return Err(Error::Conflict(format!("{id} already exists")));
            }
            if !self.parent_exists(&assets, id) {
                return Err(Error::NotFound(format!("parent of {id}")));
            }
        }
        self.record(format!("create {id}"));
        self.add(id, asset_type);
        Ok(())
    }

    async fn copy_asset(&self, src: &str, dst: &str, overwrite: bool) -> Result<()> {
        let mut assets = self.assets.lock().unwrap();
        let source = assets
            .get(src)
            .cloned()
            .ok_or_else(|| Error::NotFound(src.to_string()))?;
        if source.info.is_container() {
            return Err(Error::InvalidPath(format!("cannot copy container {src}")));
        }
        if assets.contains_key(dst) && !overwrite {
            return Err(Error::Conflict(format!("{dst} already exists")));
        }
        if !self.parent_exists(&assets, dst) {
            return Err(Error::NotFound(format!("parent of {dst}")));
        }
        let mut copy = source;
        copy.info.id = dst.to_string();
        assets.insert(dst.to_string(), copy);
        drop(assets);
        self.record(format!("copy {src} {dst}"));
        Ok(())
    }

    async fn delete_asset(&self, id: &str) -> Result<()> {
        let mut assets = self.assets.lock().unwrap();
        if !assets.contains_key(id) {
            return Err(Error::NotFound(id.to_string()));
        }
        if assets
            .keys()
            .any(|other| path::parent(other) == Some(id))
        {
            return Err(Error::Conflict(format!("{id} is not empty")));
        }
        assets.remove(id);
        drop(assets);
        self.record(format!("delete {id}"));
        Ok(())
    }

    async fn get_acl(&self, id: &str) -> Result<Acl> {
        self.acl(id).ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn set_acl(&self, id: &str, acl: &Acl) -> Result<()> {
        let mut assets = self.assets.lock().unwrap();
        let asset = assets
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        asset.acl = acl.clone();
        drop(assets);
        self.record(format!("acl {id}"));
        Ok(())
    }

    async fn update_properties(&self, id: &str, properties: &Properties) -> Result<()> {
        let mut assets = self.assets.lock().unwrap();
        let asset = assets
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        for (key, value) in properties {
            asset.info.properties.insert(key.clone(), value.clone());
        }
        drop(assets);
        self.record(format!("props {id}"));
        Ok(())
    }

    async fn get_quota(&self, root: &str) -> Result<Quota> {
        let count = self
            .assets
            .lock()
            .unwrap()
            .keys()
            .filter(|id| id.starts_with(root))
            .count();
        Ok(Quota {
            asset_count: count as u64,
            max_assets: Some(10_000),
            size_bytes: 0,
            max_size_bytes: Some(1 << 40),
        })
    }
}

#[async_trait]
impl TaskRunner for FakeEarthEngine {
    async fn start_ingestion(&self, request: &IngestRequest) -> Result<String> {
        let task = self.new_task("INGEST_");
        if self.tasks.lock().unwrap()[&task].state == TaskState::Succeeded {
            let id = request.asset.clone();
            let mut assets = self.assets.lock().unwrap();
            assets.insert(
                id.clone(),
                FakeAsset {
                    info: AssetInfo::new(id, AssetType::Image),
                    acl: Acl::default(),
                },
            );
        }
        self.ingestions.lock().unwrap().push(request.clone());
        self.record(format!("ingest {}", request.asset));
        Ok(task)
    }

    async fn start_export(&self, request: &ExportRequest) -> Result<String> {
        let task = self.new_task("EXPORT_");
        self.exports.lock().unwrap().push(request.clone());
        self.record(format!("export {}", request.asset));
        Ok(task)
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus> {
        self.tasks
            .lock()
            .unwrap()
            .get(task_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(task_id.to_string()))
    }

    async fn cancel_task(&self, task_id: &str) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        let status = tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::NotFound(task_id.to_string()))?;
        status.state = TaskState::Cancelled;
        Ok(())
    }
}

/// Staging bucket kept in memory
#[derive(Debug)]
pub struct FakeStaging {
    bucket: String,
    exists: Mutex<bool>,
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl FakeStaging {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            exists: Mutex::new(true),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn missing(bucket: &str) -> Self {
        let staging = Self::new(bucket);
        *staging.exists.lock().unwrap() = false;
        staging
    }

    pub fn put(&self, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl StagingStore for FakeStaging {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> Result<bool> {
        Ok(*self.exists.lock().unwrap())
    }

    async fn create_bucket(&self) -> Result<()> {
        *self.exists.lock().unwrap() = true;
        Ok(())
    }

    async fn upload_file(&self, local: &Path, key: &str) -> Result<u64> {
        let data = tokio::fs::read(local).await?;
        let len = data.len() as u64;
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(len)
    }

    async fn download_file(&self, key: &str, local: &Path) -> Result<u64> {
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local, &data).await?;
        Ok(data.len() as u64)
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<Vec<String>> {
        let mut objects = self.objects.lock().unwrap();
        Ok(keys
            .iter()
            .filter(|key| objects.remove(key.as_str()).is_some())
            .cloned()
            .collect())
    }
}
