//! Asset tree operations
//!
//! `AssetManager` resolves user paths against the root and composes the
//! single-asset calls of an [`AssetStore`] into recursive copy, move, remove
//! and ACL updates. Traversal is depth-first: removal visits children before
//! their container, everything else visits the container first.

use async_recursion::async_recursion;
use tokio::sync::OnceCell;

use crate::asset::{Acl, AclUpdate, AssetInfo, AssetType, Properties, Quota};
use crate::error::{Error, Result};
use crate::path::{self, Home, LEGACY_PROJECT};
use crate::traits::AssetStore;

/// Path-aware operations over an asset store
pub struct AssetManager<'a, A: AssetStore + ?Sized> {
    store: &'a A,
    project: String,
    root: Option<String>,
    home: OnceCell<Home>,
}

impl<'a, A: AssetStore + ?Sized> AssetManager<'a, A> {
    pub fn new(store: &'a A, project: impl Into<String>) -> Self {
        Self {
            store,
            project: project.into(),
            root: None,
            home: OnceCell::new(),
        }
    }

    /// Pin the root instead of looking it up
    pub fn with_root(mut self, root: Option<String>) -> Self {
        self.root = root.filter(|r| !r.is_empty());
        self
    }

    pub fn store(&self) -> &'a A {
        self.store
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// The root relative paths resolve against
    ///
    /// In the legacy project this is the first asset root visible to the
    /// credentials. The lookup happens once per manager.
    pub async fn home(&self) -> Result<&Home> {
        self.home.get_or_try_init(|| self.lookup_home()).await
    }

    async fn lookup_home(&self) -> Result<Home> {
        if let Some(root) = &self.root {
            return Ok(Home::new(root.clone()));
        }
        if self.project != LEGACY_PROJECT {
            return Ok(Home::for_project(&self.project));
        }
        let roots = self.store.list_asset_roots().await?;
        let first = roots.into_iter().next().ok_or_else(|| {
            Error::NotFound(format!(
                "No available assets for provided credentials in project {}",
                self.project
            ))
        })?;
        tracing::debug!("Using asset root {}", first.id);
        Ok(Home::new(first.id))
    }

    /// Resolve a user path into an asset id
    pub async fn resolve(&self, path: &str) -> Result<String> {
        if path::is_absolute(path) {
            return Ok(path::resolve(path, &Home::new("")));
        }
        Ok(path::resolve(path, self.home().await?))
    }

    /// Quota of the root
    pub async fn quota(&self) -> Result<Quota> {
        let home = self.home().await?;
        let root = path::root_of(home.as_str())?;
        self.store.get_quota(&root).await
    }

    pub async fn info(&self, path: &str) -> Result<AssetInfo> {
        let id = self.resolve(path).await?;
        self.store.get_asset(&id).await
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        match self.info(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Children of a container, as absolute ids or basenames
    pub async fn ls(&self, path: &str, abspath: bool) -> Result<Vec<String>> {
        let children = self.list(path).await?;
        Ok(children
            .into_iter()
            .map(|child| {
                if abspath {
                    child.id
                } else {
                    child.basename().to_string()
                }
            })
            .collect())
    }

    /// Children of a container with their metadata
    pub async fn list(&self, path: &str) -> Result<Vec<AssetInfo>> {
        let id = self.resolve(path).await?;
        self.store.list_assets(&id).await
    }

    pub async fn get_acl(&self, path: &str) -> Result<Acl> {
        let id = self.resolve(path).await?;
        self.store.get_acl(&id).await
    }

    /// Update the ACL of an asset, and of its descendants when `recursive`
    ///
    /// Starts from an empty ACL when `overwrite`, otherwise from the current
    /// one. Owners are never written. Returns the ids that were updated.
    pub async fn set_acl(
        &self,
        path: &str,
        update: &AclUpdate,
        overwrite: bool,
        recursive: bool,
    ) -> Result<Vec<String>> {
        let id = self.resolve(path).await?;
        let mut touched = Vec::new();
        if recursive {
            let info = self.store.get_asset(&id).await?;
            self.set_acl_tree(&info, update, overwrite, &mut touched)
                .await?;
        } else {
            self.set_acl_one(&id, update, overwrite).await?;
            touched.push(id);
        }
        Ok(touched)
    }

    #[async_recursion]
    async fn set_acl_tree(
        &self,
        info: &AssetInfo,
        update: &AclUpdate,
        overwrite: bool,
        touched: &mut Vec<String>,
    ) -> Result<()> {
        self.set_acl_one(&info.id, update, overwrite).await?;
        touched.push(info.id.clone());
        if info.is_container() {
            for child in self.store.list_assets(&info.id).await? {
                self.set_acl_tree(&child, update, overwrite, touched)
                    .await?;
            }
        }
        Ok(())
    }

    async fn set_acl_one(&self, id: &str, update: &AclUpdate, overwrite: bool) -> Result<()> {
        let mut acl = if overwrite {
            Acl::default()
        } else {
            self.store.get_acl(id).await?
        };
        acl.owners.clear();
        acl.apply(update);
        tracing::debug!("Setting ACL to {:?} on {id}", acl);
        self.store.set_acl(id, &acl).await
    }

    pub async fn set_properties(&self, path: &str, properties: &Properties) -> Result<()> {
        let id = self.resolve(path).await?;
        tracing::debug!("Setting {} properties on {id}", properties.len());
        self.store.update_properties(&id, properties).await
    }

    /// Create a folder or image collection
    ///
    /// With `parents`, missing intermediate folders are created and an
    /// existing container of the same kind is accepted. Returns the id.
    pub async fn create_folder(
        &self,
        path: &str,
        kind: AssetType,
        parents: bool,
        overwrite: bool,
        public: bool,
    ) -> Result<String> {
        if !kind.is_container() {
            return Err(Error::InvalidPath(format!(
                "Cannot create an empty asset of type {kind}"
            )));
        }
        let id = self.resolve(path).await?;

        if parents {
            for folder in path::intermediate_folders(&id)? {
                self.ensure_container(&folder, AssetType::Folder).await?;
            }
            if overwrite {
                self.store.create_asset(&id, kind, true).await?;
            } else {
                self.ensure_container(&id, kind).await?;
            }
        } else {
            tracing::debug!("Creating {kind} {id}");
            self.store.create_asset(&id, kind, overwrite).await?;
        }

        if public {
            self.set_acl_one(&id, &AclUpdate::Public, false).await?;
        }
        Ok(id)
    }

    pub async fn create_image_collection(
        &self,
        path: &str,
        overwrite: bool,
        public: bool,
    ) -> Result<String> {
        self.create_folder(path, AssetType::ImageCollection, false, overwrite, public)
            .await
    }

    async fn ensure_container(&self, id: &str, kind: AssetType) -> Result<()> {
        match self.store.get_asset(id).await {
            Ok(info) if info.asset_type == kind => Ok(()),
            Ok(info) => Err(Error::Conflict(format!(
                "{id} already exists as {}",
                info.asset_type
            ))),
            Err(e) if e.is_not_found() => {
                tracing::debug!("Creating {kind} {id}");
                self.store.create_asset(id, kind, false).await
            }
            Err(e) => Err(e),
        }
    }

    /// Copy an asset, or a whole container tree when `recursive`
    ///
    /// Returns the destination ids written.
    pub async fn copy(
        &self,
        src: &str,
        dst: &str,
        overwrite: bool,
        recursive: bool,
    ) -> Result<Vec<String>> {
        let src = self.resolve(src).await?;
        let dst = self.resolve(dst).await?;
        let mut copied = Vec::new();
        if recursive {
            if dst == src || dst.starts_with(&format!("{src}/")) {
                return Err(Error::InvalidPath(format!(
                    "Cannot copy {src} into itself ({dst})"
                )));
            }
            let info = self.store.get_asset(&src).await?;
            self.copy_tree(&info, &dst, overwrite, &mut copied).await?;
        } else {
            tracing::debug!("Copying {src} to {dst}");
            self.store.copy_asset(&src, &dst, overwrite).await?;
            copied.push(dst);
        }
        Ok(copied)
    }

    #[async_recursion]
    async fn copy_tree(
        &self,
        info: &AssetInfo,
        dst: &str,
        overwrite: bool,
        copied: &mut Vec<String>,
    ) -> Result<()> {
        if info.is_container() {
            let children = self.store.list_assets(&info.id).await?;
            if overwrite {
                self.store.create_asset(dst, info.asset_type, true).await?;
            } else {
                self.ensure_container(dst, info.asset_type).await?;
            }
            copied.push(dst.to_string());
            for child in children {
                let target = path::join(dst, child.basename());
                self.copy_tree(&child, &target, overwrite, copied).await?;
            }
        } else {
            tracing::debug!("Copying {} to {dst}", info.id);
            self.store.copy_asset(&info.id, dst, overwrite).await?;
            copied.push(dst.to_string());
        }
        Ok(())
    }

    /// Copy then remove the source
    pub async fn move_asset(
        &self,
        src: &str,
        dst: &str,
        overwrite: bool,
        recursive: bool,
    ) -> Result<Vec<String>> {
        let src = self.resolve(src).await?;
        let copied = self.copy(&src, dst, overwrite, recursive).await?;
        self.remove(&src, recursive).await?;
        Ok(copied)
    }

    /// Delete an asset, children first when `recursive`
    ///
    /// Returns the deleted ids in deletion order.
    pub async fn remove(&self, path: &str, recursive: bool) -> Result<Vec<String>> {
        let id = self.resolve(path).await?;
        let mut removed = Vec::new();
        if recursive {
            let info = self.store.get_asset(&id).await?;
            self.remove_tree(&info, &mut removed).await?;
        } else {
            tracing::debug!("Deleting asset {id}");
            self.store.delete_asset(&id).await?;
            removed.push(id);
        }
        Ok(removed)
    }

    #[async_recursion]
    async fn remove_tree(&self, info: &AssetInfo, removed: &mut Vec<String>) -> Result<()> {
        if info.is_container() {
            for child in self.store.list_assets(&info.id).await? {
                self.remove_tree(&child, removed).await?;
            }
        }
        tracing::debug!("Deleting asset {}", info.id);
        self.store.delete_asset(&info.id).await?;
        removed.push(info.id.clone());
        Ok(())
    }
}
