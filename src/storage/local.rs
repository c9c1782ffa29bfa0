//! Local filesystem storage implementation.
//!
//! Lays a site out as one directory per thread, with one sub-directory per
//! scan named after its scrape time. Every write goes through a temp file and
//! a rename, so a crash leaves either the old file or the new one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{MasterContent, MasterMeta, SiteMeta, Snapshot, SnapshotMeta, Timestamp};
use crate::storage::ThreadStorage;

const SITE_META_FILE: &str = "site_meta.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the site directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Directory of one thread.
    fn thread_dir(&self, thread_id: &str) -> Result<PathBuf> {
        let valid = !thread_id.is_empty()
            && thread_id != "."
            && thread_id != ".."
            && !thread_id.contains(['/', '\\']);
        if !valid {
            return Err(AppError::validation(format!(
                "thread id '{}' is not usable as a directory name",
                thread_id
            )));
        }
        Ok(self.root_dir.join(thread_id))
    }

    /// Directory of one scan of a thread.
    fn scan_dir(&self, thread_id: &str, scraped: Timestamp) -> Result<PathBuf> {
        Ok(self.thread_dir(thread_id)?.join(scraped.to_string()))
    }

    fn snapshot_path(&self, thread_id: &str, scraped: Timestamp) -> Result<PathBuf> {
        Ok(self
            .scan_dir(thread_id, scraped)?
            .join(format!("content_{}.json", thread_id)))
    }

    fn snapshot_meta_path(&self, thread_id: &str, scraped: Timestamp) -> Result<PathBuf> {
        Ok(self
            .scan_dir(thread_id, scraped)?
            .join(format!("meta_{}.json", thread_id)))
    }

    fn master_content_path(&self, thread_id: &str) -> Result<PathBuf> {
        Ok(self
            .thread_dir(thread_id)?
            .join(format!("master_version_{}.json", thread_id)))
    }

    fn master_meta_path(&self, thread_id: &str) -> Result<PathBuf> {
        Ok(self
            .thread_dir(thread_id)?
            .join(format!("thread_meta_{}.json", thread_id)))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(path, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match self.read_bytes(path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Names of the sub-directories of `dir`, sorted.
    async fn list_dirs(&self, dir: &Path) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl ThreadStorage for LocalStorage {
    async fn list_threads(&self) -> Result<Vec<String>> {
        self.list_dirs(&self.root_dir).await
    }

    async fn list_scans(&self, thread_id: &str) -> Result<Vec<Timestamp>> {
        let thread_dir = self.thread_dir(thread_id)?;
        let mut scans = Vec::new();

        for name in self.list_dirs(&thread_dir).await? {
            let Ok(scraped) = Timestamp::parse(&name) else {
                log::debug!("Thread {}: ignoring directory {}", thread_id, name);
                continue;
            };
            if tokio::fs::try_exists(self.snapshot_path(thread_id, scraped)?).await? {
                scans.push(scraped);
            }
        }

        scans.sort();
        Ok(scans)
    }

    async fn load_snapshot(&self, thread_id: &str, scraped: Timestamp) -> Result<Snapshot> {
        let path = self.snapshot_path(thread_id, scraped)?;
        self.read_json(&path).await?.ok_or_else(|| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("snapshot not found: {}", path.display()),
            ))
        })
    }

    async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let path = self.snapshot_path(&snapshot.thread_id, snapshot.date_scraped)?;
        if tokio::fs::try_exists(&path).await? {
            return Err(AppError::AlreadyExists(path.display().to_string()));
        }
        self.write_json(&path, snapshot).await?;
        log::info!("Snapshot written to {}", path.display());
        Ok(())
    }

    async fn load_snapshot_meta(
        &self,
        thread_id: &str,
        scraped: Timestamp,
    ) -> Result<Option<SnapshotMeta>> {
        self.read_json(&self.snapshot_meta_path(thread_id, scraped)?)
            .await
    }

    async fn write_snapshot_meta(&self, meta: &SnapshotMeta) -> Result<()> {
        let path = self.snapshot_meta_path(&meta.thread_id, meta.date_scraped)?;
        self.write_json(&path, meta).await
    }

    async fn load_master_content(&self, thread_id: &str) -> Result<Option<MasterContent>> {
        self.read_json(&self.master_content_path(thread_id)?).await
    }

    async fn write_master_content(&self, master: &MasterContent) -> Result<()> {
        let path = self.master_content_path(&master.thread_id)?;
        self.write_json(&path, master).await?;
        log::debug!("Master content written to {}", path.display());
        Ok(())
    }

    async fn load_master_meta(&self, thread_id: &str) -> Result<Option<MasterMeta>> {
        self.read_json(&self.master_meta_path(thread_id)?).await
    }

    async fn write_master_meta(&self, master: &MasterMeta) -> Result<()> {
        let path = self.master_meta_path(&master.thread_id)?;
        self.write_json(&path, master).await?;
        log::debug!("Master meta written to {}", path.display());
        Ok(())
    }

    async fn load_site_meta(&self) -> Result<Option<SiteMeta>> {
        self.read_json(&self.root_dir.join(SITE_META_FILE)).await
    }

    async fn write_site_meta(&self, site: &SiteMeta) -> Result<()> {
        let path = self.root_dir.join(SITE_META_FILE);
        self.write_json(&path, site).await?;
        log::info!("Site meta written to {}", path.display());
        Ok(())
    }
}
