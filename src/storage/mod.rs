//! Storage abstractions for snapshot and master persistence.
//!
//! Snapshots and snapshot metas are immutable, one file per thread per scan.
//! Master content and master meta are one current file per thread, rewritten
//! whole on every reconciliation. Site meta is one file per site.
//!
//! ## Directory Structure
//!
//! ```text
//! {root}/
//! ├── site_meta.json
//! └── {thread_id}/
//!     ├── master_version_{thread_id}.json
//!     ├── thread_meta_{thread_id}.json
//!     └── 2024-05-01T08:00:00/
//!         ├── content_{thread_id}.json
//!         └── meta_{thread_id}.json
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{MasterContent, MasterMeta, SiteMeta, Snapshot, SnapshotMeta, Timestamp};

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for reconciler storage backends.
#[async_trait]
pub trait ThreadStorage: Send + Sync {
    /// Ids of every thread with at least one stored scan directory.
    async fn list_threads(&self) -> Result<Vec<String>>;

    /// Scrape times of a thread's stored snapshots, oldest first.
    async fn list_scans(&self, thread_id: &str) -> Result<Vec<Timestamp>>;

    /// Read one snapshot.
    async fn load_snapshot(&self, thread_id: &str, scraped: Timestamp) -> Result<Snapshot>;

    /// Store a new snapshot. Fails if one already exists for that scan.
    async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    /// Read one snapshot meta, `None` if it was never generated.
    async fn load_snapshot_meta(
        &self,
        thread_id: &str,
        scraped: Timestamp,
    ) -> Result<Option<SnapshotMeta>>;

    /// Store a snapshot meta next to its snapshot.
    async fn write_snapshot_meta(&self, meta: &SnapshotMeta) -> Result<()>;

    async fn load_master_content(&self, thread_id: &str) -> Result<Option<MasterContent>>;

    async fn write_master_content(&self, master: &MasterContent) -> Result<()>;

    async fn load_master_meta(&self, thread_id: &str) -> Result<Option<MasterMeta>>;

    async fn write_master_meta(&self, master: &MasterMeta) -> Result<()>;

    async fn load_site_meta(&self) -> Result<Option<SiteMeta>>;

    async fn write_site_meta(&self, site: &SiteMeta) -> Result<()>;
}
