// src/models/mod.rs

//! Domain models for the reconciler.
//!
//! Records flow leaf-first: posts make up snapshots, snapshots yield
//! snapshot metas, both fold into master records, and master metas roll up
//! into site meta.

mod config;
mod master;
mod post;
mod site;
mod snapshot;
mod timestamp;

// Re-export all public types
pub use config::{Config, ReconcileConfig, SiteConfig};
pub use master::{MasterContent, MasterMeta};
pub use post::PostRecord;
pub use site::SiteMeta;
pub use snapshot::{Snapshot, SnapshotMeta};
pub use timestamp::{TIMESTAMP_FORMAT, Timestamp};
