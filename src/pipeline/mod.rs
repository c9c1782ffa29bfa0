//! Reconciliation pipeline.
//!
//! - [`generate_snapshot_meta`]: Per-scan statistics for one snapshot
//! - [`MasterContentReconciler`]: Fold snapshots into the thread's master content
//! - [`MasterMetaReconciler`]: Fold snapshot metas into the thread's master meta
//! - [`SiteAggregator`]: Sum master metas into site meta
//! - [`ingest_snapshot`], [`reconcile_thread`], [`reconcile_site`]: The same
//!   steps driven over a [`ThreadStorage`](crate::storage::ThreadStorage)

pub mod content;
pub mod diff;
pub mod ingest;
pub mod meta;
pub mod observer;
pub mod reconcile;
pub mod site;
pub mod snapshot_meta;

pub use content::{MasterContentReconciler, reconcile_content};
pub use diff::ScanDiff;
pub use ingest::{ingest_file, ingest_snapshot};
pub use meta::{MasterMetaReconciler, reconcile_meta};
pub use observer::{LogObserver, ReconcileObserver};
pub use reconcile::{
    SiteSummary, ThreadMasters, ThreadSummary, aggregate_site_meta, build_masters,
    reconcile_site, reconcile_thread,
};
pub use site::{SiteAggregator, aggregate_site};
pub use snapshot_meta::generate_snapshot_meta;
