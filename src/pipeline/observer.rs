//! Reconciliation events.
//!
//! The reconcilers report what they skip or detect through an observer passed
//! by reference. [`LogObserver`] forwards everything to the `log` facade.

use crate::error::AppError;
use crate::models::Timestamp;
use crate::pipeline::ScanDiff;

/// Receiver for reconciliation events.
pub trait ReconcileObserver: Send + Sync {
    /// A snapshot (or snapshot meta) was left out of a fold.
    fn snapshot_skipped(&self, thread_id: &str, scraped: Option<Timestamp>, reason: &str);

    /// A snapshot meta was folded into a master meta.
    fn scan_folded(&self, _thread_id: &str, _scraped: Timestamp, _diff: &ScanDiff) {}

    /// Reconciliation of a whole thread failed.
    fn thread_failed(&self, thread_id: &str, error: &AppError);
}

/// Observer that writes to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ReconcileObserver for LogObserver {
    fn snapshot_skipped(&self, thread_id: &str, scraped: Option<Timestamp>, reason: &str) {
        match scraped {
            Some(scraped) => log::warn!(
                "Thread {}: skipping snapshot scraped {}: {}",
                thread_id,
                scraped,
                reason
            ),
            None => log::warn!("Thread {}: skipping snapshot: {}", thread_id, reason),
        }
    }

    fn scan_folded(&self, thread_id: &str, scraped: Timestamp, diff: &ScanDiff) {
        if diff.has_changes() {
            log::debug!(
                "Thread {} @ {}: {} new, {} lost, {} returned",
                thread_id,
                scraped,
                diff.added.len(),
                diff.lost.len(),
                diff.returned.len()
            );
        }
        if !diff.lost.is_empty() {
            log::info!(
                "Thread {}: posts lost since previous scan: {}",
                thread_id,
                diff.lost.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
    }

    fn thread_failed(&self, thread_id: &str, error: &AppError) {
        log::error!("Thread {} failed to reconcile: {}", thread_id, error);
    }
}
