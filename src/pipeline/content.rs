//! Master content reconciliation.
//!
//! Folds every snapshot of a thread, oldest scan first, into one
//! deduplicated record. The newest observation of a post wins field by
//! field; no post is ever removed here.

use crate::error::{AppError, Result};
use crate::models::{MasterContent, Snapshot};
use crate::pipeline::{LogObserver, ReconcileObserver};
use crate::utils::tie_break_key;

/// Folds snapshots into master content.
pub struct MasterContentReconciler<'a> {
    observer: &'a dyn ReconcileObserver,
}

impl<'a> MasterContentReconciler<'a> {
    /// Create a reconciler reporting to `observer`.
    pub fn new(observer: &'a dyn ReconcileObserver) -> Self {
        Self { observer }
    }

    /// Reconcile a thread's snapshots, in any order.
    ///
    /// Snapshots are sorted by scrape time before folding, ties broken by
    /// content. A snapshot without
    /// `original_post` or `replies`, or belonging to a different thread, is
    /// skipped and reported.
    pub fn reconcile(&self, mut snapshots: Vec<Snapshot>) -> Result<MasterContent> {
        snapshots.sort_by_cached_key(|s| (s.date_scraped, tie_break_key(s)));

        let Some(first) = snapshots.first() else {
            return Err(AppError::empty_input(""));
        };
        let fallback_id = first.thread_id.clone();

        let mut master = MasterContent::new();
        let mut folded = 0usize;

        for snapshot in snapshots {
            if folded > 0 && snapshot.thread_id != master.thread_id {
                self.observer.snapshot_skipped(
                    &master.thread_id,
                    Some(snapshot.date_scraped),
                    &format!("belongs to thread '{}'", snapshot.thread_id),
                );
                continue;
            }

            let (original_post, replies) = match (snapshot.original_post, snapshot.replies) {
                (Some(op), Some(replies)) => (op, replies),
                (op, _) => {
                    let missing = if op.is_none() { "original_post" } else { "replies" };
                    self.observer.snapshot_skipped(
                        &snapshot.thread_id,
                        Some(snapshot.date_scraped),
                        &format!("missing '{}'", missing),
                    );
                    continue;
                }
            };

            if folded == 0 {
                master.thread_id = snapshot.thread_id;
            }

            master.original_post.merge_from(original_post);
            for (post_id, reply) in replies {
                master.replies.entry(post_id).or_default().merge_from(reply);
            }
            folded += 1;
        }

        if folded == 0 {
            return Err(AppError::empty_input(fallback_id));
        }

        log::debug!(
            "Master content for thread {}: {} snapshots, {} posts",
            master.thread_id,
            folded,
            master.post_count()
        );

        Ok(master)
    }
}

impl Default for MasterContentReconciler<'static> {
    fn default() -> Self {
        Self::new(&LogObserver)
    }
}

/// Convenience function to reconcile with the logging observer.
pub fn reconcile_content(snapshots: Vec<Snapshot>) -> Result<MasterContent> {
    MasterContentReconciler::default().reconcile(snapshots)
}
