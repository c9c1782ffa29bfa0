//! Master meta reconciliation.
//!
//! Folds every snapshot meta of a thread, oldest scan first, into one record
//! of cumulative statistics: unique and lost post ids, per-scan history,
//! high-water timestamps and aggregate counters.
//!
//! Timestamps are merged with `max`, so a source whose displayed update time
//! moves backward never rewinds the record. Aggregate counters only advance
//! on a scan newer than every scan already folded.

use crate::error::{AppError, Result};
use crate::models::{MasterMeta, SnapshotMeta};
use crate::pipeline::{LogObserver, ReconcileObserver, ScanDiff};
use crate::utils::tie_break_key;

/// Folds snapshot metas into master meta.
pub struct MasterMetaReconciler<'a> {
    observer: &'a dyn ReconcileObserver,
}

impl<'a> MasterMetaReconciler<'a> {
    /// Create a reconciler reporting to `observer`.
    pub fn new(observer: &'a dyn ReconcileObserver) -> Self {
        Self { observer }
    }

    /// Reconcile a thread's snapshot metas, in any order.
    pub fn reconcile(&self, mut metas: Vec<SnapshotMeta>) -> Result<MasterMeta> {
        metas.sort_by_cached_key(|m| (m.date_scraped, tie_break_key(m)));

        let Some(first) = metas.first() else {
            return Err(AppError::empty_input(""));
        };
        let thread_id = first.thread_id.clone();

        let mut master = MasterMeta::new_accumulator();
        for meta in &metas {
            if meta.thread_id != thread_id {
                self.observer.snapshot_skipped(
                    &thread_id,
                    Some(meta.date_scraped),
                    &format!("meta belongs to thread '{}'", meta.thread_id),
                );
                continue;
            }
            self.fold(&mut master, meta);
        }

        log::debug!(
            "Master meta for thread {}: {} scans, {} unique, {} lost",
            master.thread_id,
            master.scan_count(),
            master.num_unique_post_ids,
            master.num_lost_post_ids
        );

        Ok(master)
    }

    /// Fold one snapshot meta into `master` and report what it changed.
    pub fn fold(&self, master: &mut MasterMeta, meta: &SnapshotMeta) -> ScanDiff {
        let diff = fold_snapshot_meta(master, meta);
        self.observer
            .scan_folded(&master.thread_id, meta.date_scraped, &diff);
        diff
    }
}

impl Default for MasterMetaReconciler<'static> {
    fn default() -> Self {
        Self::new(&LogObserver)
    }
}

/// Convenience function to reconcile with the logging observer.
pub fn reconcile_meta(metas: Vec<SnapshotMeta>) -> Result<MasterMeta> {
    MasterMetaReconciler::default().reconcile(metas)
}

/// One fold step.
fn fold_snapshot_meta(master: &mut MasterMeta, meta: &SnapshotMeta) -> ScanDiff {
    seed_identity(master, meta);

    let diff = ScanDiff::calculate(
        &master.unique_post_ids,
        &master.lost_post_ids,
        &meta.all_post_ids,
    );

    master.lost_post_ids.extend(diff.lost.iter().cloned());
    master.unique_post_ids.extend(diff.added.iter().cloned());
    master
        .snapshot_history
        .insert(meta.date_scraped, meta.all_post_ids.clone());

    if let Some(updated) = meta.date_updated {
        master.most_recent_update_date = master.most_recent_update_date.max(Some(updated));
    }

    let advances = master
        .most_recent_scrape_date
        .is_none_or(|latest| meta.date_scraped > latest);
    if advances {
        master.most_recent_scrape_date = Some(meta.date_scraped);
        master.num_aggregate_post_ids += meta.num_all_post_ids;
        master.num_aggregate_words = master.num_aggregate_words.max(meta.num_all_words);
    }

    master.num_unique_post_ids = master.unique_post_ids.len();
    master.num_lost_post_ids = master.lost_post_ids.len();

    diff
}

/// Thread identity comes from the first scan that carries each field.
fn seed_identity(master: &mut MasterMeta, meta: &SnapshotMeta) {
    fn fill(slot: &mut String, value: &str) {
        if slot.is_empty() && !value.is_empty() {
            *slot = value.to_string();
        }
    }

    fill(&mut master.thread_id, &meta.thread_id);
    fill(&mut master.board_name, &meta.board_name);
    fill(&mut master.thread_title, &meta.thread_title);
    fill(&mut master.url, &meta.url);
    if master.date_published.is_none() {
        master.date_published = meta.date_published;
    }
}
