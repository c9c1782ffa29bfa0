// src/pipeline/reconcile.rs

//! Thread and site reconciliation over a storage backend.
//!
//! Each thread is rebuilt from scratch out of its stored snapshots, so an
//! interrupted run is recovered by running it again. Threads share nothing,
//! which lets a site be reconciled with bounded concurrency.

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{Config, MasterContent, MasterMeta, SiteMeta, Snapshot, SnapshotMeta};
use crate::pipeline::{
    MasterContentReconciler, MasterMetaReconciler, ReconcileObserver, SiteAggregator,
    generate_snapshot_meta,
};
use crate::storage::ThreadStorage;
use crate::utils::fingerprint;

/// Outcome of reconciling one thread.
#[derive(Debug, Clone)]
pub struct ThreadSummary {
    pub thread_id: String,
    /// Snapshot files found on disk
    pub scans_found: usize,
    /// Snapshots that made it into the fold
    pub scans_folded: usize,
    /// Snapshots that broke the parser contract
    pub invalid_snapshots: usize,
    pub num_unique_post_ids: usize,
    pub num_lost_post_ids: usize,
    pub flagged_lost: usize,
    pub content_fingerprint: String,
    pub meta_fingerprint: String,
}

/// Outcome of reconciling every thread of a site.
#[derive(Debug, Clone)]
pub struct SiteSummary {
    pub threads: Vec<ThreadSummary>,
    pub failed: Vec<(String, String)>,
    pub site: SiteMeta,
    pub elapsed_ms: i64,
}

/// The master records of one thread, ready to be written.
#[derive(Debug, Clone)]
pub struct ThreadMasters {
    pub content: MasterContent,
    pub meta: MasterMeta,
    /// Posts currently flagged lost in the content
    pub flagged_lost: usize,
}

/// Rebuild both master records of a thread from its snapshots.
///
/// Lost flags on the content are set from the reconciled meta.
pub fn build_masters(
    snapshots: Vec<Snapshot>,
    metas: Vec<SnapshotMeta>,
    observer: &dyn ReconcileObserver,
) -> Result<ThreadMasters> {
    let mut content = MasterContentReconciler::new(observer).reconcile(snapshots)?;
    let meta = MasterMetaReconciler::new(observer).reconcile(metas)?;
    let flagged_lost = content.apply_lost_flags(&meta);
    Ok(ThreadMasters {
        content,
        meta,
        flagged_lost,
    })
}

/// Reconcile one thread and write its master records.
///
/// Malformed snapshot files are skipped and reported; I/O failures are
/// returned to the caller.
pub async fn reconcile_thread(
    storage: &dyn ThreadStorage,
    config: &Config,
    thread_id: &str,
    observer: &dyn ReconcileObserver,
) -> Result<ThreadSummary> {
    let scans = storage.list_scans(thread_id).await?;
    if scans.is_empty() {
        return Err(AppError::empty_input(thread_id));
    }

    let mut snapshots = Vec::with_capacity(scans.len());
    let mut metas = Vec::with_capacity(scans.len());
    let mut invalid_snapshots = 0;

    for scraped in &scans {
        let snapshot = match storage.load_snapshot(thread_id, *scraped).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_contract_violation() => {
                observer.snapshot_skipped(thread_id, Some(*scraped), &e.to_string());
                invalid_snapshots += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        if snapshot.thread_id != thread_id {
            observer.snapshot_skipped(
                thread_id,
                Some(*scraped),
                &format!("belongs to thread '{}'", snapshot.thread_id),
            );
            invalid_snapshots += 1;
            continue;
        }

        match snapshot_meta_for(storage, config, &snapshot).await {
            Ok(meta) => {
                metas.push(meta);
                snapshots.push(snapshot);
            }
            Err(e) if e.is_contract_violation() => {
                observer.snapshot_skipped(thread_id, Some(*scraped), &e.to_string());
                invalid_snapshots += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if metas.is_empty() {
        return Err(AppError::empty_input(thread_id));
    }

    let scans_folded = metas.len();
    let masters = build_masters(snapshots, metas, observer)?;
    storage.write_master_content(&masters.content).await?;
    storage.write_master_meta(&masters.meta).await?;

    log::info!(
        "Thread {}: {} scans folded, {} unique posts, {} lost",
        thread_id,
        scans_folded,
        masters.meta.num_unique_post_ids,
        masters.meta.num_lost_post_ids
    );

    Ok(ThreadSummary {
        thread_id: thread_id.to_string(),
        scans_found: scans.len(),
        scans_folded,
        invalid_snapshots,
        num_unique_post_ids: masters.meta.num_unique_post_ids,
        num_lost_post_ids: masters.meta.num_lost_post_ids,
        flagged_lost: masters.flagged_lost,
        content_fingerprint: fingerprint(&masters.content)?,
        meta_fingerprint: fingerprint(&masters.meta)?,
    })
}

/// Stored snapshot meta, generated and written when missing.
async fn snapshot_meta_for(
    storage: &dyn ThreadStorage,
    config: &Config,
    snapshot: &Snapshot,
) -> Result<SnapshotMeta> {
    if !config.reconcile.regenerate_snapshot_meta {
        let stored = storage
            .load_snapshot_meta(&snapshot.thread_id, snapshot.date_scraped)
            .await;
        match stored {
            Ok(Some(meta)) if meta.thread_id == snapshot.thread_id => return Ok(meta),
            Ok(Some(meta)) => {
                log::warn!(
                    "Stored meta for {} names thread '{}', regenerating",
                    snapshot.label(),
                    meta.thread_id
                );
            }
            Ok(None) => {}
            Err(e) if e.is_contract_violation() => {
                log::warn!(
                    "Unreadable meta for {}, regenerating: {}",
                    snapshot.label(),
                    e
                );
            }
            Err(e) => return Err(e),
        }
    }

    let meta = generate_snapshot_meta(snapshot)?;
    storage.write_snapshot_meta(&meta).await?;
    Ok(meta)
}

/// Recompute site meta from every thread's stored master meta and write it.
pub async fn aggregate_site_meta(storage: &dyn ThreadStorage, config: &Config) -> Result<SiteMeta> {
    let mut aggregator = SiteAggregator::new(&config.site);
    for thread_id in storage.list_threads().await? {
        let loaded = storage.load_master_meta(&thread_id).await;
        aggregator.add_loaded(&thread_id, loaded);
    }

    let skipped = aggregator.skipped();
    let site = aggregator.finish();
    storage.write_site_meta(&site).await?;

    log::info!(
        "Site {}: {} threads, {} total posts, {} distinct ({} threads skipped)",
        site.site_title,
        site.num_sitewide_threads,
        site.num_sitewide_total_posts,
        site.num_sitewide_dist_posts,
        skipped
    );
    Ok(site)
}

/// Reconcile every thread of the site, then recompute the site meta.
///
/// A failing thread is reported and counted; it never stops its siblings or
/// the aggregate step.
pub async fn reconcile_site(
    storage: &dyn ThreadStorage,
    config: &Config,
    observer: &dyn ReconcileObserver,
) -> Result<SiteSummary> {
    let start_time = Utc::now();
    let thread_ids = storage.list_threads().await?;
    let concurrency = config.reconcile.max_concurrent.max(1);

    log::info!(
        "Reconciling {} threads of {} ({} at a time)",
        thread_ids.len(),
        config.site.title,
        concurrency
    );

    let mut results = stream::iter(thread_ids)
        .map(|thread_id| async move {
            let result = reconcile_thread(storage, config, &thread_id, observer).await;
            (thread_id, result)
        })
        .buffer_unordered(concurrency);

    let mut threads = Vec::new();
    let mut failed = Vec::new();
    while let Some((thread_id, result)) = results.next().await {
        match result {
            Ok(summary) => threads.push(summary),
            Err(error) => {
                observer.thread_failed(&thread_id, &error);
                failed.push((thread_id, error.to_string()));
            }
        }
    }

    threads.sort_by(|a, b| a.thread_id.cmp(&b.thread_id));
    failed.sort();

    let site = aggregate_site_meta(storage, config).await?;
    let elapsed_ms = (Utc::now() - start_time).num_milliseconds();

    Ok(SiteSummary {
        threads,
        failed,
        site,
        elapsed_ms,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::{PostRecord, Timestamp};
    use crate::pipeline::LogObserver;
    use crate::pipeline::observer::recording::RecordingObserver;
    use crate::storage::LocalStorage;
    use tempfile::TempDir;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn snapshot(thread_id: &str, scraped: &str, reply_ids: &[&str]) -> Snapshot {
        let mut snapshot = Snapshot::new(thread_id, ts(scraped));
        snapshot.board_name = "/b/".into();
        snapshot.thread_title = format!("Thread {}", thread_id);
        snapshot.date_updated = Some(ts(scraped));
        snapshot.original_post = Some(PostRecord::new(
            thread_id,
            Some(ts("2024-01-01T00:00:00")),
            "Anonymous",
            "opening post",
        ));
        snapshot.replies = Some(
            reply_ids
                .iter()
                .map(|id| {
                    (
                        id.to_string(),
                        PostRecord::new(*id, Some(ts("2024-01-01T00:10:00")), "Anonymous", "a reply"),
                    )
                })
                .collect::<BTreeMap<_, _>>(),
        );
        snapshot
    }

    async fn seed(storage: &LocalStorage, snapshots: &[Snapshot]) {
        for snapshot in snapshots {
            storage.write_snapshot(snapshot).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_lost_post_is_flagged_in_master_content() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        seed(
            &storage,
            &[
                snapshot("1", "2024-01-01T01:00:00", &["2", "3"]),
                snapshot("1", "2024-01-01T02:00:00", &["3"]),
            ],
        )
        .await;

        let summary = reconcile_thread(&storage, &Config::default(), "1", &LogObserver)
            .await
            .unwrap();
        assert_eq!(summary.scans_folded, 2);
        assert_eq!(summary.flagged_lost, 1);

        let meta = storage.load_master_meta("1").await.unwrap().unwrap();
        assert!(meta.lost_post_ids.contains("2"));
        let content = storage.load_master_content("1").await.unwrap().unwrap();
        assert!(content.replies["2"].lost);
        assert!(!content.replies["3"].lost);

        // Snapshot metas were generated alongside the snapshots
        assert!(
            storage
                .load_snapshot_meta("1", ts("2024-01-01T01:00:00"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_reappearing_post_clears_live_flag() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        seed(
            &storage,
            &[
                snapshot("1", "2024-01-01T01:00:00", &["2"]),
                snapshot("1", "2024-01-01T02:00:00", &[]),
                snapshot("1", "2024-01-01T03:00:00", &["2"]),
            ],
        )
        .await;

        reconcile_thread(&storage, &Config::default(), "1", &LogObserver)
            .await
            .unwrap();

        let meta = storage.load_master_meta("1").await.unwrap().unwrap();
        assert!(meta.lost_post_ids.contains("2"));
        let content = storage.load_master_content("1").await.unwrap().unwrap();
        assert!(!content.replies["2"].lost);
    }

    #[tokio::test]
    async fn test_rerun_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        seed(
            &storage,
            &[
                snapshot("1", "2024-01-01T01:00:00", &["2", "3"]),
                snapshot("1", "2024-01-01T02:00:00", &["3", "4"]),
            ],
        )
        .await;
        let config = Config::default();

        let first = reconcile_thread(&storage, &config, "1", &LogObserver)
            .await
            .unwrap();
        let content_bytes = std::fs::read(tmp.path().join("1/master_version_1.json")).unwrap();
        let meta_bytes = std::fs::read(tmp.path().join("1/thread_meta_1.json")).unwrap();

        let second = reconcile_thread(&storage, &config, "1", &LogObserver)
            .await
            .unwrap();
        assert_eq!(first.content_fingerprint, second.content_fingerprint);
        assert_eq!(first.meta_fingerprint, second.meta_fingerprint);
        assert_eq!(
            content_bytes,
            std::fs::read(tmp.path().join("1/master_version_1.json")).unwrap()
        );
        assert_eq!(
            meta_bytes,
            std::fs::read(tmp.path().join("1/thread_meta_1.json")).unwrap()
        );
    }

    #[tokio::test]
    async fn test_malformed_snapshot_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        seed(&storage, &[snapshot("1", "2024-01-01T01:00:00", &["2"])]).await;

        let broken_dir = tmp.path().join("1/2024-01-01T02:00:00");
        std::fs::create_dir_all(&broken_dir).unwrap();
        std::fs::write(broken_dir.join("content_1.json"), b"{ not json").unwrap();

        let observer = RecordingObserver::default();
        let summary = reconcile_thread(&storage, &Config::default(), "1", &observer)
            .await
            .unwrap();

        assert_eq!(summary.scans_found, 2);
        assert_eq!(summary.scans_folded, 1);
        assert_eq!(summary.invalid_snapshots, 1);
        assert_eq!(observer.skipped.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_misfiled_snapshot_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        seed(&storage, &[snapshot("1", "2024-01-01T01:00:00", &["2"])]).await;

        // A snapshot of thread 9 stored in thread 1's folder
        let stray = snapshot("9", "2024-01-01T02:00:00", &["91"]);
        let stray_dir = tmp.path().join("1/2024-01-01T02:00:00");
        std::fs::create_dir_all(&stray_dir).unwrap();
        std::fs::write(
            stray_dir.join("content_1.json"),
            serde_json::to_vec(&stray).unwrap(),
        )
        .unwrap();

        let observer = RecordingObserver::default();
        let summary = reconcile_thread(&storage, &Config::default(), "1", &observer)
            .await
            .unwrap();

        assert_eq!(summary.scans_found, 2);
        assert_eq!(summary.scans_folded, 1);
        assert_eq!(summary.invalid_snapshots, 1);
        assert_eq!(observer.skipped.lock().unwrap().len(), 1);

        assert!(storage.load_master_meta("1").await.unwrap().is_some());
        assert_eq!(storage.list_threads().await.unwrap(), vec!["1".to_string()]);
        let content = storage.load_master_content("1").await.unwrap().unwrap();
        assert!(!content.replies.contains_key("91"));
    }

    #[tokio::test]
    async fn test_stored_meta_of_another_thread_is_regenerated() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let ours = snapshot("1", "2024-01-01T01:00:00", &["2"]);
        seed(&storage, &[ours.clone()]).await;

        let wrong = generate_snapshot_meta(&snapshot("9", "2024-01-01T01:00:00", &["91"])).unwrap();
        std::fs::write(
            tmp.path().join("1/2024-01-01T01:00:00/meta_1.json"),
            serde_json::to_vec(&wrong).unwrap(),
        )
        .unwrap();

        reconcile_thread(&storage, &Config::default(), "1", &LogObserver)
            .await
            .unwrap();

        let meta = storage.load_master_meta("1").await.unwrap().unwrap();
        assert_eq!(meta.thread_id, "1");
        assert!(!meta.unique_post_ids.contains("91"));
        let stored = storage
            .load_snapshot_meta("1", ours.date_scraped)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.thread_id, "1");
    }

    #[tokio::test]
    async fn test_site_reconcile_isolates_failures() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        seed(
            &storage,
            &[
                snapshot("1", "2024-01-01T01:00:00", &["11", "12"]),
                snapshot("1", "2024-01-01T02:00:00", &["11", "12", "13"]),
                snapshot("2", "2024-01-01T01:00:00", &["21"]),
            ],
        )
        .await;

        // A thread whose only snapshot violates the parser contract
        let mut broken = snapshot("3", "2024-01-01T01:00:00", &[]);
        broken.replies = None;
        seed(&storage, &[broken]).await;

        let observer = RecordingObserver::default();
        let summary = reconcile_site(&storage, &Config::default(), &observer)
            .await
            .unwrap();

        assert_eq!(summary.threads.len(), 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "3");
        assert_eq!(*observer.failed.lock().unwrap(), vec!["3".to_string()]);

        // thread 1: 3 + 4 aggregate, 4 unique; thread 2: 2 aggregate, 2 unique
        assert_eq!(summary.site.num_sitewide_threads, 2);
        assert_eq!(summary.site.num_sitewide_total_posts, 9);
        assert_eq!(summary.site.num_sitewide_dist_posts, 6);

        let stored = storage.load_site_meta().await.unwrap().unwrap();
        assert_eq!(stored.num_sitewide_total_posts, 9);
    }

    #[tokio::test]
    async fn test_thread_without_scans_is_empty_input() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let result = reconcile_thread(&storage, &Config::default(), "404", &LogObserver).await;
        assert!(matches!(result, Err(AppError::EmptyInput(_))));
    }

    #[test]
    fn test_build_masters_in_memory() {
        let snapshots = vec![
            snapshot("1", "2024-01-01T02:00:00", &["3"]),
            snapshot("1", "2024-01-01T01:00:00", &["2", "3"]),
        ];
        let metas = snapshots
            .iter()
            .map(|s| generate_snapshot_meta(s).unwrap())
            .collect();

        let masters = build_masters(snapshots, metas, &LogObserver).unwrap();
        assert_eq!(masters.content.replies.len(), 2);
        assert!(masters.content.replies["2"].lost);
        assert_eq!(masters.flagged_lost, 1);
        assert_eq!(masters.meta.num_aggregate_post_ids, 5);
        assert_eq!(masters.meta.num_unique_post_ids, 3);
    }
}
