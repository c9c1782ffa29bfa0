// src/pipeline/ingest.rs

use std::path::Path;

use crate::error::Result;
use crate::models::{Snapshot, SnapshotMeta};
use crate::pipeline::generate_snapshot_meta;
use crate::storage::ThreadStorage;

/// Store a freshly parsed snapshot together with its snapshot meta.
///
/// The snapshot is checked against the parser contract first, so nothing is
/// written for a snapshot the reconcilers would skip. Storing a second
/// snapshot for the same scan is an error.
pub async fn ingest_snapshot(
    storage: &dyn ThreadStorage,
    snapshot: &Snapshot,
) -> Result<SnapshotMeta> {
    let meta = generate_snapshot_meta(snapshot)?;
    storage.write_snapshot(snapshot).await?;
    storage.write_snapshot_meta(&meta).await?;

    log::info!(
        "Ingested {}: {} posts, {} words",
        snapshot.label(),
        meta.num_all_post_ids,
        meta.num_all_words
    );
    Ok(meta)
}

/// Read a snapshot JSON file produced by a parser and ingest it.
pub async fn ingest_file(storage: &dyn ThreadStorage, path: &Path) -> Result<SnapshotMeta> {
    let bytes = tokio::fs::read(path).await?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
    ingest_snapshot(storage, &snapshot).await
}
