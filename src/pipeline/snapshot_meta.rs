//! Snapshot meta generation.
//!
//! Derives per-scan statistics from one snapshot. Strict: a snapshot that
//! breaks the parser contract is an error, never a partial meta.

use crate::error::Result;
use crate::models::{Snapshot, SnapshotMeta};

/// Build the meta record of a snapshot.
pub fn generate_snapshot_meta(snapshot: &Snapshot) -> Result<SnapshotMeta> {
    snapshot.validate()?;

    let mut meta = SnapshotMeta {
        board_name: snapshot.board_name.clone(),
        thread_title: snapshot.thread_title.clone(),
        thread_id: snapshot.thread_id.clone(),
        url: snapshot.url.clone(),
        date_published: snapshot.date_published,
        date_updated: snapshot.date_updated,
        date_scraped: snapshot.date_scraped,
        all_post_dates: Default::default(),
        all_post_ids: Default::default(),
        num_all_post_ids: 0,
        num_all_words: 0,
    };

    for post in snapshot.posts() {
        meta.all_post_ids.insert(post.post_id.clone());
        meta.all_post_dates.extend(post.date_posted);
        meta.num_all_words += post.word_count();
    }
    meta.num_all_post_ids = meta.all_post_ids.len();

    log::debug!(
        "Generated meta for {}: {} posts, {} words",
        snapshot.label(),
        meta.num_all_post_ids,
        meta.num_all_words
    );

    Ok(meta)
}
