//! Master records: the cumulative view of a thread across all snapshots.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::{PostRecord, Timestamp};

/// Deduplicated content of a thread: every post ever observed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MasterContent {
    pub thread_id: String,
    pub original_post: PostRecord,
    /// Monotonically growing; posts are flagged, never removed
    pub replies: BTreeMap<String, PostRecord>,
}

impl MasterContent {
    /// Fresh, empty accumulator for one fold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of posts held, original post included.
    pub fn post_count(&self) -> usize {
        let op = usize::from(!self.original_post.post_id.is_empty());
        op + self.replies.len()
    }

    /// Set each post's live `lost` flag from the reconciled meta.
    ///
    /// A post is lost when the meta ledger lists it and the most recent scan
    /// did not show it. Returns the number of posts flagged.
    pub fn apply_lost_flags(&mut self, meta: &MasterMeta) -> usize {
        let latest = meta.latest_post_ids();
        let is_lost = |post_id: &str| {
            meta.lost_post_ids.contains(post_id)
                && !latest.is_some_and(|ids| ids.contains(post_id))
        };

        let mut flagged = 0;
        for post in std::iter::once(&mut self.original_post).chain(self.replies.values_mut()) {
            post.lost = is_lost(&post.post_id);
            flagged += usize::from(post.lost);
        }
        flagged
    }
}

/// Cumulative statistics of a thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MasterMeta {
    pub thread_id: String,
    pub board_name: String,
    pub thread_title: String,
    pub url: String,

    /// First seen, fixed
    pub date_published: Option<Timestamp>,

    /// High-water marks, merged with `max`
    pub most_recent_update_date: Option<Timestamp>,
    pub most_recent_scrape_date: Option<Timestamp>,

    pub unique_post_ids: BTreeSet<String>,

    /// Historical ledger; a post that comes back stays listed
    pub lost_post_ids: BTreeSet<String>,

    /// Post ids seen in each scan, keyed by scrape time
    pub snapshot_history: BTreeMap<Timestamp, BTreeSet<String>>,

    pub num_aggregate_post_ids: usize,
    pub num_unique_post_ids: usize,
    pub num_lost_post_ids: usize,
    pub num_aggregate_words: usize,
}

impl MasterMeta {
    /// Fresh, empty accumulator for one fold.
    pub fn new_accumulator() -> Self {
        Self::default()
    }

    /// Post ids observed by the most recent scan folded so far.
    pub fn latest_post_ids(&self) -> Option<&BTreeSet<String>> {
        self.most_recent_scrape_date
            .as_ref()
            .and_then(|scraped| self.snapshot_history.get(scraped))
    }

    /// Number of scans recorded in the history.
    pub fn scan_count(&self) -> usize {
        self.snapshot_history.len()
    }
}
