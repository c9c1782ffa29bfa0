//! Snapshot of one thread at one scan, and its derived statistics.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{PostRecord, Timestamp};

/// One parse result of one fetch of one thread.
///
/// `original_post` and `replies` are optional so that a damaged snapshot can
/// still be read and skipped by the reconcilers instead of failing the load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    #[serde(default)]
    pub thread_id: String,

    #[serde(default)]
    pub board_name: String,

    #[serde(default)]
    pub thread_title: String,

    #[serde(default)]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_published: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_updated: Option<Timestamp>,

    /// Time of this scan; orders every fold
    pub date_scraped: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_post: Option<PostRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<BTreeMap<String, PostRecord>>,
}

impl Snapshot {
    /// Create an empty snapshot for a thread scanned at `date_scraped`.
    pub fn new(thread_id: impl Into<String>, date_scraped: Timestamp) -> Self {
        Self {
            thread_id: thread_id.into(),
            board_name: String::new(),
            thread_title: String::new(),
            url: String::new(),
            date_published: None,
            date_updated: None,
            date_scraped,
            original_post: None,
            replies: None,
        }
    }

    /// Human-readable label used in log and error messages.
    pub fn label(&self) -> String {
        format!("snapshot {}@{}", self.thread_id, self.date_scraped)
    }

    /// Check the parser contract.
    ///
    /// Rejects a missing `thread_id`, `original_post`, `replies`, or any post
    /// lacking `post_id`/`post_content`.
    pub fn validate(&self) -> Result<()> {
        let label = self.label();
        if self.thread_id.trim().is_empty() {
            return Err(AppError::missing_field(label, "thread_id"));
        }
        let original_post = self
            .original_post
            .as_ref()
            .ok_or_else(|| AppError::missing_field(label.clone(), "original_post"))?;
        let replies = self
            .replies
            .as_ref()
            .ok_or_else(|| AppError::missing_field(label.clone(), "replies"))?;

        original_post.validate(&format!("{} original post", label))?;
        for (key, reply) in replies {
            reply.validate(&format!("{} reply {}", label, key))?;
        }
        Ok(())
    }

    /// All posts of the snapshot, original post first.
    pub fn posts(&self) -> impl Iterator<Item = &PostRecord> {
        self.original_post
            .iter()
            .chain(self.replies.iter().flat_map(|replies| replies.values()))
    }
}

/// Per-snapshot statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotMeta {
    pub board_name: String,
    pub thread_title: String,
    pub thread_id: String,
    pub url: String,
    pub date_published: Option<Timestamp>,
    pub date_updated: Option<Timestamp>,
    pub date_scraped: Timestamp,
    pub all_post_dates: BTreeSet<Timestamp>,
    pub all_post_ids: BTreeSet<String>,
    pub num_all_post_ids: usize,
    pub num_all_words: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraped() -> Timestamp {
        Timestamp::parse("2024-05-01T08:00:00").unwrap()
    }

    fn valid_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new("1000", scraped());
        snapshot.original_post = Some(PostRecord::new("1000", None, "Anonymous", "op text"));
        snapshot.replies = Some(BTreeMap::from([(
            "1001".to_string(),
            PostRecord::new("1001", None, "Anonymous", "reply text"),
        )]));
        snapshot
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_snapshot().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_replies() {
        let mut snapshot = valid_snapshot();
        snapshot.replies = None;
        assert!(matches!(
            snapshot.validate(),
            Err(AppError::MissingField { field: "replies", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_missing_thread_id() {
        let mut snapshot = valid_snapshot();
        snapshot.thread_id.clear();
        assert!(matches!(
            snapshot.validate(),
            Err(AppError::MissingField { field: "thread_id", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_op_without_id() {
        let mut snapshot = valid_snapshot();
        snapshot.original_post.as_mut().unwrap().post_id.clear();
        assert!(matches!(
            snapshot.validate(),
            Err(AppError::MissingField { field: "post_id", .. })
        ));
    }

    #[test]
    fn test_deserialize_without_posts() {
        let json = r#"{"thread_id": "9", "date_scraped": "2024-05-01T08:00:00"}"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.original_post.is_none());
        assert!(snapshot.replies.is_none());
        assert_eq!(snapshot.posts().count(), 0);
    }
}
