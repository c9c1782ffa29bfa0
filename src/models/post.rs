//! Post record: one original post or reply.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Timestamp;

/// A single post as parsed from a thread page.
///
/// Field names on the wire follow the parser's output (`post_content`,
/// `username`, `img_links`); the Rust names are aliases accepted on input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PostRecord {
    /// Site-assigned id, unique within a thread
    #[serde(default)]
    pub post_id: String,

    /// When the post was made
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_posted: Option<Timestamp>,

    /// Display name
    #[serde(default, rename = "username", alias = "author")]
    pub author: String,

    /// Plain text body with normalized whitespace
    #[serde(default, rename = "post_content", alias = "body")]
    pub body: Option<String>,

    /// Absolute image URLs, in page order
    #[serde(default, rename = "img_links", alias = "image_links")]
    pub image_links: Vec<String>,

    /// Ids this post quotes
    #[serde(default)]
    pub replied_to_ids: Vec<String>,

    /// Previously seen and absent from the latest snapshot
    #[serde(default, skip_serializing_if = "is_false")]
    pub lost: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl PostRecord {
    /// Create a post with the fields every parser emits.
    pub fn new(
        post_id: impl Into<String>,
        date_posted: Option<Timestamp>,
        author: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            date_posted,
            author: author.into(),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// Check the parser contract: a post needs an id and a body.
    ///
    /// `context` names the post's location for the error message.
    pub fn validate(&self, context: &str) -> Result<()> {
        if self.post_id.trim().is_empty() {
            return Err(AppError::missing_field(context, "post_id"));
        }
        if self.body.is_none() {
            return Err(AppError::missing_field(
                format!("{} (post {})", context, self.post_id),
                "post_content",
            ));
        }
        Ok(())
    }

    /// Number of whitespace-delimited tokens in the body.
    pub fn word_count(&self) -> usize {
        self.body
            .as_deref()
            .map(|body| body.split_whitespace().count())
            .unwrap_or(0)
    }

    /// Overwrite fields with the ones a newer observation carries.
    ///
    /// Absent or empty fields on `newer`, strings and lists alike, leave the
    /// current value alone. The `lost` flag is live status and is not touched
    /// here.
    pub fn merge_from(&mut self, newer: PostRecord) {
        if !newer.post_id.is_empty() {
            self.post_id = newer.post_id;
        }
        if newer.date_posted.is_some() {
            self.date_posted = newer.date_posted;
        }
        if !newer.author.is_empty() {
            self.author = newer.author;
        }
        if newer.body.is_some() {
            self.body = newer.body;
        }
        if !newer.image_links.is_empty() {
            self.image_links = newer.image_links;
        }
        if !newer.replied_to_ids.is_empty() {
            self.replied_to_ids = newer.replied_to_ids;
        }
    }
}
