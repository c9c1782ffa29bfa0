//! Site-wide aggregate statistics.

use serde::{Deserialize, Serialize};

use crate::models::Timestamp;

/// Totals across every thread of one site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SiteMeta {
    pub site_title: String,
    pub url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub keywords: String,

    /// Threads with a master meta
    pub num_sitewide_threads: usize,

    /// Sum of each thread's aggregate post count
    pub num_sitewide_total_posts: usize,

    /// Sum of each thread's distinct post count
    pub num_sitewide_dist_posts: usize,

    #[serde(default)]
    pub num_sitewide_lost_posts: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_aggregated: Option<Timestamp>,
}
