//! Site-wide aggregation.
//!
//! Always a full recomputation over every thread's current master meta, so
//! the totals heal themselves after manual edits or partial failures.

use crate::error::Result;
use crate::models::{MasterMeta, SiteConfig, SiteMeta, Timestamp};

/// Accumulates master metas into site totals.
#[derive(Debug, Clone)]
pub struct SiteAggregator {
    meta: SiteMeta,
    skipped: usize,
}

impl SiteAggregator {
    /// Start an empty aggregate for a site.
    pub fn new(site: &SiteConfig) -> Self {
        Self {
            meta: SiteMeta {
                site_title: site.title.clone(),
                url: site.url.clone(),
                description: site.description.clone(),
                keywords: site.keywords.clone(),
                ..SiteMeta::default()
            },
            skipped: 0,
        }
    }

    /// Add one thread's master meta.
    pub fn add(&mut self, master: &MasterMeta) {
        self.meta.num_sitewide_threads += 1;
        self.meta.num_sitewide_total_posts += master.num_aggregate_post_ids;
        self.meta.num_sitewide_dist_posts += master.num_unique_post_ids;
        self.meta.num_sitewide_lost_posts += master.num_lost_post_ids;
    }

    /// Add the outcome of loading one thread's master meta.
    ///
    /// Missing or unreadable metas are logged and left out of the totals.
    pub fn add_loaded(&mut self, thread_id: &str, loaded: Result<Option<MasterMeta>>) {
        match loaded {
            Ok(Some(master)) => self.add(&master),
            Ok(None) => {
                self.skipped += 1;
                log::warn!("Thread {}: no master meta, left out of site totals", thread_id);
            }
            Err(e) => {
                self.skipped += 1;
                log::warn!(
                    "Thread {}: unreadable master meta, left out of site totals: {}",
                    thread_id,
                    e
                );
            }
        }
    }

    /// Threads left out so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Finish the aggregate, stamping it with the current time.
    pub fn finish(self) -> SiteMeta {
        SiteMeta {
            date_aggregated: Some(Timestamp::now()),
            ..self.meta
        }
    }
}

/// Aggregate a set of master metas into site meta.
pub fn aggregate_site<'a>(
    site: &SiteConfig,
    masters: impl IntoIterator<Item = &'a MasterMeta>,
) -> SiteMeta {
    let mut aggregator = SiteAggregator::new(site);
    for master in masters {
        aggregator.add(master);
    }
    aggregator.finish()
}
