// Collection jobs: scrape each configured target and upsert normalized posts.
//
// A target's failure (provider error, timeout, bad item, failed write) is
// logged and recorded against that target only; the job always completes.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use tracing::{info, warn};

use citytrends_common::{
    normalize_hashtag, period_for, CollectSettings, HashtagTarget, HashtagTrend, LocationTarget,
    RawPost,
};
use citytrends_store::TrendStore;

use crate::normalize;
use crate::traits::PostScraper;

/// Outcome for one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetReport {
    pub target: String,
    pub posts_saved: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TargetReport {
    fn saved(target: &str, posts_saved: usize) -> Self {
        Self {
            target: target.to_string(),
            posts_saved,
            error: None,
        }
    }

    fn failed(target: &str, error: String) -> Self {
        Self {
            target: target.to_string(),
            posts_saved: 0,
            error: Some(error),
        }
    }
}

/// Per-target outcomes, in configured target order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectReport {
    pub total: usize,
    pub targets: Vec<TargetReport>,
}

impl CollectReport {
    fn from_targets(targets: Vec<TargetReport>) -> Self {
        Self {
            total: targets.iter().map(|t| t.posts_saved).sum(),
            targets,
        }
    }

    pub fn failed_targets(&self) -> usize {
        self.targets.iter().filter(|t| t.error.is_some()).count()
    }
}

impl fmt::Display for CollectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Collection Complete ===")?;
        for t in &self.targets {
            match &t.error {
                Some(err) => writeln!(f, "  {:<32} failed: {err}", t.target)?,
                None => writeln!(f, "  {:<32} {} posts", t.target, t.posts_saved)?,
            }
        }
        write!(f, "Total posts saved: {}", self.total)
    }
}

/// Persist posts one at a time; a failed write skips that post only.
async fn save_posts(store: &dyn TrendStore, label: &str, posts: Vec<RawPost>) -> Vec<RawPost> {
    let mut saved = Vec::with_capacity(posts.len());
    for post in posts {
        match store.upsert_raw_post(&post).await {
            Ok(()) => saved.push(post),
            Err(e) => warn!(
                label,
                post_id = post.post_id.as_str(),
                error = %e,
                "Failed to save post"
            ),
        }
    }
    saved
}

// ---------------------------------------------------------------------------
// Instagram: location search
// ---------------------------------------------------------------------------

pub struct InstagramCollector {
    scraper: Arc<dyn PostScraper>,
    store: Arc<dyn TrendStore>,
    settings: CollectSettings,
}

impl InstagramCollector {
    pub fn new(
        scraper: Arc<dyn PostScraper>,
        store: Arc<dyn TrendStore>,
        settings: CollectSettings,
    ) -> Self {
        Self {
            scraper,
            store,
            settings,
        }
    }

    pub async fn run(&self, targets: &[LocationTarget], now: DateTime<Utc>) -> CollectReport {
        info!(targets = targets.len(), "Instagram collection starting");
        let reports = stream::iter(targets)
            .map(|target| self.collect_location(target, now))
            .buffered(self.settings.concurrency.max(1))
            .collect::<Vec<_>>()
            .boxed()
            .await;

        let report = CollectReport::from_targets(reports);
        info!("{report}");
        report
    }

    async fn collect_location(&self, target: &LocationTarget, now: DateTime<Utc>) -> TargetReport {
        let label = target.query.as_str();
        let limit = self.settings.instagram_results_per_location;
        let timeout = self.settings.provider_timeout();

        let items = match tokio::time::timeout(
            timeout,
            self.scraper.search_instagram_location(label, limit),
        )
        .await
        {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                warn!(location = label, error = %e, "Instagram scrape failed");
                return TargetReport::failed(label, e.to_string());
            }
            Err(_) => {
                warn!(location = label, secs = timeout.as_secs(), "Instagram scrape timed out");
                return TargetReport::failed(label, format!("timed out after {}s", timeout.as_secs()));
            }
        };

        let fetched = items.len();
        let posts: Vec<RawPost> = items
            .into_iter()
            .filter_map(|item| normalize::instagram_post(item, target, now))
            .collect();
        let saved = save_posts(self.store.as_ref(), label, posts).await;

        info!(location = label, fetched, saved = saved.len(), "Instagram location collected");
        TargetReport::saved(label, saved.len())
    }
}

// ---------------------------------------------------------------------------
// TikTok: hashtag search plus weekly hashtag aggregate
// ---------------------------------------------------------------------------

pub struct TikTokCollector {
    scraper: Arc<dyn PostScraper>,
    store: Arc<dyn TrendStore>,
    settings: CollectSettings,
}

impl TikTokCollector {
    pub fn new(
        scraper: Arc<dyn PostScraper>,
        store: Arc<dyn TrendStore>,
        settings: CollectSettings,
    ) -> Self {
        Self {
            scraper,
            store,
            settings,
        }
    }

    pub async fn run(&self, targets: &[HashtagTarget], now: DateTime<Utc>) -> CollectReport {
        let period = period_for(now.with_timezone(&Local).date_naive());
        info!(targets = targets.len(), period = period.as_str(), "TikTok collection starting");

        let reports = stream::iter(targets)
            .map(|target| self.collect_hashtag(target, &period, now))
            .buffered(self.settings.concurrency.max(1))
            .collect::<Vec<_>>()
            .boxed()
            .await;

        let report = CollectReport::from_targets(reports);
        info!("{report}");
        report
    }

    async fn collect_hashtag(
        &self,
        target: &HashtagTarget,
        period: &str,
        now: DateTime<Utc>,
    ) -> TargetReport {
        let label = target.tag.as_str();
        let limit = self.settings.tiktok_results_per_hashtag;
        let timeout = self.settings.provider_timeout();

        let items = match tokio::time::timeout(
            timeout,
            self.scraper.search_tiktok_hashtag(label, limit),
        )
        .await
        {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                warn!(hashtag = label, error = %e, "TikTok scrape failed");
                return TargetReport::failed(label, e.to_string());
            }
            Err(_) => {
                warn!(hashtag = label, secs = timeout.as_secs(), "TikTok scrape timed out");
                return TargetReport::failed(label, format!("timed out after {}s", timeout.as_secs()));
            }
        };

        let posts: Vec<RawPost> = items
            .into_iter()
            .filter_map(|item| normalize::tiktok_post(item, target, now))
            .collect();
        let saved = save_posts(self.store.as_ref(), label, posts).await;

        let trend = HashtagTrend::from_posts(
            &normalize_hashtag(label),
            period,
            target.city.clone(),
            target.neighborhood.clone(),
            &saved,
        );
        if let Err(e) = self.store.upsert_hashtag_trend(&trend).await {
            warn!(hashtag = label, error = %e, "Failed to save hashtag trend");
        }

        info!(
            hashtag = label,
            saved = saved.len(),
            total_plays = trend.total_plays,
            "TikTok hashtag collected"
        );
        TargetReport::saved(label, saved.len())
    }
}
