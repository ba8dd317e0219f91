// In-memory TrendStore for tests and local runs without Postgres.
//
// Mirrors the upsert keys of the Postgres schema. Individual writes can be made
// to fail (by post id or trend name) and reads can be made to fail, to exercise
// the pipeline's isolation rules.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use citytrends_common::{HashtagTrend, Platform, ProcessedTrend, RawPost};

use crate::traits::TrendStore;

#[derive(Default)]
struct Inner {
    raw_posts: Vec<RawPost>,
    hashtag_trends: Vec<HashtagTrend>,
    processed_trends: Vec<ProcessedTrend>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    failing_post_ids: HashSet<String>,
    failing_trend_names: HashSet<String>,
    failing_reads: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts of a raw post with this id return an error.
    pub fn failing_post(mut self, post_id: &str) -> Self {
        self.failing_post_ids.insert(post_id.to_string());
        self
    }

    /// Upserts of a processed trend with this name return an error.
    pub fn failing_trend(mut self, trend_name: &str) -> Self {
        self.failing_trend_names.insert(trend_name.to_string());
        self
    }

    /// Every read returns an error.
    pub fn failing_reads(mut self) -> Self {
        self.failing_reads = true;
        self
    }

    pub fn raw_posts(&self) -> Vec<RawPost> {
        self.lock().raw_posts.clone()
    }

    pub fn all_hashtag_trends(&self) -> Vec<HashtagTrend> {
        self.lock().hashtag_trends.clone()
    }

    pub fn all_processed_trends(&self) -> Vec<ProcessedTrend> {
        self.lock().processed_trends.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_reads(&self) -> Result<()> {
        if self.failing_reads {
            bail!("MemoryStore: reads disabled");
        }
        Ok(())
    }
}

fn replace_or_push<T>(rows: &mut Vec<T>, row: T, same_key: impl Fn(&T) -> bool) {
    match rows.iter_mut().find(|existing| same_key(existing)) {
        Some(existing) => *existing = row,
        None => rows.push(row),
    }
}

#[async_trait]
impl TrendStore for MemoryStore {
    async fn upsert_raw_post(&self, post: &RawPost) -> Result<()> {
        if self.failing_post_ids.contains(&post.post_id) {
            bail!("MemoryStore: upsert failed for post {}", post.post_id);
        }
        let mut inner = self.lock();
        replace_or_push(&mut inner.raw_posts, post.clone(), |p| {
            p.platform == post.platform && p.post_id == post.post_id
        });
        Ok(())
    }

    async fn upsert_hashtag_trend(&self, trend: &HashtagTrend) -> Result<()> {
        let mut inner = self.lock();
        replace_or_push(&mut inner.hashtag_trends, trend.clone(), |t| {
            t.hashtag == trend.hashtag
                && t.period == trend.period
                && t.neighborhood == trend.neighborhood
        });
        Ok(())
    }

    async fn upsert_processed_trend(&self, trend: &ProcessedTrend) -> Result<()> {
        if self.failing_trend_names.contains(&trend.trend_name) {
            bail!("MemoryStore: upsert failed for trend {}", trend.trend_name);
        }
        let mut inner = self.lock();
        replace_or_push(&mut inner.processed_trends, trend.clone(), |t| {
            t.city == trend.city
                && t.period == trend.period
                && t.trend_type == trend.trend_type
                && t.trend_name == trend.trend_name
        });
        Ok(())
    }

    async fn raw_posts_since(
        &self,
        since: DateTime<Utc>,
        platform: Option<Platform>,
    ) -> Result<Vec<RawPost>> {
        self.check_reads()?;
        let mut posts: Vec<RawPost> = self
            .lock()
            .raw_posts
            .iter()
            .filter(|p| p.collected_at >= since)
            .filter(|p| platform.map_or(true, |wanted| p.platform == wanted))
            .cloned()
            .collect();
        posts.sort_by_key(|p| p.collected_at);
        Ok(posts)
    }

    async fn processed_trends(&self, period: &str) -> Result<Vec<ProcessedTrend>> {
        self.check_reads()?;
        let mut trends: Vec<ProcessedTrend> = self
            .lock()
            .processed_trends
            .iter()
            .filter(|t| t.period == period)
            .cloned()
            .collect();
        trends.sort_by(|a, b| {
            a.city
                .cmp(&b.city)
                .then_with(|| a.trend_type.as_str().cmp(b.trend_type.as_str()))
                .then_with(|| a.rank.cmp(&b.rank))
        });
        Ok(trends)
    }

    async fn hashtag_trends(&self, period: &str) -> Result<Vec<HashtagTrend>> {
        self.check_reads()?;
        let mut trends: Vec<HashtagTrend> = self
            .lock()
            .hashtag_trends
            .iter()
            .filter(|t| t.period == period)
            .cloned()
            .collect();
        trends.sort_by(|a, b| b.total_plays.cmp(&a.total_plays));
        Ok(trends)
    }
}
