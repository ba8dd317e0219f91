// Read/write contract for the three trend tables.
//
// Every write is an upsert keyed by the row's natural key, so concurrent or
// repeated runs converge to last-write-wins per key.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use citytrends_common::{HashtagTrend, Platform, ProcessedTrend, RawPost};

#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Insert or overwrite by `(platform, post_id)`.
    async fn upsert_raw_post(&self, post: &RawPost) -> Result<()>;

    /// Insert or overwrite by `(hashtag, period, neighborhood)`.
    async fn upsert_hashtag_trend(&self, trend: &HashtagTrend) -> Result<()>;

    /// Insert or overwrite by `(city, period, trend_type, trend_name)`.
    async fn upsert_processed_trend(&self, trend: &ProcessedTrend) -> Result<()>;

    /// Posts collected at or after `since`, oldest first.
    async fn raw_posts_since(
        &self,
        since: DateTime<Utc>,
        platform: Option<Platform>,
    ) -> Result<Vec<RawPost>>;

    /// All processed trends for a period, ordered by city, type and rank.
    async fn processed_trends(&self, period: &str) -> Result<Vec<ProcessedTrend>>;

    /// All hashtag aggregates for a period, highest `total_plays` first.
    async fn hashtag_trends(&self, period: &str) -> Result<Vec<HashtagTrend>>;
}
