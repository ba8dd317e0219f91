// Postgres persistence for raw posts, hashtag aggregates and processed trends.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use citytrends_common::{HashtagTrend, Platform, ProcessedTrend, RawPost};

use crate::error::StoreError;
use crate::traits::TrendStore;

#[derive(Clone)]
pub struct PgTrendStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct RawPostRow {
    platform: String,
    post_id: String,
    city: String,
    neighborhood: Option<String>,
    caption: String,
    hashtags: Vec<String>,
    likes: i64,
    comments: i64,
    plays: i64,
    shares: i64,
    author: String,
    collected_at: DateTime<Utc>,
}

impl TryFrom<RawPostRow> for RawPost {
    type Error = StoreError;

    fn try_from(row: RawPostRow) -> Result<Self, Self::Error> {
        Ok(RawPost {
            platform: row.platform.parse().map_err(StoreError::Decode)?,
            city: row.city,
            neighborhood: row.neighborhood,
            post_id: row.post_id,
            caption: row.caption,
            hashtags: row.hashtags,
            likes: row.likes,
            comments: row.comments,
            plays: row.plays,
            shares: row.shares,
            author: row.author,
            collected_at: row.collected_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HashtagTrendRow {
    hashtag: String,
    period: String,
    neighborhood: String,
    city: Option<String>,
    total_plays: i64,
    total_likes: i64,
    total_shares: i64,
    post_count: i64,
    avg_engagement: f64,
    top_related_hashtags: Vec<String>,
}

impl From<HashtagTrendRow> for HashtagTrend {
    fn from(row: HashtagTrendRow) -> Self {
        HashtagTrend {
            hashtag: row.hashtag,
            period: row.period,
            city: row.city,
            neighborhood: Some(row.neighborhood).filter(|n| !n.is_empty()),
            total_plays: row.total_plays,
            total_likes: row.total_likes,
            total_shares: row.total_shares,
            post_count: row.post_count,
            avg_engagement: row.avg_engagement,
            top_related_hashtags: row.top_related_hashtags,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProcessedTrendRow {
    city: String,
    neighborhood: Option<String>,
    period: String,
    trend_type: String,
    trend_name: String,
    mentions: i64,
    avg_engagement: f64,
    change_percent: Option<f64>,
    is_new: bool,
    rank: i32,
    source_platform: String,
    metadata: Option<serde_json::Value>,
}

impl TryFrom<ProcessedTrendRow> for ProcessedTrend {
    type Error = StoreError;

    fn try_from(row: ProcessedTrendRow) -> Result<Self, Self::Error> {
        Ok(ProcessedTrend {
            city: row.city,
            neighborhood: row.neighborhood,
            period: row.period,
            trend_type: row.trend_type.parse().map_err(StoreError::Decode)?,
            trend_name: row.trend_name,
            mentions: row.mentions,
            avg_engagement: row.avg_engagement,
            change_percent: row.change_percent,
            is_new: row.is_new,
            rank: row.rank,
            source_platform: row.source_platform.parse().map_err(StoreError::Decode)?,
            metadata: row.metadata,
        })
    }
}

impl PgTrendStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TrendStore for PgTrendStore {
    async fn upsert_raw_post(&self, post: &RawPost) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO raw_posts
                (platform, post_id, city, neighborhood, caption, hashtags,
                 likes, comments, plays, shares, author, collected_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (platform, post_id) DO UPDATE SET
                city = EXCLUDED.city,
                neighborhood = EXCLUDED.neighborhood,
                caption = EXCLUDED.caption,
                hashtags = EXCLUDED.hashtags,
                likes = EXCLUDED.likes,
                comments = EXCLUDED.comments,
                plays = EXCLUDED.plays,
                shares = EXCLUDED.shares,
                author = EXCLUDED.author,
                collected_at = EXCLUDED.collected_at
            "#,
        )
        .bind(post.platform.as_str())
        .bind(&post.post_id)
        .bind(&post.city)
        .bind(&post.neighborhood)
        .bind(&post.caption)
        .bind(&post.hashtags)
        .bind(post.likes)
        .bind(post.comments)
        .bind(post.plays)
        .bind(post.shares)
        .bind(&post.author)
        .bind(post.collected_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_hashtag_trend(&self, trend: &HashtagTrend) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO hashtag_trends
                (hashtag, period, neighborhood, city, total_plays, total_likes,
                 total_shares, post_count, avg_engagement, top_related_hashtags, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now())
            ON CONFLICT (hashtag, period, neighborhood) DO UPDATE SET
                city = EXCLUDED.city,
                total_plays = EXCLUDED.total_plays,
                total_likes = EXCLUDED.total_likes,
                total_shares = EXCLUDED.total_shares,
                post_count = EXCLUDED.post_count,
                avg_engagement = EXCLUDED.avg_engagement,
                top_related_hashtags = EXCLUDED.top_related_hashtags,
                updated_at = now()
            "#,
        )
        .bind(&trend.hashtag)
        .bind(&trend.period)
        .bind(trend.neighborhood.as_deref().unwrap_or(""))
        .bind(&trend.city)
        .bind(trend.total_plays)
        .bind(trend.total_likes)
        .bind(trend.total_shares)
        .bind(trend.post_count)
        .bind(trend.avg_engagement)
        .bind(&trend.top_related_hashtags)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_processed_trend(&self, trend: &ProcessedTrend) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO processed_trends
                (city, period, trend_type, trend_name, neighborhood, mentions,
                 avg_engagement, change_percent, is_new, rank, source_platform,
                 metadata, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now())
            ON CONFLICT (city, period, trend_type, trend_name) DO UPDATE SET
                neighborhood = EXCLUDED.neighborhood,
                mentions = EXCLUDED.mentions,
                avg_engagement = EXCLUDED.avg_engagement,
                change_percent = EXCLUDED.change_percent,
                is_new = EXCLUDED.is_new,
                rank = EXCLUDED.rank,
                source_platform = EXCLUDED.source_platform,
                metadata = EXCLUDED.metadata,
                updated_at = now()
            "#,
        )
        .bind(&trend.city)
        .bind(&trend.period)
        .bind(trend.trend_type.as_str())
        .bind(&trend.trend_name)
        .bind(&trend.neighborhood)
        .bind(trend.mentions)
        .bind(trend.avg_engagement)
        .bind(trend.change_percent)
        .bind(trend.is_new)
        .bind(trend.rank)
        .bind(trend.source_platform.as_str())
        .bind(&trend.metadata)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn raw_posts_since(
        &self,
        since: DateTime<Utc>,
        platform: Option<Platform>,
    ) -> Result<Vec<RawPost>> {
        let rows = sqlx::query_as::<_, RawPostRow>(
            r#"
            SELECT platform, post_id, city, neighborhood, caption, hashtags,
                   likes, comments, plays, shares, author, collected_at
            FROM raw_posts
            WHERE collected_at >= $1
              AND ($2::TEXT IS NULL OR platform = $2)
            ORDER BY collected_at ASC
            "#,
        )
        .bind(since)
        .bind(platform.map(|p| p.as_str()))
        .fetch_all(&self.pool)
        .await?;

        let posts = rows
            .into_iter()
            .map(RawPost::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn processed_trends(&self, period: &str) -> Result<Vec<ProcessedTrend>> {
        let rows = sqlx::query_as::<_, ProcessedTrendRow>(
            r#"
            SELECT city, neighborhood, period, trend_type, trend_name, mentions,
                   avg_engagement, change_percent, is_new, rank, source_platform, metadata
            FROM processed_trends
            WHERE period = $1
            ORDER BY city ASC, trend_type ASC, rank ASC
            "#,
        )
        .bind(period)
        .fetch_all(&self.pool)
        .await?;

        let trends = rows
            .into_iter()
            .map(ProcessedTrend::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trends)
    }

    async fn hashtag_trends(&self, period: &str) -> Result<Vec<HashtagTrend>> {
        let rows = sqlx::query_as::<_, HashtagTrendRow>(
            r#"
            SELECT hashtag, period, neighborhood, city, total_plays, total_likes,
                   total_shares, post_count, avg_engagement, top_related_hashtags
            FROM hashtag_trends
            WHERE period = $1
            ORDER BY total_plays DESC
            "#,
        )
        .bind(period)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(HashtagTrend::from).collect())
    }
}
