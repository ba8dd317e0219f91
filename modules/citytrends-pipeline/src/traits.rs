// Trait seams for the pipeline's external collaborators.
//
// PostScraper stands in front of ApifyClient and TrendExtractor in front of the
// LLM, so collectors and the processor can be driven in tests with
// MockScraper / MockExtractor: no network, no API keys.

use anyhow::Result;
use apify_client::{ApifyClient, InstagramPost, TikTokPost};
use async_trait::async_trait;

use crate::extractor::ExtractedTrends;

// ---------------------------------------------------------------------------
// PostScraper: social post search, backed by Apify in production
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PostScraper: Send + Sync {
    /// Posts tagged at a place matching `query`.
    async fn search_instagram_location(&self, query: &str, limit: u32) -> Result<Vec<InstagramPost>>;

    /// Posts carrying `hashtag`.
    async fn search_tiktok_hashtag(&self, hashtag: &str, limit: u32) -> Result<Vec<TikTokPost>>;
}

#[async_trait]
impl PostScraper for ApifyClient {
    async fn search_instagram_location(&self, query: &str, limit: u32) -> Result<Vec<InstagramPost>> {
        Ok(ApifyClient::search_instagram_location(self, query, limit).await?)
    }

    async fn search_tiktok_hashtag(&self, hashtag: &str, limit: u32) -> Result<Vec<TikTokPost>> {
        Ok(ApifyClient::search_tiktok_hashtag(self, hashtag, limit).await?)
    }
}

// ---------------------------------------------------------------------------
// TrendExtractor: captions in, ranked trend lists out
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TrendExtractor: Send + Sync {
    /// Categorise fashion entities mentioned across `captions`.
    /// `city` is prompt context only.
    async fn extract(&self, captions: &[String], city: &str) -> Result<ExtractedTrends>;
}
