// Test doubles for the pipeline's trait seams.
//
// MockScraper answers by query/hashtag with canned provider items.
// MockExtractor returns canned trends per city. KeywordExtractor counts a fixed
// vocabulary in the captions, for end-to-end runs without an LLM.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{bail, Result};
use apify_client::{InstagramPost, TikTokHashtag, TikTokPost};
use async_trait::async_trait;

use crate::extractor::{ExtractedTrends, TrendMention};
use crate::traits::{PostScraper, TrendExtractor};

// ---------------------------------------------------------------------------
// MockScraper
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockScraper {
    instagram: HashMap<String, Vec<InstagramPost>>,
    tiktok: HashMap<String, Vec<TikTokPost>>,
    failing: HashSet<String>,
    slow: HashSet<String>,
    calls: AtomicUsize,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_location(mut self, query: &str, posts: Vec<InstagramPost>) -> Self {
        self.instagram.insert(query.to_string(), posts);
        self
    }

    pub fn on_hashtag(mut self, tag: &str, posts: Vec<TikTokPost>) -> Self {
        self.tiktok.insert(tag.to_string(), posts);
        self
    }

    /// Requests for this query or hashtag return an error.
    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    /// Requests for this query or hashtag never finish in test time.
    pub fn hanging(mut self, key: &str) -> Self {
        self.slow.insert(key.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn gate(&self, key: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.slow.contains(key) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing.contains(key) {
            bail!("MockScraper: provider error for {key}");
        }
        Ok(())
    }
}

#[async_trait]
impl PostScraper for MockScraper {
    async fn search_instagram_location(&self, query: &str, limit: u32) -> Result<Vec<InstagramPost>> {
        self.gate(query).await?;
        let mut posts = self.instagram.get(query).cloned().unwrap_or_default();
        posts.truncate(limit as usize);
        Ok(posts)
    }

    async fn search_tiktok_hashtag(&self, hashtag: &str, limit: u32) -> Result<Vec<TikTokPost>> {
        self.gate(hashtag).await?;
        let mut posts = self.tiktok.get(hashtag).cloned().unwrap_or_default();
        posts.truncate(limit as usize);
        Ok(posts)
    }
}

/// Instagram item with an id, caption and engagement.
pub fn instagram_item(id: &str, caption: &str, likes: i64, comments: i64) -> InstagramPost {
    InstagramPost {
        id: Some(id.to_string()),
        caption: Some(caption.to_string()),
        likes_count: Some(likes),
        comments_count: Some(comments),
        owner_username: Some("test_user".to_string()),
        ..Default::default()
    }
}

/// TikTok item with an id, counters and hashtags.
pub fn tiktok_item(id: &str, plays: i64, likes: i64, shares: i64, tags: &[&str]) -> TikTokPost {
    TikTokPost {
        id: Some(id.to_string()),
        text: Some(format!("video {id}")),
        play_count: Some(plays),
        digg_count: Some(likes),
        share_count: Some(shares),
        comment_count: Some(0),
        hashtags: Some(
            tags.iter()
                .map(|t| TikTokHashtag {
                    name: Some(t.to_string()),
                })
                .collect(),
        ),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockExtractor {
    by_city: HashMap<String, ExtractedTrends>,
    failing: bool,
    calls: std::sync::Mutex<Vec<(String, usize)>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_city(mut self, city: &str, trends: ExtractedTrends) -> Self {
        self.by_city.insert(city.to_string(), trends);
        self
    }

    /// Every extraction returns an error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// `(city, caption count)` for each call, in call order.
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TrendExtractor for MockExtractor {
    async fn extract(&self, captions: &[String], city: &str) -> Result<ExtractedTrends> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((city.to_string(), captions.len()));
        }
        if self.failing {
            bail!("MockExtractor: model unavailable");
        }
        Ok(self.by_city.get(city).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// KeywordExtractor
// ---------------------------------------------------------------------------

/// Counts case-insensitive occurrences of known terms across captions.
#[derive(Default)]
pub struct KeywordExtractor {
    items: Vec<String>,
    styles: Vec<String>,
    colors: Vec<String>,
    brands: Vec<String>,
}

impl KeywordExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(mut self, terms: &[&str]) -> Self {
        self.items = terms.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn styles(mut self, terms: &[&str]) -> Self {
        self.styles = terms.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn colors(mut self, terms: &[&str]) -> Self {
        self.colors = terms.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn brands(mut self, terms: &[&str]) -> Self {
        self.brands = terms.iter().map(|t| t.to_string()).collect();
        self
    }
}

fn count_terms(terms: &[String], captions: &[String]) -> Vec<TrendMention> {
    let lowered: Vec<String> = captions.iter().map(|c| c.to_lowercase()).collect();
    terms
        .iter()
        .map(|term| {
            let needle = term.to_lowercase();
            let mentions = lowered.iter().map(|c| c.matches(needle.as_str()).count()).sum::<usize>();
            TrendMention::new(term.clone(), mentions as i64)
        })
        .collect()
}

#[async_trait]
impl TrendExtractor for KeywordExtractor {
    async fn extract(&self, captions: &[String], _city: &str) -> Result<ExtractedTrends> {
        Ok(ExtractedTrends {
            items: count_terms(&self.items, captions),
            styles: count_terms(&self.styles, captions),
            colors: count_terms(&self.colors, captions),
            brands: count_terms(&self.brands, captions),
        }
        .normalized())
    }
}
