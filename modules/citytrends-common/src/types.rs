use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// City assigned to platform-wide hashtag scrapes that are not tied to a place.
pub const GLOBAL_CITY: &str = "Global";

/// Maximum number of co-occurring hashtags kept on a [`HashtagTrend`].
pub const MAX_RELATED_HASHTAGS: usize = 10;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Tiktok,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::Tiktok),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendType {
    Item,
    Style,
    Color,
    Brand,
    LocalSpot,
    MicroTrend,
}

impl TrendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendType::Item => "item",
            TrendType::Style => "style",
            TrendType::Color => "color",
            TrendType::Brand => "brand",
            TrendType::LocalSpot => "local_spot",
            TrendType::MicroTrend => "micro_trend",
        }
    }
}

impl fmt::Display for TrendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "item" => Ok(TrendType::Item),
            "style" => Ok(TrendType::Style),
            "color" => Ok(TrendType::Color),
            "brand" => Ok(TrendType::Brand),
            "local_spot" => Ok(TrendType::LocalSpot),
            "micro_trend" => Ok(TrendType::MicroTrend),
            other => Err(format!("unknown trend type: {other}")),
        }
    }
}

// --- Rows ---

/// One scraped social post. Unique on `(platform, post_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    pub platform: Platform,
    pub city: String,
    pub neighborhood: Option<String>,
    pub post_id: String,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub likes: i64,
    pub comments: i64,
    pub plays: i64,
    pub shares: i64,
    pub author: String,
    pub collected_at: DateTime<Utc>,
}

impl RawPost {
    /// Engagement used for city averages: likes plus comments.
    pub fn engagement(&self) -> i64 {
        self.likes + self.comments
    }
}

/// Weekly aggregate for one tracked hashtag. Unique on `(hashtag, period, neighborhood)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashtagTrend {
    pub hashtag: String,
    pub period: String,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub total_plays: i64,
    pub total_likes: i64,
    pub total_shares: i64,
    pub post_count: i64,
    pub avg_engagement: f64,
    pub top_related_hashtags: Vec<String>,
}

impl HashtagTrend {
    /// Aggregate one collection run's posts for `hashtag`.
    pub fn from_posts(
        hashtag: &str,
        period: &str,
        city: Option<String>,
        neighborhood: Option<String>,
        posts: &[RawPost],
    ) -> Self {
        let total_plays: i64 = posts.iter().map(|p| p.plays).sum();
        let total_likes: i64 = posts.iter().map(|p| p.likes).sum();
        let total_shares: i64 = posts.iter().map(|p| p.shares).sum();
        let post_count = posts.len() as i64;
        let avg_engagement = if post_count == 0 {
            0.0
        } else {
            (total_likes + total_shares) as f64 / post_count as f64
        };

        Self {
            hashtag: normalize_hashtag(hashtag),
            period: period.to_string(),
            city,
            neighborhood,
            total_plays,
            total_likes,
            total_shares,
            post_count,
            avg_engagement,
            top_related_hashtags: related_hashtags(hashtag, posts),
        }
    }
}

/// Co-occurring hashtags by descending frequency (ties by name), excluding the
/// searched tag itself.
fn related_hashtags(hashtag: &str, posts: &[RawPost]) -> Vec<String> {
    let searched = normalize_hashtag(hashtag);
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tag in posts.iter().flat_map(|p| p.hashtags.iter()) {
        if normalize_hashtag(tag) != searched {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(MAX_RELATED_HASHTAGS)
        .map(|(tag, _)| tag.to_string())
        .collect()
}

/// Lowercase and strip a leading `#`.
pub fn normalize_hashtag(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_lowercase()
}

/// One ranked trend entity for a city in a period.
/// Unique on `(city, period, trend_type, trend_name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedTrend {
    pub city: String,
    pub neighborhood: Option<String>,
    pub period: String,
    pub trend_type: TrendType,
    pub trend_name: String,
    pub mentions: i64,
    pub avg_engagement: f64,
    pub change_percent: Option<f64>,
    pub is_new: bool,
    pub rank: i32,
    pub source_platform: Platform,
    /// Type-specific extras: `type` for brands, `description`/`confidence` for micro trends.
    pub metadata: Option<serde_json::Value>,
}

impl ProcessedTrend {
    pub fn lookup_key(&self) -> String {
        trend_key(&self.city, self.trend_type, &self.trend_name)
    }
}

/// Key used to match a trend against the previous period: `"{city}:{type}:{name}"`.
pub fn trend_key(city: &str, trend_type: TrendType, trend_name: &str) -> String {
    format!("{city}:{trend_type}:{trend_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, likes: i64, shares: i64, plays: i64, tags: &[&str]) -> RawPost {
        RawPost {
            platform: Platform::Tiktok,
            city: GLOBAL_CITY.to_string(),
            neighborhood: None,
            post_id: id.to_string(),
            caption: String::new(),
            hashtags: tags.iter().map(|t| t.to_string()).collect(),
            likes,
            comments: 0,
            plays,
            shares,
            author: "someone".to_string(),
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn hashtag_trend_sums_and_averages() {
        let posts = vec![
            post("1", 100, 10, 1000, &["streetstyle"]),
            post("2", 50, 40, 3000, &["streetstyle"]),
        ];
        let trend = HashtagTrend::from_posts("streetstyle", "2025-W49", None, None, &posts);

        assert_eq!(trend.total_plays, 4000);
        assert_eq!(trend.total_likes, 150);
        assert_eq!(trend.total_shares, 50);
        assert_eq!(trend.post_count, 2);
        assert_eq!(trend.avg_engagement, 100.0);
    }

    #[test]
    fn empty_run_has_zero_average() {
        let trend = HashtagTrend::from_posts("ootd", "2025-W49", None, None, &[]);
        assert_eq!(trend.post_count, 0);
        assert_eq!(trend.avg_engagement, 0.0);
        assert!(trend.top_related_hashtags.is_empty());
    }

    #[test]
    fn related_hashtags_exclude_search_tag_and_rank_by_frequency() {
        let posts = vec![
            post("1", 0, 0, 0, &["ootd", "y2k", "vintage"]),
            post("2", 0, 0, 0, &["ootd", "vintage"]),
            post("3", 0, 0, 0, &["OOTD", "vintage", "thrift"]),
        ];
        let trend = HashtagTrend::from_posts("#OOTD", "2025-W49", None, None, &posts);

        assert_eq!(trend.hashtag, "ootd");
        assert_eq!(trend.top_related_hashtags, vec!["vintage", "thrift", "y2k"]);
    }

    #[test]
    fn related_hashtags_capped_at_ten() {
        let tags: Vec<String> = (0..15).map(|i| format!("tag{i:02}")).collect();
        let refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        let posts = vec![post("1", 0, 0, 0, &refs)];
        let trend = HashtagTrend::from_posts("other", "2025-W49", None, None, &posts);

        assert_eq!(trend.top_related_hashtags.len(), MAX_RELATED_HASHTAGS);
    }

    #[test]
    fn trend_type_round_trips_through_str() {
        for t in [
            TrendType::Item,
            TrendType::Style,
            TrendType::Color,
            TrendType::Brand,
            TrendType::LocalSpot,
            TrendType::MicroTrend,
        ] {
            assert_eq!(t.as_str().parse::<TrendType>().unwrap(), t);
        }
        assert!("vibe".parse::<TrendType>().is_err());
    }

    #[test]
    fn trend_key_format() {
        assert_eq!(
            trend_key("London", TrendType::Item, "Barrel Jeans"),
            "London:item:Barrel Jeans"
        );
    }
}
