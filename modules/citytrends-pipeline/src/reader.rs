//! Read-side view of this week's city trends.
//!
//! Three tiers, first non-empty wins:
//! 1. processed trends for the current period, bundled per neighborhood
//! 2. raw post aggregates per city over the trailing seven days
//! 3. empty collections with an advisory message
//!
//! TikTok hashtag aggregates for the period ride along with every tier.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, Utc};
use serde::Serialize;
use tracing::warn;

use citytrends_common::{
    period_for, HashtagTrend, ProcessedTrend, RawPost, TrendType, GLOBAL_CITY,
};
use citytrends_store::TrendStore;

const RAW_WINDOW_DAYS: i64 = 7;
const TOP_HASHTAGS: usize = 10;

pub const RAW_DATA_MESSAGE: &str =
    "Showing raw post activity. Trend analysis runs weekly; ranked trends will appear after the next run.";
pub const NO_DATA_MESSAGE: &str =
    "No trend data yet. Collection runs daily; check back once posts have been gathered.";

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CityTrendsResponse {
    Processed(ProcessedView),
    Raw(RawView),
    Empty(EmptyView),
}

impl CityTrendsResponse {
    pub fn has_processed_data(&self) -> bool {
        matches!(self, CityTrendsResponse::Processed(_))
    }

    pub fn period(&self) -> &str {
        match self {
            CityTrendsResponse::Processed(v) => &v.period,
            CityTrendsResponse::Raw(v) => &v.period,
            CityTrendsResponse::Empty(v) => &v.period,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedView {
    pub neighborhoods: Vec<NeighborhoodTrends>,
    pub tiktok_trends: Vec<HashtagTrend>,
    pub period: String,
    pub has_processed_data: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawView {
    pub cities: Vec<CityActivity>,
    pub tiktok_trends: Vec<HashtagTrend>,
    pub period: String,
    pub has_processed_data: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyView {
    pub neighborhoods: Vec<NeighborhoodTrends>,
    pub cities: Vec<CityActivity>,
    pub tiktok_trends: Vec<HashtagTrend>,
    pub period: String,
    pub has_processed_data: bool,
    pub message: String,
}

/// Everything ranked for one neighborhood (or city, when no neighborhood is known).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodTrends {
    pub name: String,
    pub city: String,
    pub garments: Vec<GarmentEntry>,
    pub styles: Vec<StyleEntry>,
    pub colors: Vec<StyleEntry>,
    pub brands: Vec<BrandEntry>,
    pub local_spots: Vec<LocalSpotEntry>,
    pub micro_trends: Vec<MicroTrendEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GarmentEntry {
    pub name: String,
    pub mentions: i64,
    pub is_new: bool,
    pub rank: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleEntry {
    pub name: String,
    pub mentions: i64,
    pub is_new: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrandEntry {
    pub name: String,
    pub mentions: i64,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocalSpotEntry {
    pub name: String,
    pub mentions: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MicroTrendEntry {
    pub name: String,
    pub description: Option<String>,
    pub confidence: Option<f64>,
}

/// Raw activity for one city.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityActivity {
    pub city: String,
    pub post_count: usize,
    pub avg_engagement: i64,
    pub top_hashtags: Vec<HashtagCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HashtagCount {
    pub tag: String,
    pub count: usize,
}

fn metadata_str(trend: &ProcessedTrend, key: &str) -> Option<String> {
    trend
        .metadata
        .as_ref()
        .and_then(|m| m.get(key))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Bundle processed rows per neighborhood, keeping first-seen order.
/// Rows are expected in (city, type, rank) order.
pub fn bundle_by_neighborhood(trends: &[ProcessedTrend]) -> Vec<NeighborhoodTrends> {
    let mut bundles: Vec<NeighborhoodTrends> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for trend in trends {
        let name = trend
            .neighborhood
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&trend.city)
            .to_string();
        let slot = *index.entry(name.clone()).or_insert_with(|| {
            bundles.push(NeighborhoodTrends {
                name,
                city: trend.city.clone(),
                ..Default::default()
            });
            bundles.len() - 1
        });
        let bundle = &mut bundles[slot];

        match trend.trend_type {
            TrendType::Item => bundle.garments.push(GarmentEntry {
                name: trend.trend_name.clone(),
                mentions: trend.mentions,
                is_new: trend.is_new,
                rank: trend.rank,
                change_percent: trend.change_percent,
            }),
            TrendType::Style => bundle.styles.push(StyleEntry {
                name: trend.trend_name.clone(),
                mentions: trend.mentions,
                is_new: trend.is_new,
            }),
            TrendType::Color => bundle.colors.push(StyleEntry {
                name: trend.trend_name.clone(),
                mentions: trend.mentions,
                is_new: trend.is_new,
            }),
            TrendType::Brand => bundle.brands.push(BrandEntry {
                name: trend.trend_name.clone(),
                mentions: trend.mentions,
                kind: metadata_str(trend, "type"),
            }),
            TrendType::LocalSpot => bundle.local_spots.push(LocalSpotEntry {
                name: trend.trend_name.clone(),
                mentions: trend.mentions,
                description: metadata_str(trend, "description"),
            }),
            TrendType::MicroTrend => bundle.micro_trends.push(MicroTrendEntry {
                name: trend.trend_name.clone(),
                description: metadata_str(trend, "description"),
                confidence: trend
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get("confidence"))
                    .and_then(|v| v.as_f64()),
            }),
        }
    }
    bundles
}

/// Per-city raw activity, busiest city first. `Global` posts are excluded.
pub fn city_activity(posts: &[RawPost]) -> Vec<CityActivity> {
    struct Acc<'a> {
        posts: usize,
        engagement: i64,
        tags: HashMap<&'a str, usize>,
    }

    let mut cities: HashMap<&str, Acc> = HashMap::new();
    for post in posts.iter().filter(|p| p.city != GLOBAL_CITY) {
        let acc = cities.entry(post.city.as_str()).or_insert_with(|| Acc {
            posts: 0,
            engagement: 0,
            tags: HashMap::new(),
        });
        acc.posts += 1;
        acc.engagement += post.engagement();
        for tag in &post.hashtags {
            *acc.tags.entry(tag.as_str()).or_default() += 1;
        }
    }

    let mut activity: Vec<CityActivity> = cities
        .into_iter()
        .map(|(city, acc)| {
            let mut tags: Vec<(&str, usize)> = acc.tags.into_iter().collect();
            tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            CityActivity {
                city: city.to_string(),
                post_count: acc.posts,
                avg_engagement: (acc.engagement as f64 / acc.posts as f64).round() as i64,
                top_hashtags: tags
                    .into_iter()
                    .take(TOP_HASHTAGS)
                    .map(|(tag, count)| HashtagCount {
                        tag: tag.to_string(),
                        count,
                    })
                    .collect(),
            }
        })
        .collect();
    activity.sort_by(|a, b| b.post_count.cmp(&a.post_count).then_with(|| a.city.cmp(&b.city)));
    activity
}

/// Build the city trends view for the week containing `now`.
pub async fn city_trends(store: &dyn TrendStore, now: DateTime<Utc>) -> Result<CityTrendsResponse> {
    let period = period_for(now.with_timezone(&Local).date_naive());

    let tiktok_trends = store.hashtag_trends(&period).await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load hashtag trends");
        Vec::new()
    });

    let processed = store
        .processed_trends(&period)
        .await
        .context("Failed to load processed trends")?;
    if !processed.is_empty() {
        return Ok(CityTrendsResponse::Processed(ProcessedView {
            neighborhoods: bundle_by_neighborhood(&processed),
            tiktok_trends,
            period,
            has_processed_data: true,
        }));
    }

    let posts = store
        .raw_posts_since(now - Duration::days(RAW_WINDOW_DAYS), None)
        .await
        .context("Failed to load raw posts")?;
    let cities = city_activity(&posts);
    if !cities.is_empty() {
        return Ok(CityTrendsResponse::Raw(RawView {
            cities,
            tiktok_trends,
            period,
            has_processed_data: false,
            message: RAW_DATA_MESSAGE.to_string(),
        }));
    }

    Ok(CityTrendsResponse::Empty(EmptyView {
        neighborhoods: Vec::new(),
        cities: Vec::new(),
        tiktok_trends,
        period,
        has_processed_data: false,
        message: NO_DATA_MESSAGE.to_string(),
    }))
}
