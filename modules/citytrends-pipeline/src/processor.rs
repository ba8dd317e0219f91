// Weekly city trend processing.
//
// Groups the trailing week's Instagram posts by city, asks the extractor for
// categorised entities, ranks them and diffs them against the previous week.
// Rows are written one at a time; a failed write loses that row only.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, Utc};
use serde::Serialize;
use tracing::{info, warn};

use citytrends_common::{
    period_for, previous_period, trend_key, Platform, ProcessSettings, ProcessedTrend, RawPost,
    TrendType, GLOBAL_CITY,
};
use citytrends_store::TrendStore;

use crate::extractor::{ExtractedTrends, TrendMention};
use crate::traits::TrendExtractor;

/// Days of posts considered for one run.
const WINDOW_DAYS: i64 = 7;

/// Per-type caps on persisted rows.
const MAX_ITEMS: usize = 10;
const MAX_STYLES: usize = 5;
const MAX_COLORS: usize = 5;
const MAX_BRANDS: usize = 5;

/// Outcome of one processing run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessReport {
    pub period: String,
    /// City → rows written.
    pub results: BTreeMap<String, usize>,
    /// Cities below the caption threshold.
    pub skipped: Vec<String>,
}

impl ProcessReport {
    pub fn total_rows(&self) -> usize {
        self.results.values().sum()
    }
}

impl fmt::Display for ProcessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Trend Processing Complete ({}) ===", self.period)?;
        for (city, rows) in &self.results {
            writeln!(f, "  {city:<24} {rows} trends")?;
        }
        if !self.skipped.is_empty() {
            writeln!(f, "  Skipped (not enough captions): {}", self.skipped.join(", "))?;
        }
        write!(f, "Total trends written: {}", self.total_rows())
    }
}

/// One city's posts for the week.
#[derive(Debug, Default)]
struct CityBatch {
    neighborhood: Option<String>,
    captions: Vec<String>,
    total_engagement: i64,
}

impl CityBatch {
    fn avg_engagement(&self) -> f64 {
        if self.captions.is_empty() {
            0.0
        } else {
            self.total_engagement as f64 / self.captions.len() as f64
        }
    }
}

fn group_by_city(posts: Vec<RawPost>) -> BTreeMap<String, CityBatch> {
    let mut cities: BTreeMap<String, CityBatch> = BTreeMap::new();
    for post in posts {
        if post.city == GLOBAL_CITY {
            continue;
        }
        let batch = cities.entry(post.city.clone()).or_default();
        if batch.neighborhood.is_none() {
            batch.neighborhood = post.neighborhood.clone().filter(|n| !n.is_empty());
        }
        batch.total_engagement += post.engagement();
        batch.captions.push(post.caption);
    }
    cities
}

/// Previous-period mentions keyed by [`trend_key`].
pub fn previous_mentions(previous: &[ProcessedTrend]) -> HashMap<String, i64> {
    previous
        .iter()
        .map(|t| (t.lookup_key(), t.mentions))
        .collect()
}

/// Ranked rows for one city. Ranks are 1-based per type in list order; a name
/// repeated within one list keeps its first position only.
pub fn build_trend_rows(
    city: &str,
    neighborhood: Option<&str>,
    period: &str,
    avg_engagement: f64,
    extracted: &ExtractedTrends,
    previous: &HashMap<String, i64>,
) -> Vec<ProcessedTrend> {
    let groups: [(TrendType, &[TrendMention], usize); 4] = [
        (TrendType::Item, extracted.items.as_slice(), MAX_ITEMS),
        (TrendType::Style, extracted.styles.as_slice(), MAX_STYLES),
        (TrendType::Color, extracted.colors.as_slice(), MAX_COLORS),
        (TrendType::Brand, extracted.brands.as_slice(), MAX_BRANDS),
    ];

    let mut rows = Vec::new();
    for (trend_type, mentions, cap) in groups {
        let mut seen = HashSet::new();
        let unique = mentions.iter().filter(|m| seen.insert(m.name.as_str()));
        for (i, mention) in unique.take(cap).enumerate() {
            let prior = previous.get(&trend_key(city, trend_type, &mention.name)).copied();
            let change_percent = prior
                .filter(|&p| p > 0)
                .map(|p| (mention.mentions - p) as f64 / p as f64 * 100.0);
            let metadata = mention
                .category
                .as_ref()
                .map(|category| serde_json::json!({ "type": category }));

            rows.push(ProcessedTrend {
                city: city.to_string(),
                neighborhood: neighborhood.map(str::to_string),
                period: period.to_string(),
                trend_type,
                trend_name: mention.name.clone(),
                mentions: mention.mentions,
                avg_engagement,
                change_percent,
                is_new: prior.is_none(),
                rank: i as i32 + 1,
                source_platform: Platform::Instagram,
                metadata,
            });
        }
    }
    rows
}

/// Rows already stored for this city and period that the current run did not
/// produce, re-ranked to follow the current rows in their previous order.
/// Nothing is deleted, so every type stays densely ranked 1..N.
pub fn restack_stale_rows(
    city: &str,
    period: &str,
    current: &[ProcessedTrend],
    stored: Vec<ProcessedTrend>,
) -> Vec<ProcessedTrend> {
    let mut fresh: HashMap<TrendType, HashSet<&str>> = HashMap::new();
    for row in current {
        fresh
            .entry(row.trend_type)
            .or_default()
            .insert(row.trend_name.as_str());
    }

    let mut stale: Vec<ProcessedTrend> = stored
        .into_iter()
        .filter(|r| r.city == city && r.period == period)
        .filter(|r| {
            !fresh
                .get(&r.trend_type)
                .is_some_and(|names| names.contains(r.trend_name.as_str()))
        })
        .collect();
    stale.sort_by(|a, b| {
        a.trend_type
            .as_str()
            .cmp(b.trend_type.as_str())
            .then(a.rank.cmp(&b.rank))
            .then_with(|| a.trend_name.cmp(&b.trend_name))
    });

    let mut next_rank: HashMap<TrendType, i32> = HashMap::new();
    for row in &mut stale {
        let trend_type = row.trend_type;
        let rank = next_rank
            .entry(trend_type)
            .or_insert_with(|| fresh.get(&trend_type).map_or(0, |names| names.len() as i32));
        *rank += 1;
        row.rank = *rank;
    }
    stale
}

pub struct TrendProcessor {
    store: Arc<dyn TrendStore>,
    extractor: Arc<dyn TrendExtractor>,
    settings: ProcessSettings,
}

impl TrendProcessor {
    pub fn new(
        store: Arc<dyn TrendStore>,
        extractor: Arc<dyn TrendExtractor>,
        settings: ProcessSettings,
    ) -> Self {
        Self {
            store,
            extractor,
            settings,
        }
    }

    /// Process the week containing `now`. Fails only when the initial reads fail.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ProcessReport> {
        let today = now.with_timezone(&Local).date_naive();
        let period = period_for(today);
        let prior_period = previous_period(today);

        let posts = self
            .store
            .raw_posts_since(now - Duration::days(WINDOW_DAYS), Some(Platform::Instagram))
            .await
            .context("Failed to load raw posts")?;
        let previous = self
            .store
            .processed_trends(&prior_period)
            .await
            .with_context(|| format!("Failed to load trends for {prior_period}"))?;
        let previous = previous_mentions(&previous);

        info!(
            period = period.as_str(),
            previous_period = prior_period.as_str(),
            posts = posts.len(),
            "Trend processing starting"
        );

        let mut report = ProcessReport {
            period: period.clone(),
            ..Default::default()
        };

        for (city, batch) in group_by_city(posts) {
            if batch.captions.len() < self.settings.min_captions {
                info!(
                    city = city.as_str(),
                    captions = batch.captions.len(),
                    min = self.settings.min_captions,
                    "Skipping city, not enough captions"
                );
                report.skipped.push(city);
                continue;
            }

            let captions = &batch.captions[..batch.captions.len().min(self.settings.max_captions)];
            let extracted = match self.extractor.extract(captions, &city).await {
                Ok(trends) => trends,
                Err(e) => {
                    warn!(city = city.as_str(), error = %e, "Trend extraction failed, treating as empty");
                    ExtractedTrends::default()
                }
            };

            let rows = build_trend_rows(
                &city,
                batch.neighborhood.as_deref(),
                &period,
                batch.avg_engagement(),
                &extracted,
                &previous,
            );

            let mut written = 0;
            for row in &rows {
                match self.store.upsert_processed_trend(row).await {
                    Ok(()) => written += 1,
                    Err(e) => warn!(
                        city = city.as_str(),
                        trend = row.trend_name.as_str(),
                        error = %e,
                        "Failed to save trend"
                    ),
                }
            }

            self.restack(&city, &period, &rows).await;

            info!(city = city.as_str(), rows = written, "City processed");
            report.results.insert(city, written);
        }

        info!("{report}");
        Ok(report)
    }

    async fn restack(&self, city: &str, period: &str, rows: &[ProcessedTrend]) {
        let stored = match self.store.processed_trends(period).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(city, error = %e, "Failed to reload trends, earlier rows keep their ranks");
                return;
            }
        };
        let stale = restack_stale_rows(city, period, rows, stored);
        for row in &stale {
            if let Err(e) = self.store.upsert_processed_trend(row).await {
                warn!(city, trend = row.trend_name.as_str(), error = %e, "Failed to re-rank trend");
            }
        }
        if !stale.is_empty() {
            info!(city, rows = stale.len(), "Earlier trends re-ranked");
        }
    }
}
