// LLM trend extraction over a city's captions.
//
// The model is asked for a JSON object shaped like ExtractedTrends. Whatever
// comes back is parsed leniently: code fences are stripped, prose around the
// object is ignored, and anything unparseable yields empty lists.

use std::collections::HashMap;
use std::time::Duration;

use ai_client::util::{json_object_span, strip_code_blocks, truncate_to_char_boundary};
use ai_client::Claude;
use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use citytrends_common::TrendError;

use crate::traits::TrendExtractor;

/// Captions beyond this are never sent to the model.
pub const MAX_PROMPT_CAPTIONS: usize = 100;

/// Per-caption byte cap inside the prompt.
const MAX_CAPTION_BYTES: usize = 500;

/// Entities mentioned fewer times than this are dropped.
const MIN_MENTIONS: i64 = 2;

const SYSTEM_PROMPT: &str = "You are a fashion trend analyst. You read social media \
captions from one city and identify the clothing items, aesthetic styles, colors and \
brands people are talking about. Respond with a single JSON object and nothing else.";

/// One named entity and how many captions mention it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrendMention {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub mentions: i64,
    /// Brand category such as `luxury`, `streetwear` or `fast_fashion`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl TrendMention {
    pub fn new(name: impl Into<String>, mentions: i64) -> Self {
        Self {
            name: name.into(),
            mentions,
            category: None,
        }
    }
}

/// Categorised entities for one city, each list ordered by mentions descending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedTrends {
    /// Specific garments or accessories, e.g. "barrel jeans".
    #[serde(default, deserialize_with = "deserialize_mentions")]
    pub items: Vec<TrendMention>,
    /// Aesthetics, e.g. "quiet luxury".
    #[serde(default, deserialize_with = "deserialize_mentions")]
    pub styles: Vec<TrendMention>,
    #[serde(default, deserialize_with = "deserialize_mentions")]
    pub colors: Vec<TrendMention>,
    #[serde(default, deserialize_with = "deserialize_mentions")]
    pub brands: Vec<TrendMention>,
}

/// Accept counts as integers, floats or numeric strings. Anything else is 0.
fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let count = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    };
    Ok(count.unwrap_or(0))
}

/// Handle a category arriving as an array, a stringified array or null.
/// Entries that do not decode are skipped so one bad entry never costs the
/// rest of the list.
fn deserialize_mentions<'de, D>(deserializer: D) -> std::result::Result<Vec<TrendMention>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let entries = match value {
        Value::Array(entries) => entries,
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Array(entries)) => entries,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

impl ExtractedTrends {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
            && self.styles.is_empty()
            && self.colors.is_empty()
            && self.brands.is_empty()
    }

    /// Drop entities under the mention threshold, trim names, and order each
    /// list by mentions descending. Equal counts keep the model's order.
    pub fn normalized(mut self) -> Self {
        for list in [
            &mut self.items,
            &mut self.styles,
            &mut self.colors,
            &mut self.brands,
        ] {
            normalize_mentions(list);
        }
        self
    }
}

// Repeated names collapse into the first position, keeping the largest count.
fn normalize_mentions(list: &mut Vec<TrendMention>) {
    let mut merged: Vec<TrendMention> = Vec::with_capacity(list.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    for mut m in list.drain(..) {
        m.name = m.name.trim().to_string();
        if m.name.is_empty() {
            continue;
        }
        match index.get(&m.name) {
            Some(&i) if merged[i].mentions < m.mentions => {
                merged[i].mentions = m.mentions;
                if m.category.is_some() {
                    merged[i].category = m.category;
                }
            }
            Some(_) => {}
            None => {
                index.insert(m.name.clone(), merged.len());
                merged.push(m);
            }
        }
    }
    merged.retain(|m| m.mentions >= MIN_MENTIONS);
    merged.sort_by(|a, b| b.mentions.cmp(&a.mentions));
    *list = merged;
}

/// Parse a model response into trends. Never fails: unusable output is empty.
pub fn parse_extraction(response: &str) -> ExtractedTrends {
    let stripped = strip_code_blocks(response);
    if let Ok(trends) = serde_json::from_str::<ExtractedTrends>(stripped) {
        return trends;
    }
    if let Some(span) = json_object_span(response) {
        if let Ok(trends) = serde_json::from_str::<ExtractedTrends>(span) {
            return trends;
        }
    }
    warn!(
        preview = truncate_to_char_boundary(response, 200),
        "Unparseable trend extraction response, treating as empty"
    );
    ExtractedTrends::default()
}

pub fn build_user_prompt(captions: &[String], city: &str) -> String {
    let schema = serde_json::to_string_pretty(&schemars::schema_for!(ExtractedTrends))
        .unwrap_or_default();

    let mut prompt = format!(
        "Analyze these {} Instagram captions from {city}.\n\n\
         Count how many captions mention each specific clothing item, style, color and brand. \
         Only include entities mentioned at least {MIN_MENTIONS} times. Use the most common \
         spelling for each name and order every list by mentions, highest first. \
         For brands, set `type` to one of: luxury, contemporary, streetwear, fast_fashion, vintage.\n\n\
         Respond with JSON matching this schema:\n{schema}\n\nCaptions:\n",
        captions.len().min(MAX_PROMPT_CAPTIONS),
    );
    for (i, caption) in captions.iter().take(MAX_PROMPT_CAPTIONS).enumerate() {
        let caption = truncate_to_char_boundary(caption.trim(), MAX_CAPTION_BYTES);
        prompt.push_str(&format!("{}. {}\n", i + 1, caption.replace('\n', " ")));
    }
    prompt
}

/// TrendExtractor backed by Claude.
pub struct ClaudeTrendExtractor {
    claude: Claude,
    timeout: Duration,
}

impl ClaudeTrendExtractor {
    pub fn new(claude: Claude, timeout: Duration) -> Self {
        Self { claude, timeout }
    }
}

#[async_trait]
impl TrendExtractor for ClaudeTrendExtractor {
    async fn extract(&self, captions: &[String], city: &str) -> Result<ExtractedTrends> {
        if captions.is_empty() {
            return Ok(ExtractedTrends::default());
        }

        let prompt = build_user_prompt(captions, city);
        let response = tokio::time::timeout(
            self.timeout,
            self.claude.chat_completion(SYSTEM_PROMPT, prompt),
        )
        .await
        .map_err(|_| TrendError::Timeout {
            operation: format!("Trend extraction for {city}"),
            secs: self.timeout.as_secs(),
        })??;

        let trends = parse_extraction(&response).normalized();
        info!(
            city,
            model = self.claude.model(),
            items = trends.items.len(),
            styles = trends.styles.len(),
            colors = trends.colors.len(),
            brands = trends.brands.len(),
            "Trends extracted"
        );
        Ok(trends)
    }
}
