use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// --- Lenient field decoding ---
//
// Actor datasets are not strictly typed: counters arrive as integers, floats,
// numeric strings or null depending on the actor version, and ids arrive as
// either strings or numbers.

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let count = value.and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    });
    Ok(count.map(|n| n.max(0)))
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

// --- Instagram place search ---

/// Input for the apify/instagram-scraper actor in place-search mode.
#[derive(Debug, Clone, Serialize)]
pub struct InstagramPlaceSearchInput {
    pub search: String,
    #[serde(rename = "searchType")]
    pub search_type: String,
    #[serde(rename = "searchLimit")]
    pub search_limit: u32,
    #[serde(rename = "resultsType")]
    pub results_type: String,
    #[serde(rename = "resultsLimit")]
    pub results_limit: u32,
}

impl InstagramPlaceSearchInput {
    pub fn new(query: &str, results_limit: u32) -> Self {
        Self {
            search: query.to_string(),
            search_type: "place".to_string(),
            search_limit: 1,
            results_type: "posts".to_string(),
            results_limit,
        }
    }
}

/// A single Instagram post from the Apify dataset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstagramPost {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(rename = "shortCode", default, deserialize_with = "lenient_id")]
    pub short_code: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub hashtags: Option<Vec<String>>,
    #[serde(rename = "likesCount", default, deserialize_with = "lenient_count")]
    pub likes_count: Option<i64>,
    #[serde(rename = "commentsCount", default, deserialize_with = "lenient_count")]
    pub comments_count: Option<i64>,
    #[serde(rename = "videoPlayCount", default, deserialize_with = "lenient_count")]
    pub video_play_count: Option<i64>,
    #[serde(rename = "videoViewCount", default, deserialize_with = "lenient_count")]
    pub video_view_count: Option<i64>,
    #[serde(rename = "ownerUsername", default)]
    pub owner_username: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "locationName", default)]
    pub location_name: Option<String>,
}

impl InstagramPost {
    /// Stable external id: the numeric media id, else the short code.
    pub fn post_id(&self) -> Option<&str> {
        self.id.as_deref().or(self.short_code.as_deref())
    }

    pub fn plays(&self) -> Option<i64> {
        self.video_play_count.or(self.video_view_count)
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.timestamp.as_deref())
    }
}

// --- TikTok hashtag search ---

/// Input for the clockworks/tiktok-scraper actor (hashtag mode).
#[derive(Debug, Clone, Serialize)]
pub struct TikTokHashtagInput {
    pub hashtags: Vec<String>,
    #[serde(rename = "resultsPerPage")]
    pub results_per_page: u32,
    #[serde(rename = "shouldDownloadVideos")]
    pub should_download_videos: bool,
    #[serde(rename = "shouldDownloadCovers")]
    pub should_download_covers: bool,
}

impl TikTokHashtagInput {
    pub fn new(hashtag: &str, results_per_page: u32) -> Self {
        Self {
            hashtags: vec![hashtag.trim_start_matches('#').to_string()],
            results_per_page,
            should_download_videos: false,
            should_download_covers: false,
        }
    }
}

/// A single TikTok post from the Apify dataset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TikTokPost {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "webVideoUrl", default)]
    pub web_video_url: Option<String>,
    #[serde(rename = "createTimeISO", default)]
    pub create_time_iso: Option<String>,
    #[serde(rename = "authorMeta", default)]
    pub author_meta: Option<TikTokAuthor>,
    #[serde(rename = "diggCount", default, deserialize_with = "lenient_count")]
    pub digg_count: Option<i64>,
    #[serde(rename = "shareCount", default, deserialize_with = "lenient_count")]
    pub share_count: Option<i64>,
    #[serde(rename = "playCount", default, deserialize_with = "lenient_count")]
    pub play_count: Option<i64>,
    #[serde(rename = "commentCount", default, deserialize_with = "lenient_count")]
    pub comment_count: Option<i64>,
    #[serde(default)]
    pub hashtags: Option<Vec<TikTokHashtag>>,
}

impl TikTokPost {
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.create_time_iso.as_deref())
    }
}

/// Author metadata from a TikTok post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TikTokAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "nickName", default)]
    pub nick_name: Option<String>,
}

/// A hashtag reference in a TikTok post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TikTokHashtag {
    #[serde(default)]
    pub name: Option<String>,
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

// --- Run plumbing ---

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instagram_counts_accept_strings_floats_and_null() {
        let post: InstagramPost = serde_json::from_str(
            r#"{
                "id": 3141592653,
                "caption": "Barrel jeans in Le Marais",
                "likesCount": "120",
                "commentsCount": 4.0,
                "videoPlayCount": null
            }"#,
        )
        .unwrap();

        assert_eq!(post.post_id(), Some("3141592653"));
        assert_eq!(post.likes_count, Some(120));
        assert_eq!(post.comments_count, Some(4));
        assert_eq!(post.plays(), None);
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        let post: InstagramPost =
            serde_json::from_str(r#"{"id": "1", "likesCount": "-5", "commentsCount": -2.5}"#)
                .unwrap();
        assert_eq!(post.likes_count, Some(0));
        assert_eq!(post.comments_count, Some(0));
    }

    #[test]
    fn instagram_post_id_falls_back_to_short_code() {
        let post: InstagramPost =
            serde_json::from_str(r#"{"shortCode": "CxYz123", "videoViewCount": 900}"#).unwrap();
        assert_eq!(post.post_id(), Some("CxYz123"));
        assert_eq!(post.plays(), Some(900));
    }

    #[test]
    fn blank_id_is_treated_as_missing() {
        let post: TikTokPost = serde_json::from_str(r#"{"id": "  ", "text": "ootd"}"#).unwrap();
        assert!(post.id.is_none());
    }

    #[test]
    fn tiktok_post_parses_nested_fields() {
        let post: TikTokPost = serde_json::from_str(
            r##"{
                "id": "7301",
                "text": "#streetstyle fit check",
                "diggCount": 1500,
                "shareCount": 30,
                "playCount": 20000,
                "commentCount": 12,
                "createTimeISO": "2025-11-28T10:00:00.000Z",
                "authorMeta": {"name": "fitqueen"},
                "hashtags": [{"name": "StreetStyle"}, {"name": null}]
            }"##,
        )
        .unwrap();

        assert_eq!(post.play_count, Some(20000));
        assert_eq!(
            post.published_at().map(|dt| dt.to_rfc3339()),
            Some("2025-11-28T10:00:00+00:00".to_string())
        );
        assert_eq!(post.author_meta.unwrap().name.as_deref(), Some("fitqueen"));
        assert_eq!(post.hashtags.unwrap().len(), 2);
    }

    #[test]
    fn hashtag_input_strips_leading_hash() {
        let input = TikTokHashtagInput::new("#quietluxury", 40);
        assert_eq!(input.hashtags, vec!["quietluxury".to_string()]);
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["resultsPerPage"], 40);
    }
}
