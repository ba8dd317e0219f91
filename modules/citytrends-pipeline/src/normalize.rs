//! Provider items → `RawPost`.
//!
//! Items without an id are dropped. Missing counts become zero, hashtags are
//! lowercased, and Instagram posts without a hashtag list get one parsed out
//! of the caption.

use std::sync::OnceLock;

use apify_client::{InstagramPost, TikTokPost};
use chrono::{DateTime, Utc};
use regex::Regex;

use citytrends_common::{
    normalize_hashtag, HashtagTarget, LocationTarget, Platform, RawPost, GLOBAL_CITY,
};

fn hashtag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#(\w+)").expect("valid hashtag regex"))
}

/// Hashtags written inline in a caption, lowercased, first occurrence order.
pub fn hashtags_in_caption(caption: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for cap in hashtag_regex().captures_iter(caption) {
        let tag = cap[1].to_lowercase();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Normalized, non-empty, first occurrence order.
fn clean_hashtags<'a>(tags: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for tag in tags.map(normalize_hashtag) {
        if !tag.is_empty() && !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    cleaned
}

pub fn instagram_post(
    item: InstagramPost,
    target: &LocationTarget,
    collected_at: DateTime<Utc>,
) -> Option<RawPost> {
    let post_id = item.post_id()?.to_string();
    let plays = item.plays().unwrap_or(0);
    let caption = item.caption.unwrap_or_default();
    let hashtags = match item.hashtags {
        Some(tags) if !tags.is_empty() => clean_hashtags(tags.iter().map(String::as_str)),
        _ => hashtags_in_caption(&caption),
    };

    Some(RawPost {
        platform: Platform::Instagram,
        city: target.city.clone(),
        neighborhood: target.neighborhood.clone(),
        post_id,
        caption,
        hashtags,
        likes: item.likes_count.unwrap_or(0),
        comments: item.comments_count.unwrap_or(0),
        plays,
        shares: 0,
        author: item.owner_username.unwrap_or_default(),
        collected_at,
    })
}

pub fn tiktok_post(
    item: TikTokPost,
    target: &HashtagTarget,
    collected_at: DateTime<Utc>,
) -> Option<RawPost> {
    let post_id = item.id.filter(|id| !id.is_empty())?;
    let hashtags = item
        .hashtags
        .map(|tags| clean_hashtags(tags.iter().filter_map(|t| t.name.as_deref())))
        .unwrap_or_default();
    let author = item
        .author_meta
        .and_then(|a| a.name.or(a.nick_name))
        .unwrap_or_default();

    Some(RawPost {
        platform: Platform::Tiktok,
        city: target.city.clone().unwrap_or_else(|| GLOBAL_CITY.to_string()),
        neighborhood: target.neighborhood.clone(),
        post_id,
        caption: item.text.unwrap_or_default(),
        hashtags,
        likes: item.digg_count.unwrap_or(0),
        comments: item.comment_count.unwrap_or(0),
        plays: item.play_count.unwrap_or(0),
        shares: item.share_count.unwrap_or(0),
        author,
        collected_at,
    })
}
