use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::TrendError;

/// Targets bundled with the binary, used when `TARGETS_FILE` is unset.
const DEFAULT_TARGETS: &str = include_str!("../targets.toml");

/// Application configuration loaded from environment variables.
/// Contains only secrets and env-specific values; targets and tunables
/// live in the TOML [`TargetsConfig`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Database
    pub database_url: String,

    // Providers
    pub apify_api_token: Option<String>,
    pub anthropic_api_key: Option<String>,

    // Trigger auth
    pub cron_secret: Option<String>,
    pub cron_require_secret: bool,

    // Web server
    pub api_host: String,
    pub api_port: u16,

    pub targets_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            apify_api_token: non_empty_env("APIFY_API_TOKEN"),
            anthropic_api_key: non_empty_env("ANTHROPIC_API_KEY"),
            cron_secret: non_empty_env("CRON_SECRET"),
            cron_require_secret: env::var("CRON_REQUIRE_SECRET")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("API_PORT must be a number")?,
            targets_file: non_empty_env("TARGETS_FILE").map(PathBuf::from),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.chars().take(5).map(char::len_utf8).sum::<usize>();
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  APIFY_API_TOKEN: {}", preview_opt(&self.apify_api_token));
        tracing::info!("  ANTHROPIC_API_KEY: {}", preview_opt(&self.anthropic_api_key));
        tracing::info!("  CRON_SECRET: {}", preview_opt(&self.cron_secret));
        if self.cron_secret.is_none() && !self.cron_require_secret {
            tracing::warn!("CRON_SECRET is not set: trigger endpoints are open to anyone");
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// TOML-backed collection targets and pipeline tunables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetsConfig {
    #[serde(default)]
    pub collect: CollectSettings,
    #[serde(default)]
    pub process: ProcessSettings,
    #[serde(default)]
    pub locations: Vec<LocationTarget>,
    #[serde(default)]
    pub hashtags: Vec<HashtagTarget>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CollectSettings {
    pub instagram_results_per_location: u32,
    pub tiktok_results_per_hashtag: u32,
    /// Targets scraped at once; 1 runs them one after another.
    pub concurrency: usize,
    pub provider_timeout_secs: u64,
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            instagram_results_per_location: 50,
            tiktok_results_per_hashtag: 100,
            concurrency: 1,
            provider_timeout_secs: 300,
        }
    }
}

impl CollectSettings {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProcessSettings {
    /// Cities with fewer captions than this in the trailing week are skipped.
    pub min_captions: usize,
    /// Captions sent to the extractor per city.
    pub max_captions: usize,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            min_captions: 10,
            max_captions: 100,
            llm_model: "claude-haiku-4-5-20251001".to_string(),
            llm_timeout_secs: 120,
        }
    }
}

impl ProcessSettings {
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

/// A location query scraped on Instagram.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationTarget {
    pub city: String,
    pub neighborhood: Option<String>,
    pub query: String,
}

/// A hashtag scraped on TikTok. Without a city the posts land under `Global`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashtagTarget {
    pub tag: String,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
}

impl TargetsConfig {
    /// Load from `path`, or the bundled defaults when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read targets file: {}", path.display()))?;
                Self::parse(&content)
                    .with_context(|| format!("Failed to parse targets file: {}", path.display()))
            }
            None => Self::parse(DEFAULT_TARGETS).context("Failed to parse bundled targets"),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: TargetsConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), TrendError> {
        if let Some(target) = self.locations.iter().find(|l| l.query.trim().is_empty()) {
            return Err(TrendError::Config(format!(
                "location target for {} has an empty query",
                target.city
            )));
        }
        if self
            .hashtags
            .iter()
            .any(|h| h.tag.trim().trim_start_matches('#').is_empty())
        {
            return Err(TrendError::Config("hashtag target with an empty tag".to_string()));
        }
        if self.process.max_captions < self.process.min_captions {
            return Err(TrendError::Config(format!(
                "process.max_captions ({}) is below process.min_captions ({})",
                self.process.max_captions, self.process.min_captions
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_targets_parse() {
        let config = TargetsConfig::load(None).unwrap();
        assert!(!config.locations.is_empty());
        assert!(!config.hashtags.is_empty());
        assert!(config.collect.concurrency >= 1);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config = TargetsConfig::parse(
            r#"
            [[locations]]
            city = "Paris"
            neighborhood = "Le Marais"
            query = "Le Marais, Paris"
            "#,
        )
        .unwrap();

        assert_eq!(config.process.min_captions, 10);
        assert_eq!(config.process.max_captions, 100);
        assert_eq!(config.collect.instagram_results_per_location, 50);
        assert_eq!(config.locations[0].neighborhood.as_deref(), Some("Le Marais"));
        assert!(config.hashtags.is_empty());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = TargetsConfig::parse("[collect]\nconcurrency = 4\n").unwrap();
        assert_eq!(config.collect.concurrency, 4);
        assert_eq!(config.collect.tiktok_results_per_hashtag, 100);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(TargetsConfig::parse("[collect]\nretries = 3\n").is_err());
    }

    #[test]
    fn empty_targets_rejected() {
        let err = TargetsConfig::parse("[[hashtags]]\ntag = \"#\"\n").unwrap_err();
        assert!(err.to_string().contains("empty tag"));
        assert!(TargetsConfig::parse(
            "[[locations]]\ncity = \"Paris\"\nquery = \"  \"\n"
        )
        .is_err());
        assert!(TargetsConfig::parse("[process]\nmin_captions = 20\nmax_captions = 5\n").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(TargetsConfig::load(Some(Path::new("/nonexistent/targets.toml"))).is_err());
    }
}
