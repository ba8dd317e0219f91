use std::sync::Arc;

use ai_client::Claude;
use anyhow::Result;
use apify_client::ApifyClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

use citytrends_api::{auth::CronAuth, router, AppState};
use citytrends_common::{AppConfig, TargetsConfig};
use citytrends_pipeline::{ClaudeTrendExtractor, PostScraper, TrendExtractor};
use citytrends_store::PgTrendStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("citytrends=info".parse()?))
        .init();

    let config = AppConfig::from_env()?;
    let targets = TargetsConfig::load(config.targets_file.as_deref())?;
    info!(
        locations = targets.locations.len(),
        hashtags = targets.hashtags.len(),
        "Targets loaded"
    );

    let store = PgTrendStore::connect(&config.database_url).await?;
    store.migrate().await?;
    info!("Database migrations applied");

    let scraper = config.apify_api_token.as_ref().map(|token| {
        Arc::new(ApifyClient::new(token.clone())) as Arc<dyn PostScraper>
    });
    let extractor = config.anthropic_api_key.as_ref().map(|key| {
        let claude = Claude::new(key.clone(), targets.process.llm_model.clone())
            .with_timeout(targets.process.llm_timeout());
        Arc::new(ClaudeTrendExtractor::new(claude, targets.process.llm_timeout()))
            as Arc<dyn TrendExtractor>
    });

    let state = Arc::new(AppState {
        store: Arc::new(store),
        scraper,
        extractor,
        targets,
        cron_auth: CronAuth::new(config.cron_secret.clone(), config.cron_require_secret),
    });

    let app = router(state);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("City trends API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
