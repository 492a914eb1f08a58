mod cache;
mod config;
mod db;
mod errors;
mod extraction;
mod jobs;
mod llm_client;
mod models;
mod pipeline;
mod profile;
mod routes;
mod scoring;
mod sinks;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::{AnalysisCache, MemoryAnalysisCache, RedisAnalysisCache};
use crate::config::Config;
use crate::db::connect_store;
use crate::llm_client::LlmClient;
use crate::pipeline::{Pipeline, PipelineSettings};
use crate::profile::initial_profile;
use crate::routes::build_router;
use crate::scoring::{LlmMatchAnalyzer, MatchAnalyzer, ScoringChain};
use crate::sinks::{CsvExternalLog, SinkCoordinator};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobscout v{}", env!("CARGO_PKG_VERSION"));

    // Primary store (PostgreSQL) and external log (CSV)
    let store = Arc::new(connect_store(&config.database_url).await?);
    let log = Arc::new(CsvExternalLog::new(config.job_log_path.clone()));
    info!("External log at {}", log.path().display());

    let cache = build_cache(&config).await?;
    info!("Analysis cache backend: {}", cache.backend());
    spawn_cache_sweep(cache.clone(), config.cache_sweep_interval);

    let chain = Arc::new(build_scoring_chain(&config));
    info!("Scoring tiers: {}", chain.tier_labels().join(" -> "));

    let profile = initial_profile(
        store.as_ref(),
        config.resume_file_path.as_deref(),
        config.user_skills.clone(),
    )
    .await;

    let pipeline = Pipeline::new(
        chain,
        cache.clone(),
        SinkCoordinator::new(store.clone(), log),
        PipelineSettings {
            cache_ttl: config.analysis_cache_ttl,
            record_delay: config.record_delay,
            concurrency: config.pipeline_concurrency,
        },
    );

    // Build app state
    let state = AppState {
        pipeline,
        cache,
        runs: store.clone(),
        profiles: store,
        profile: Arc::new(RwLock::new(Arc::new(profile))),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Redis when REDIS_URL is set, otherwise the in-process map.
async fn build_cache(config: &Config) -> Result<Arc<dyn AnalysisCache>> {
    match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("invalid REDIS_URL")?;
            let cache = RedisAnalysisCache::connect(&client)
                .await
                .context("connecting to Redis")?;
            Ok(Arc::new(cache))
        }
        None => Ok(Arc::new(MemoryAnalysisCache::new())),
    }
}

/// AI tiers in configured order; tiers without an API key are skipped.
fn build_scoring_chain(config: &Config) -> ScoringChain {
    let mut tiers: Vec<Arc<dyn MatchAnalyzer>> = Vec::new();
    for tier in &config.llm_tiers {
        let Some(api_key) = tier.api_key.clone() else {
            warn!(
                "Scoring tier {} skipped: {}_API_KEY is not set",
                tier.provider,
                tier.provider.env_prefix()
            );
            continue;
        };
        let mut client =
            LlmClient::new(tier.provider, api_key, tier.model.clone(), config.llm_retry);
        if let Some(endpoint) = &tier.endpoint {
            client = client.with_endpoint(endpoint.clone());
        }
        info!("Scoring tier {} using model {}", tier.provider, client.model());
        tiers.push(Arc::new(LlmMatchAnalyzer::new(client)));
    }
    ScoringChain::new(tiers)
}

/// Purges expired cache entries on a fixed interval for the life of the process.
fn spawn_cache_sweep(cache: Arc<dyn AnalysisCache>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match cache.sweep().await {
                Ok(0) => debug!("Cache sweep: nothing expired"),
                Ok(removed) => info!("Cache sweep removed {removed} expired entries"),
                Err(e) => warn!("Cache sweep failed: {e}"),
            }
        }
    });
}
