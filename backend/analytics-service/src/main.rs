use analytics_service::config::{Config, LogFormat};
use analytics_service::jobs::{spawn_dashboard_poller, DashboardPollerConfig, DashboardState};
use analytics_service::metrics;
use analytics_service::services::{
    avatar_url_or_fallback, image_url_or_fallback, DataAccessLayer, FixtureDataSource,
};
use anyhow::{Context, Result};
use dashboard_cache::{CacheMetrics, MemoryCache};
use prometheus::Registry;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{},analytics_service={}",
            config.app.log_level, config.app.log_level
        )
        .into()
    });
    match config.app.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false).json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    tracing::info!(env = %config.app.env, "Starting analytics-service");

    let registry = Registry::new();
    metrics::register(&registry).context("Failed to register service metrics")?;
    CacheMetrics::register(&registry).context("Failed to register cache metrics")?;

    let source = FixtureDataSource::from_config(&config.source)
        .await
        .context("Failed to load data source")?;
    let cache = MemoryCache::new(config.cache.max_age).context("Failed to create cache")?;
    let dal = Arc::new(DataAccessLayer::new(Arc::new(source), cache, &config.fetch));

    tracing::info!(
        cache_max_age_ms = config.cache.max_age.as_millis() as u64,
        fetch_retries = config.fetch.retries,
        "Data access layer ready"
    );

    let (handle, poller) = spawn_dashboard_poller(dal, DashboardPollerConfig::from(&config));

    let mut updates = handle.subscribe();
    let reporter = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            report(&state);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    handle.shutdown();
    poller.await.context("Dashboard poller panicked")?;
    drop(handle);
    reporter.await.context("Dashboard reporter panicked")?;

    tracing::debug!(metrics = %metrics::render(&registry), "Final metrics");
    tracing::info!("analytics-service stopped");
    Ok(())
}

fn report(state: &DashboardState) {
    if let Some(error) = &state.last_error {
        tracing::warn!(
            error = %error,
            failed_cycles = state.failed_cycles,
            showing_generation = state.generation(),
            "Failed to load dashboard data"
        );
        return;
    }

    let Some(views) = &state.views else {
        return;
    };

    for (rank, row) in views.top_users.iter().enumerate() {
        tracing::info!(
            rank = rank + 1,
            username = %row.user.username,
            comments = row.comment_count,
            avatar = %avatar_url_or_fallback(Some(&row.user.id)),
            "Top user"
        );
    }

    for row in &views.trending_posts {
        tracing::info!(
            post_id = %row.post.id,
            title = %row.post.title,
            comments = row.comment_count,
            image = %image_url_or_fallback(&row.post.id),
            "Trending post"
        );
    }

    if let Some(newest) = views.feed.first() {
        tracing::info!(
            post_id = %newest.post.id,
            author = newest.user.as_ref().map(|u| u.username.as_str()).unwrap_or("unknown"),
            avatar = %avatar_url_or_fallback(newest.user.as_ref().map(|u| u.id.as_str())),
            image = %image_url_or_fallback(&newest.post.id),
            created_at = %newest.post.created_at,
            "Newest feed entry"
        );
    }

    tracing::info!(
        generation = views.generation,
        feed_entries = views.feed.len(),
        "Dashboard views updated"
    );
}
