// region:    --- Imports
use auction_engine::bidding::rate_limit::InProcessRateLimiter;
use auction_engine::clock::SystemClock;
use auction_engine::config::Config;
use auction_engine::database::DatabaseManager;
use auction_engine::engine::AuctionEngine;
use auction_engine::handlers;
use auction_engine::notify::{
    CacheInvalidator, HttpCacheInvalidator, MultiNotifier, NoopCacheInvalidator, Notifier,
    StoreNotifier, WebhookNotifier,
};
use auction_engine::scheduler::EngineScheduler;
use auction_engine::store::{AuctionStore, PostgresStore};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    let db_manager = Arc::new(DatabaseManager::new(&config.database_url).await?);
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> database initialization failed: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> database initialized", "Main");

    let store: Arc<dyn AuctionStore> = Arc::new(PostgresStore::new(&db_manager));
    let clock = Arc::new(SystemClock);

    let store_notifier: Arc<dyn Notifier> =
        Arc::new(StoreNotifier::new(Arc::clone(&store), clock.clone()));
    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => Arc::new(MultiNotifier::new(vec![
            store_notifier,
            Arc::new(WebhookNotifier::new(url.clone())),
        ])),
        None => store_notifier,
    };

    let cache: Arc<dyn CacheInvalidator> = match &config.cache_purge_url {
        Some(url) => Arc::new(HttpCacheInvalidator::new(url.clone())),
        None => Arc::new(NoopCacheInvalidator),
    };

    let rate_limiter = Arc::new(InProcessRateLimiter::new(config.bid_cooldown));

    let engine = Arc::new(AuctionEngine::new(
        store,
        clock,
        notifier,
        cache,
        rate_limiter,
        config.clone(),
    ));

    // Time-driven work: listing activation and auction finalization.
    let scheduler = EngineScheduler::new(
        Arc::clone(&engine),
        config.scheduler_interval,
        config.finalize_batch_limit,
    );
    scheduler.start();
    info!("{:<12} --> scheduler started", "Main");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes_all = Router::new()
        .route("/bid", post(handlers::handle_bid))
        .route("/buy-now", post(handlers::handle_buy_now))
        .route("/auto-bid", post(handlers::handle_set_auto_bid))
        .route(
            "/auto-bid/:listing_id/:user_id",
            get(handlers::handle_get_auto_bid).delete(handlers::handle_cancel_auto_bid),
        )
        .route("/finalize", post(handlers::handle_finalize))
        .route("/listings", get(handlers::handle_get_listings))
        .route("/listings/:id", get(handlers::handle_get_listing))
        .route("/listings/:id/bids", get(handlers::handle_get_bids))
        .route("/listings/:id/min-bid", get(handlers::handle_get_min_bid))
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(engine);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
