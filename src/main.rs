mod config;
mod db;
mod domain;
mod error;
mod export;
mod middleware;
mod services;
mod state;
mod tokens;
mod web;

use crate::config::Config;
use crate::middleware::RateLimiter;
use crate::state::{AppState, SharedState};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Window of the public endpoint limiter.
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect(&cfg.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;
    tracing::info!("Database migrations completed");

    let shared: SharedState = Arc::new(AppState {
        pool,
        session_key: cfg.session_key.clone(),
        public_base_url: cfg.public_base_url.clone(),
        public_limiter: RateLimiter::new(cfg.public_rate_limit, RATE_LIMIT_WINDOW_SECS),
    });

    // Forget idle clients so the limiter map does not grow without bound.
    let limiter = shared.public_limiter.clone();
    tokio::spawn(async move {
        let idle = limiter.window() * 5;
        let mut ticker = tokio::time::interval(idle);
        loop {
            ticker.tick().await;
            let active = limiter.forget_idle(Instant::now(), idle).await;
            tracing::debug!("Rate limiter tracks {} active clients", active);
        }
    });

    let app = web::routes(shared)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
