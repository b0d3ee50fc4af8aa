use crate::middleware::RateLimiter;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub session_key: Vec<u8>,
    pub public_base_url: String,
    pub public_limiter: RateLimiter, // shared across guest endpoints, keyed by client IP
}

pub type SharedState = Arc<AppState>;
