//! In-memory sliding-window limiter for the public survey endpoints.
use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Per-client hit log. Each queue holds the instants of admitted requests still
/// inside the window, oldest first.
#[derive(Clone)]
pub struct RateLimiter {
    clients: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: usize, window_secs: u64) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            limit,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub async fn admit(&self, client: &str) -> bool {
        self.admit_at(client, Instant::now()).await
    }

    /// Admits a request from `client` arriving at `now` unless it already used up
    /// its quota for the window ending at `now`.
    pub async fn admit_at(&self, client: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().await;
        let hits = clients.entry(client.to_string()).or_default();
        expire(hits, now, self.window);
        if hits.len() >= self.limit {
            return false;
        }
        hits.push_back(now);
        true
    }

    /// Forgets clients with no hit during the last `idle`, returning how many remain.
    pub async fn forget_idle(&self, now: Instant, idle: Duration) -> usize {
        let mut clients = self.clients.lock().await;
        clients.retain(|_, hits| {
            expire(hits, now, idle.max(self.window));
            !hits.is_empty()
        });
        clients.len()
    }
}

fn expire(hits: &mut VecDeque<Instant>, now: Instant, keep: Duration) {
    while let Some(&oldest) = hits.front() {
        if now.saturating_duration_since(oldest) < keep {
            break;
        }
        hits.pop_front();
    }
}

/// Proxy header first, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn public_rate_limit(
    State(state): State<SharedState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer);

    if !state.public_limiter.admit(&ip).await {
        tracing::warn!("Rate limit exceeded for IP: {}", ip);
        return AppError::TooManyRequests.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn quota_is_per_client() {
        let limiter = RateLimiter::new(3, 60);
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.admit_at("10.0.0.1", now).await);
        }
        assert!(!limiter.admit_at("10.0.0.1", now).await);
        assert!(limiter.admit_at("10.0.0.2", now).await);
    }

    #[tokio::test]
    async fn quota_frees_up_as_the_window_slides() {
        let limiter = RateLimiter::new(2, 60);
        let start = Instant::now();

        assert!(limiter.admit_at("guest", start).await);
        assert!(limiter.admit_at("guest", start + Duration::from_secs(30)).await);
        assert!(!limiter.admit_at("guest", start + Duration::from_secs(59)).await);
        // The first hit leaves the window; the rejected one never counted.
        assert!(limiter.admit_at("guest", start + Duration::from_secs(60)).await);
        assert!(!limiter.admit_at("guest", start + Duration::from_secs(61)).await);
    }

    #[tokio::test]
    async fn idle_clients_are_forgotten() {
        let limiter = RateLimiter::new(5, 60);
        let start = Instant::now();
        limiter.admit_at("old", start).await;
        limiter.admit_at("recent", start + Duration::from_secs(200)).await;

        let later = start + Duration::from_secs(301);
        assert_eq!(limiter.forget_idle(later, Duration::from_secs(300)).await, 1);

        // An idle span shorter than the window still keeps in-window hits.
        limiter.admit_at("fresh", later).await;
        let soon = later + Duration::from_secs(10);
        assert_eq!(limiter.forget_idle(soon, Duration::from_secs(1)).await, 1);
    }

    #[test]
    fn forwarded_header_wins_over_peer() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "192.168.1.7:5000".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)), "192.168.1.7");
        assert_eq!(client_ip(&headers, None), "unknown");

        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.9");
    }
}
