pub mod alumni;
pub mod content;
pub mod flash;
pub mod session;
pub mod surveys;
pub mod user_survey;

use crate::middleware::public_rate_limit;
use crate::state::SharedState;
use axum::{middleware::from_fn_with_state, routing::get, routing::MethodRouter, Json, Router};
use serde::Serialize;

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: None,
        data,
        pagination: None,
    })
}

pub fn ok_message<T: Serialize>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: Some(message.to_string()),
        data,
        pagination: None,
    })
}

pub fn paginated<T: Serialize>(data: T, pagination: Pagination) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: None,
        data,
        pagination: Some(pagination),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub per_page: i64,
    pub current_page: i64,
    pub last_page: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    pub const MAX_PER_PAGE: i64 = 100;

    pub fn new(page: Option<i64>, per_page: Option<i64>, default_per_page: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_per_page).clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination {
            total,
            per_page: self.per_page,
            current_page: self.page,
            last_page: ((total + self.per_page - 1) / self.per_page).max(1),
        }
    }
}

/// Wraps a public endpoint in the per-IP limiter.
pub fn limited(state: &SharedState, route: MethodRouter<SharedState>) -> MethodRouter<SharedState> {
    route.layer(from_fn_with_state(state.clone(), public_rate_limit))
}

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(surveys::router(state.clone()))
        .merge(alumni::router(state.clone()))
        .nest("/app", user_survey::router(state.clone()))
        .merge(content::router(state))
}
