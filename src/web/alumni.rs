//! Guest pages of the token-gated alumni survey. Outcomes travel as flash messages
//! across 303 redirects instead of JSON errors.

use crate::domain::answers::PositionalAnswer;
use crate::domain::models::{AlumniSurvey, QuestionSetItem};
use crate::error::AppError;
use crate::services::lifecycle;
use crate::state::SharedState;
use crate::web::flash::{self, Flash};
use crate::web::limited;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};

pub const ACCESS_PAGE: &str = "/survey";

const INVALID_TOKEN: &str = "Token tidak valid.";
const ALREADY_FILLED: &str = "Survey ini sudah diisi sebelumnya.";
const SUBMITTED: &str = "Terima kasih! Jawaban Anda telah tersimpan.";
const FAILED: &str = "Terjadi kesalahan. Silakan coba lagi.";

#[derive(Debug, Deserialize)]
pub struct TokenForm {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub answers: Vec<PositionalAnswer>,
}

#[derive(Debug, Serialize)]
pub struct AccessPage {
    pub flash: Option<Flash>,
}

#[derive(Debug, Serialize)]
pub struct FormPage {
    pub survey: AlumniSurvey,
    pub questions: Vec<QuestionSetItem>,
    pub flash: Option<Flash>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(ACCESS_PAGE, get(access_page))
        .route("/survey/check", limited(&state, post(check_token)))
        .route("/survey/form/:token", limited(&state, get(show_form)))
        .route("/survey/submit", limited(&state, post(submit)))
        .with_state(state)
}

pub fn form_path(token: &str) -> String {
    format!("/survey/form/{token}")
}

/// Flash text for a failed guest action. Internal failures are logged, never shown.
fn flash_message(err: &AppError) -> String {
    match err {
        AppError::NotFound(_) => INVALID_TOKEN.to_string(),
        AppError::AlreadyCompleted(_) => ALREADY_FILLED.to_string(),
        AppError::Validation(errors) => errors.first_message().unwrap_or(FAILED).to_string(),
        AppError::Database(_) | AppError::Internal(_) => {
            tracing::error!("Guest survey request failed: {}", err);
            FAILED.to_string()
        }
        other => other.public_message(),
    }
}

async fn access_page(headers: HeaderMap) -> Response {
    let (flash, clear) = flash::take(&headers);
    (AppendHeaders(clear), Json(AccessPage { flash })).into_response()
}

async fn check_token(State(state): State<SharedState>, Form(form): Form<TokenForm>) -> Response {
    let token = form.token.trim();
    if token.is_empty() {
        return flash::redirect_with(ACCESS_PAGE, Flash::error("Token wajib diisi."));
    }
    match lifecycle::resolve_by_token(&state.pool, token).await {
        Ok(survey) => axum::response::Redirect::to(&form_path(&survey.token)).into_response(),
        Err(err) => flash::redirect_with(ACCESS_PAGE, Flash::error(flash_message(&err))),
    }
}

async fn show_form(State(state): State<SharedState>, Path(token): Path<String>, headers: HeaderMap) -> Response {
    match lifecycle::load_form(&state.pool, &token).await {
        Ok((survey, set)) => {
            let (flash, clear) = flash::take(&headers);
            let page = FormPage {
                survey,
                questions: set.questions.0,
                flash,
            };
            (AppendHeaders(clear), Json(page)).into_response()
        }
        Err(err) => flash::redirect_with(ACCESS_PAGE, Flash::error(flash_message(&err))),
    }
}

async fn submit(State(state): State<SharedState>, Json(form): Json<SubmitForm>) -> Response {
    let token = form.token.trim();
    match lifecycle::submit_by_token(&state.pool, token, &form.answers).await {
        Ok(_) => flash::redirect_with(ACCESS_PAGE, Flash::success(SUBMITTED)),
        // Validation problems send the guest back to the form they were filling.
        Err(err @ AppError::Validation(_)) => flash::redirect_with(&form_path(token), Flash::error(flash_message(&err))),
        Err(err) => flash::redirect_with(ACCESS_PAGE, Flash::error(flash_message(&err))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldErrors;
    use crate::web::testing;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn flash_of(response: &Response) -> Flash {
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        let raw = cookie.trim_start_matches("flash=").split(';').next().unwrap();
        Flash::decode(raw).unwrap()
    }

    #[test]
    fn maps_errors_to_guest_messages() {
        assert_eq!(flash_message(&AppError::NotFound("survey")), INVALID_TOKEN);
        assert_eq!(flash_message(&AppError::AlreadyCompleted("done")), ALREADY_FILLED);
        let errors = FieldErrors::single("answers.0", "This question is required.");
        assert_eq!(flash_message(&AppError::Validation(errors)), "This question is required.");
        assert_eq!(flash_message(&AppError::Internal(anyhow::anyhow!("pool timed out"))), FAILED);
    }

    #[tokio::test]
    async fn access_page_consumes_flash() {
        let app = router(testing::state(10));
        let cookie = format!("flash={}", Flash::success(SUBMITTED).encode());
        let response = app
            .oneshot(
                Request::builder()
                    .uri(ACCESS_PAGE)
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let clear = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(clear.contains("Max-Age=0"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["flash"]["success"], SUBMITTED);
    }

    #[tokio::test]
    async fn malformed_tokens_bounce_back_with_error() {
        let app = router(testing::state(10));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/survey/check")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("token=not-a-token"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], ACCESS_PAGE);
        assert_eq!(flash_of(&response).error.as_deref(), Some(INVALID_TOKEN));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/survey/check")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("token="))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(flash_of(&response).error.as_deref(), Some("Token wajib diisi."));
    }

    #[tokio::test]
    async fn submit_with_malformed_token_redirects() {
        let app = router(testing::state(10));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/survey/submit")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"token":"xyz","answers":[{"type":"skala","value":5}]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(flash_of(&response).error.as_deref(), Some(INVALID_TOKEN));
    }
}
