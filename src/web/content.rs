//! Content administration: articles, news and announcements under `/app`.
//! Files are uploaded elsewhere; these endpoints only store their paths.

use crate::db::content::{self, AnnouncementFields, ArticleFields, NewsFields, NewsStats, PathChange};
use crate::domain::models::{Announcement, Article, News, NewsStatus};
use crate::error::{AppError, FieldErrors};
use crate::state::SharedState;
use crate::web::session::AdminSession;
use crate::web::{ok, ok_message, paginated, Page};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

const PER_PAGE: i64 = 10;
const DEFAULT_AUTHOR: &str = "Admin";
const EXPIRED_IN_PAST: &str = "Tanggal kedaluwarsa tidak boleh tanggal yang sudah lewat.";
const SAVED: &str = "Data berhasil disimpan";
const DELETED: &str = "Data berhasil dihapus";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct ArticlePayload {
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[serde(default = "default_true")]
    pub is_published: bool,
    pub attachment: Option<String>,
    #[serde(default)]
    pub delete_attachment: bool,
}

#[derive(Debug, Deserialize)]
pub struct ArticleDelete {
    #[serde(default, alias = "artikelIds")]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewsPayload {
    pub id: Option<i64>,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub status: NewsStatus,
    #[validate(length(min = 1))]
    pub body: String,
    pub published_on: Option<NaiveDate>,
    pub author: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub delete_image: bool,
}

#[derive(Debug, Serialize)]
pub struct NewsPage {
    pub news: Vec<News>,
    pub stats: NewsStats,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnnouncementPayload {
    pub id: Option<i64>,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub body: String,
    pub expired_date: NaiveDate,
    pub image_path: Option<String>,
    #[serde(default)]
    pub delete_image: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeleteById {
    pub id: i64,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/app/articles", get(list_articles))
        .route("/app/articles/change", post(change_article))
        .route("/app/articles/delete", post(delete_articles))
        .route("/app/articles/detail/:id", get(article_detail))
        .route("/app/news", get(list_news))
        .route("/app/news/change", post(change_news))
        .route("/app/news/delete", post(delete_news))
        .route("/app/announcements", get(list_announcements))
        .route("/app/announcements/change", post(change_announcement))
        .route("/app/announcements/delete", post(delete_announcement))
        .with_state(state)
}

fn search_term(search: &Option<String>) -> Option<&str> {
    search.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// `all` and blank mean no filter.
fn status_filter(raw: Option<&str>) -> Result<Option<NewsStatus>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some("draft") => Ok(Some(NewsStatus::Draft)),
        Some("published") => Ok(Some(NewsStatus::Published)),
        Some(_) => Err(AppError::Validation(FieldErrors::single(
            "status",
            "The selected status is invalid.",
        ))),
    }
}

fn check_expiry(expired_date: NaiveDate, today: NaiveDate) -> Result<(), AppError> {
    if expired_date < today {
        return Err(AppError::Validation(FieldErrors::single("expired_date", EXPIRED_IN_PAST)));
    }
    Ok(())
}

fn storage_url(base: &str, path: &str) -> String {
    format!("{}/storage/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

// ---------------------------------------------------------------------------
// Articles
// ---------------------------------------------------------------------------

async fn list_articles(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::new(query.page, Some(PER_PAGE), PER_PAGE);
    let (rows, total) =
        content::list_articles(&state.pool, search_term(&query.search), page.limit(), page.offset()).await?;
    Ok(paginated(rows, page.pagination(total)))
}

async fn change_article(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Json(payload): Json<ArticlePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let fields = ArticleFields {
        title: payload.title.trim().to_string(),
        content: payload.content,
        category: payload.category.trim().to_string(),
        is_published: payload.is_published,
    };
    let attachment = PathChange::from_form(payload.attachment, payload.delete_attachment);

    match payload.id {
        Some(id) => {
            let article = content::update_article(&state.pool, id, &fields, &attachment)
                .await?
                .ok_or(AppError::NotFound("article"))?;
            Ok((StatusCode::OK, ok_message("Artikel berhasil disimpan.", article)))
        }
        None => {
            let path = match &attachment {
                PathChange::Set(path) => Some(path.as_str()),
                _ => None,
            };
            let article = content::insert_article(&state.pool, &fields, path, admin.admin_id).await?;
            tracing::info!("Article {} created by {}", article.id, admin.admin_id);
            Ok((StatusCode::CREATED, ok_message("Artikel berhasil disimpan.", article)))
        }
    }
}

async fn delete_articles(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Json(payload): Json<ArticleDelete>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = content::delete_articles(&state.pool, &payload.ids).await?;
    Ok(ok_message("Artikel berhasil dihapus.", serde_json::json!({ "deleted": deleted })))
}

async fn article_detail(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let article = content::find_article(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("article"))?;
    let attachment_url = article
        .attachment
        .as_deref()
        .map(|path| storage_url(&state.public_base_url, path));
    Ok(ok(ArticleDetail { article, attachment_url }))
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

async fn list_news(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = status_filter(query.status.as_deref())?;
    let page = Page::new(query.page, Some(PER_PAGE), PER_PAGE);
    let (news, total) =
        content::list_news(&state.pool, search_term(&query.search), status, page.limit(), page.offset()).await?;
    let stats = content::news_stats(&state.pool).await?;
    Ok(paginated(NewsPage { news, stats }, page.pagination(total)))
}

async fn change_news(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Json(payload): Json<NewsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let fields = NewsFields {
        title: payload.title.trim().to_string(),
        status: payload.status,
        body: payload.body,
        published_on: payload.published_on.unwrap_or_else(|| Utc::now().date_naive()),
        author: payload
            .author
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
    };
    let image = PathChange::from_form(payload.image, payload.delete_image);

    let news: News = match payload.id {
        Some(id) => content::update_news(&state.pool, id, &fields, &image)
            .await?
            .ok_or(AppError::NotFound("news"))?,
        None => {
            let path = match &image {
                PathChange::Set(path) => Some(path.as_str()),
                _ => None,
            };
            content::insert_news(&state.pool, &fields, path).await?
        }
    };
    Ok(ok_message(SAVED, news))
}

async fn delete_news(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Json(payload): Json<DeleteById>,
) -> Result<impl IntoResponse, AppError> {
    if !content::delete_news(&state.pool, payload.id).await? {
        return Err(AppError::NotFound("news"));
    }
    Ok(ok_message(DELETED, serde_json::json!({ "id": payload.id })))
}

// ---------------------------------------------------------------------------
// Announcements
// ---------------------------------------------------------------------------

async fn list_announcements(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::new(query.page, Some(PER_PAGE), PER_PAGE);
    let (rows, total) =
        content::list_announcements(&state.pool, search_term(&query.search), page.limit(), page.offset()).await?;
    Ok(paginated(rows, page.pagination(total)))
}

async fn change_announcement(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Json(payload): Json<AnnouncementPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    check_expiry(payload.expired_date, Utc::now().date_naive())?;
    let fields = AnnouncementFields {
        title: payload.title.trim().to_string(),
        body: payload.body,
        expired_date: payload.expired_date,
    };
    let image = PathChange::from_form(payload.image_path, payload.delete_image);

    let announcement: Announcement = match payload.id {
        Some(id) => content::update_announcement(&state.pool, id, &fields, &image)
            .await?
            .ok_or(AppError::NotFound("announcement"))?,
        None => {
            let path = match &image {
                PathChange::Set(path) => Some(path.as_str()),
                _ => None,
            };
            content::insert_announcement(&state.pool, &fields, path).await?
        }
    };
    Ok(ok_message(SAVED, announcement))
}

async fn delete_announcement(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Json(payload): Json<DeleteById>,
) -> Result<impl IntoResponse, AppError> {
    if !content::delete_announcement(&state.pool, payload.id).await? {
        return Err(AppError::NotFound("announcement"));
    }
    Ok(ok_message(DELETED, serde_json::json!({ "id": payload.id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testing;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn status_filter_values() {
        assert_eq!(status_filter(None).unwrap(), None);
        assert_eq!(status_filter(Some("all")).unwrap(), None);
        assert_eq!(status_filter(Some("draft")).unwrap(), Some(NewsStatus::Draft));
        assert_eq!(status_filter(Some(" published ")).unwrap(), Some(NewsStatus::Published));
        assert!(matches!(status_filter(Some("archived")), Err(AppError::Validation(_))));
    }

    #[test]
    fn expiry_may_be_today_but_not_earlier() {
        let today = date(2025, 3, 10);
        assert!(check_expiry(today, today).is_ok());
        assert!(check_expiry(date(2025, 4, 1), today).is_ok());
        match check_expiry(date(2025, 3, 9), today) {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors.get("expired_date").unwrap()[0], EXPIRED_IN_PAST)
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn attachment_urls() {
        assert_eq!(
            storage_url("http://localhost:3000/", "/artikel_files/a.pdf"),
            "http://localhost:3000/storage/artikel_files/a.pdf"
        );
    }

    #[test]
    fn article_delete_accepts_legacy_field() {
        let payload: ArticleDelete = serde_json::from_str(&format!(r#"{{"artikelIds":["{}"]}}"#, Uuid::nil())).unwrap();
        assert_eq!(payload.ids, vec![Uuid::nil()]);
    }

    #[tokio::test]
    async fn listing_requires_a_session() {
        let app = router(testing::state(10));
        let response = app
            .oneshot(Request::builder().uri("/app/news").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn past_expiry_is_rejected_before_saving() {
        let app = router(testing::state(10));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/app/announcements/change")
                    .header(header::AUTHORIZATION, testing::bearer())
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"title":"Libur","body":"Kampus tutup","expired_date":"2001-01-01"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains(EXPIRED_IN_PAST));
    }
}
