use crate::domain::models::{Announcement, Article, News, NewsStatus};
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

const ARTICLE_COLUMNS: &str =
    "id, title, content, category, is_published, user_id, attachment, created_at, updated_at";
const NEWS_COLUMNS: &str =
    "id, title, status, body, image, published_on, author, created_at, updated_at";
const ANNOUNCEMENT_COLUMNS: &str =
    "id, title, body, expired_date, image_path, created_at, updated_at";

/// What to do with a stored file path on update. Paths come from the storage layer as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathChange {
    Keep,
    Set(String),
    Clear,
}

impl PathChange {
    pub fn from_form(path: Option<String>, clear: bool) -> Self {
        match path.filter(|p| !p.trim().is_empty()) {
            Some(path) => PathChange::Set(path),
            None if clear => PathChange::Clear,
            None => PathChange::Keep,
        }
    }

    /// `(new path, clear flag)` bound into `CASE WHEN $clear THEN NULL ELSE COALESCE($new, col) END`.
    fn binds(&self) -> (Option<&str>, bool) {
        match self {
            PathChange::Keep => (None, false),
            PathChange::Set(path) => (Some(path.as_str()), false),
            PathChange::Clear => (None, true),
        }
    }
}

// ---------------------------------------------------------------------------
// Articles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ArticleFields {
    pub title: String,
    pub content: String,
    pub category: String,
    pub is_published: bool,
}

pub async fn list_articles(
    pool: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Article>, i64)> {
    let pattern = super::like_pattern(search);
    let rows = sqlx::query_as::<_, Article>(&format!(
        r#"
        SELECT {ARTICLE_COLUMNS}
        FROM articles
        WHERE $1::text IS NULL OR title ILIKE $1 OR content ILIKE $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM articles WHERE $1::text IS NULL OR title ILIKE $1 OR content ILIKE $1",
    )
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub async fn find_article(pool: &PgPool, id: Uuid) -> Result<Option<Article>> {
    let article = sqlx::query_as::<_, Article>(&format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(article)
}

pub async fn insert_article(
    pool: &PgPool,
    fields: &ArticleFields,
    attachment: Option<&str>,
    user_id: Uuid,
) -> Result<Article> {
    let article = sqlx::query_as::<_, Article>(&format!(
        r#"
        INSERT INTO articles (id, title, content, category, is_published, user_id, attachment)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {ARTICLE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&fields.title)
    .bind(&fields.content)
    .bind(&fields.category)
    .bind(fields.is_published)
    .bind(user_id)
    .bind(attachment)
    .fetch_one(pool)
    .await?;
    Ok(article)
}

pub async fn update_article(
    pool: &PgPool,
    id: Uuid,
    fields: &ArticleFields,
    attachment: &PathChange,
) -> Result<Option<Article>> {
    let (path, clear) = attachment.binds();
    let article = sqlx::query_as::<_, Article>(&format!(
        r#"
        UPDATE articles
        SET title = $2, content = $3, category = $4, is_published = $5,
            attachment = CASE WHEN $7 THEN NULL ELSE COALESCE($6, attachment) END,
            updated_at = now()
        WHERE id = $1
        RETURNING {ARTICLE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&fields.title)
    .bind(&fields.content)
    .bind(&fields.category)
    .bind(fields.is_published)
    .bind(path)
    .bind(clear)
    .fetch_optional(pool)
    .await?;
    Ok(article)
}

pub async fn delete_articles(pool: &PgPool, ids: &[Uuid]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query("DELETE FROM articles WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewsFields {
    pub title: String,
    pub status: NewsStatus,
    pub body: String,
    pub published_on: NaiveDate,
    pub author: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NewsStats {
    pub total: i64,
    pub published: i64,
    pub draft: i64,
}

pub async fn list_news(
    pool: &PgPool,
    search: Option<&str>,
    status: Option<NewsStatus>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<News>, i64)> {
    let pattern = super::like_pattern(search);
    let rows = sqlx::query_as::<_, News>(&format!(
        r#"
        SELECT {NEWS_COLUMNS}
        FROM news
        WHERE ($1::text IS NULL OR title ILIKE $1 OR body ILIKE $1)
          AND ($2::text IS NULL OR status = $2)
        ORDER BY published_on DESC, id DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(&pattern)
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM news
        WHERE ($1::text IS NULL OR title ILIKE $1 OR body ILIKE $1)
          AND ($2::text IS NULL OR status = $2)
        "#,
    )
    .bind(&pattern)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub async fn news_stats(pool: &PgPool) -> Result<NewsStats> {
    let (total, published, draft): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE status = 'published'),
               COUNT(*) FILTER (WHERE status = 'draft')
        FROM news
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(NewsStats { total, published, draft })
}

pub async fn insert_news(pool: &PgPool, fields: &NewsFields, image: Option<&str>) -> Result<News> {
    let news = sqlx::query_as::<_, News>(&format!(
        r#"
        INSERT INTO news (title, status, body, image, published_on, author)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {NEWS_COLUMNS}
        "#
    ))
    .bind(&fields.title)
    .bind(fields.status)
    .bind(&fields.body)
    .bind(image)
    .bind(fields.published_on)
    .bind(&fields.author)
    .fetch_one(pool)
    .await?;
    Ok(news)
}

pub async fn update_news(pool: &PgPool, id: i64, fields: &NewsFields, image: &PathChange) -> Result<Option<News>> {
    let (path, clear) = image.binds();
    let news = sqlx::query_as::<_, News>(&format!(
        r#"
        UPDATE news
        SET title = $2, status = $3, body = $4, published_on = $5, author = $6,
            image = CASE WHEN $8 THEN NULL ELSE COALESCE($7, image) END,
            updated_at = now()
        WHERE id = $1
        RETURNING {NEWS_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&fields.title)
    .bind(fields.status)
    .bind(&fields.body)
    .bind(fields.published_on)
    .bind(&fields.author)
    .bind(path)
    .bind(clear)
    .fetch_optional(pool)
    .await?;
    Ok(news)
}

pub async fn delete_news(pool: &PgPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM news WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Announcements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AnnouncementFields {
    pub title: String,
    pub body: String,
    pub expired_date: NaiveDate,
}

pub async fn list_announcements(
    pool: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Announcement>, i64)> {
    let pattern = super::like_pattern(search);
    let rows = sqlx::query_as::<_, Announcement>(&format!(
        r#"
        SELECT {ANNOUNCEMENT_COLUMNS}
        FROM announcements
        WHERE $1::text IS NULL OR title ILIKE $1 OR body ILIKE $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM announcements WHERE $1::text IS NULL OR title ILIKE $1 OR body ILIKE $1",
    )
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub async fn insert_announcement(
    pool: &PgPool,
    fields: &AnnouncementFields,
    image_path: Option<&str>,
) -> Result<Announcement> {
    let announcement = sqlx::query_as::<_, Announcement>(&format!(
        r#"
        INSERT INTO announcements (title, body, expired_date, image_path)
        VALUES ($1, $2, $3, $4)
        RETURNING {ANNOUNCEMENT_COLUMNS}
        "#
    ))
    .bind(&fields.title)
    .bind(&fields.body)
    .bind(fields.expired_date)
    .bind(image_path)
    .fetch_one(pool)
    .await?;
    Ok(announcement)
}

pub async fn update_announcement(
    pool: &PgPool,
    id: i64,
    fields: &AnnouncementFields,
    image: &PathChange,
) -> Result<Option<Announcement>> {
    let (path, clear) = image.binds();
    let announcement = sqlx::query_as::<_, Announcement>(&format!(
        r#"
        UPDATE announcements
        SET title = $2, body = $3, expired_date = $4,
            image_path = CASE WHEN $6 THEN NULL ELSE COALESCE($5, image_path) END,
            updated_at = now()
        WHERE id = $1
        RETURNING {ANNOUNCEMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&fields.title)
    .bind(&fields.body)
    .bind(fields.expired_date)
    .bind(path)
    .bind(clear)
    .fetch_optional(pool)
    .await?;
    Ok(announcement)
}

pub async fn delete_announcement(pool: &PgPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
