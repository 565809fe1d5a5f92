use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use std::collections::HashMap;

use crate::auth::session_user;
use crate::config::*;
use crate::core::db::{Direction, DocumentStore};
use crate::core::errors::ApiError;
use crate::core::helpers::{new_id, now_iso, sanitize_html, sanitize_text, word_count};
use crate::models::models::{ApiResponse, Blog, BlogView, User};
use crate::users::{get_user, get_user_id, increment_blog_count};

#[derive(Deserialize)]
pub struct CreateBlogRequest {
    pub title: String,
    pub blog_content: String,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub blog_image: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Deserialize)]
pub struct TitleRequest {
    #[serde(default)]
    pub title: String,
}

#[derive(Deserialize)]
pub struct ToggleLikeRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub username: String,
}

/// Returns the trimmed title and sanitized content when the blog passes the
/// length rules. Words are counted on the content that will be stored.
fn validate_blog(title: &str, content: &str) -> Result<(String, String), ApiError> {
    let title = title.trim();
    let title_len = title.chars().count();
    if !(MIN_TITLE_LENGTH..=MAX_TITLE_LENGTH).contains(&title_len) {
        return Err(ApiError::BadRequest(format!(
            "title must be between {} and {} characters",
            MIN_TITLE_LENGTH, MAX_TITLE_LENGTH
        )));
    }

    let content = sanitize_html(content);
    let words = word_count(&content);
    if !(MIN_CONTENT_WORDS..=MAX_CONTENT_WORDS).contains(&words) {
        return Err(ApiError::BadRequest(format!(
            "content must be between {} and {} words",
            MIN_CONTENT_WORDS, MAX_CONTENT_WORDS
        )));
    }
    Ok((title.to_string(), content))
}

/// Stores the blog unless its title is already used.
pub fn create_blog(store: &DocumentStore, blog: &Blog) -> Result<(), ApiError> {
    if !store.insert_unique(BLOGS_COLLECTION, &blog.id, "title", &blog.title, blog)? {
        return Err(ApiError::Conflict(
            "a blog with this title already exists".to_string(),
        ));
    }
    Ok(())
}

pub fn title_exists(store: &DocumentStore, title: &str) -> anyhow::Result<bool> {
    store.exists(BLOGS_COLLECTION, "title", title)
}

pub fn get_blog_id(store: &DocumentStore, title: &str) -> anyhow::Result<Option<String>> {
    Ok(store
        .find_one::<Blog>(BLOGS_COLLECTION, "title", title)?
        .map(|b| b.id))
}

pub fn blog_exists(store: &DocumentStore, blog_id: &str) -> anyhow::Result<bool> {
    Ok(store.get::<Blog>(BLOGS_COLLECTION, blog_id)?.is_some())
}

/// All blogs, newest first, with author display fields attached.
/// Documents that do not decode as a blog are logged and skipped.
pub fn get_all_blogs(store: &DocumentStore) -> anyhow::Result<Vec<BlogView>> {
    let docs: Vec<serde_json::Value> = store.list(BLOGS_COLLECTION, "created_at", Direction::Desc)?;
    let blogs = docs.into_iter().filter_map(|doc| {
        let id = doc.get("id").and_then(|v| v.as_str()).unwrap_or("<no id>").to_string();
        match serde_json::from_value::<Blog>(doc) {
            Ok(blog) => Some(blog),
            Err(e) => {
                tracing::warn!(blog_id = %id, error = %e, "skipping malformed blog document");
                None
            }
        }
    });

    let mut authors: HashMap<String, Option<User>> = HashMap::new();
    let mut views = Vec::new();
    for blog in blogs {
        if !authors.contains_key(&blog.author_id) {
            let author = get_user(store, &blog.author_id)?;
            authors.insert(blog.author_id.clone(), author);
        }
        let author = authors.get(&blog.author_id).and_then(Option::as_ref);
        views.push(BlogView {
            author_name: author.map(|a| a.full_name.clone()),
            author_username: author.map(|a| a.username.clone()),
            blog,
        });
    }
    Ok(views)
}

/// Adds one view. Returns the new count, or None for an unknown title.
pub fn increment_views(store: &DocumentStore, title: &str) -> anyhow::Result<Option<i64>> {
    store.update_where(BLOGS_COLLECTION, "title", title, |blog: &mut Blog| {
        blog.views += 1;
        blog.views
    })
}

/// Flips `user` in the blog's liked-by list in one atomic step.
/// Returns (liked, likes), or None for an unknown title.
pub fn toggle_like(store: &DocumentStore, user: &str, title: &str) -> anyhow::Result<Option<(bool, i64)>> {
    store.update_where(BLOGS_COLLECTION, "title", title, |blog: &mut Blog| {
        let liked = blog.toggle_like(user);
        (liked, blog.likes)
    })
}

/// Bumps the blog's comment counter. Failures are logged and ignored.
pub fn increment_comment_count(store: &DocumentStore, blog_id: &str) {
    match store.increment(BLOGS_COLLECTION, blog_id, "comments", 1) {
        Ok(Some(_)) => {}
        Ok(None) => tracing::warn!(blog_id, "comment counter not updated: blog missing"),
        Err(e) => tracing::warn!(blog_id, error = %e, "comment counter not updated"),
    }
}

fn blog_not_found() -> ApiError {
    ApiError::NotFound("blog not found".to_string())
}

// === HTTP Handlers ===

pub async fn handle_create_blog(
    store: web::Data<DocumentStore>,
    req: HttpRequest,
    body: web::Json<CreateBlogRequest>,
) -> Result<HttpResponse, ApiError> {
    let (title, blog_content) = validate_blog(&body.title, &body.blog_content)?;

    // Cheap early rejection; the insert below is the authoritative check.
    if title_exists(&store, &title)? {
        return Err(ApiError::Conflict(
            "a blog with this title already exists".to_string(),
        ));
    }

    let author_id = match session_user(&req, &store)? {
        Some(user) => user.id,
        None => {
            let reference = body.author_id.trim();
            if reference.is_empty() || reference == "anonymous" {
                return Err(ApiError::Unauthorized("authenticated user required".to_string()));
            }
            get_user_id(&store, reference)?
                .ok_or_else(|| ApiError::Unauthorized("author not found".to_string()))?
        }
    };

    let now = now_iso();
    let body = body.into_inner();
    let blog = Blog {
        id: new_id(),
        title,
        blog_content,
        author_id,
        created_at: now.clone(),
        updated_at: now,
        tags: body
            .tags
            .iter()
            .map(|t| sanitize_text(t.trim()))
            .filter(|t| !t.is_empty())
            .collect(),
        blog_image: body.blog_image.trim().to_string(),
        category: sanitize_text(body.category.trim()),
        views: 0,
        likes: 0,
        comments: 0,
        liked_by: Vec::new(),
        featured: false,
        trending: false,
    };

    create_blog(&store, &blog)?;
    increment_blog_count(&store, &blog.author_id);
    tracing::info!(blog_id = %blog.id, author_id = %blog.author_id, "blog created");

    Ok(HttpResponse::Created().json(ApiResponse::success(
        "blog created successfully",
        serde_json::json!({ "id": blog.id, "blog": blog }),
    )))
}

pub async fn handle_get_blogs(store: web::Data<DocumentStore>) -> Result<HttpResponse, ApiError> {
    let blogs = get_all_blogs(&store).map_err(|e| {
        tracing::error!(error = %e, "listing blogs failed");
        ApiError::InternalError("failed to fetch blogs".to_string())
    })?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("blogs fetched successfully", blogs)))
}

pub async fn handle_increment_views(
    store: web::Data<DocumentStore>,
    body: web::Json<TitleRequest>,
) -> Result<HttpResponse, ApiError> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let views = increment_views(&store, title)?.ok_or_else(blog_not_found)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "view count incremented",
        serde_json::json!({ "views": views }),
    )))
}

pub async fn handle_toggle_like(
    store: web::Data<DocumentStore>,
    req: HttpRequest,
    body: web::Json<ToggleLikeRequest>,
) -> Result<HttpResponse, ApiError> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let liker = match body.username.trim() {
        "" => session_user(&req, &store)?
            .map(|u| u.username)
            .ok_or_else(|| ApiError::Unauthorized("authenticated user required".to_string()))?,
        username => username.to_string(),
    };

    let (liked, likes) = toggle_like(&store, &liker, title)?.ok_or_else(blog_not_found)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "like status toggled",
        serde_json::json!({ "liked": liked, "likes": likes }),
    )))
}
