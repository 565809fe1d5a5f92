use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth::session_user;
use crate::blogs::{blog_exists, increment_comment_count};
use crate::config::*;
use crate::core::db::{Direction, DocumentStore};
use crate::core::errors::ApiError;
use crate::core::helpers::{new_id, now_iso, sanitize_html};
use crate::models::models::{ApiResponse, Comment};
use crate::users::get_user_id;

#[derive(Deserialize)]
pub struct AddCommentRequest {
    #[serde(default)]
    pub blog_id: String,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize)]
pub struct CommentsQuery {
    #[serde(default)]
    pub blog_id: String,
}

/// Stores the comment and bumps the blog's comment counter (best effort).
pub fn add_comment(store: &DocumentStore, comment: &Comment) -> anyhow::Result<()> {
    store.insert(COMMENTS_COLLECTION, &comment.comment_id, comment)?;
    increment_comment_count(store, &comment.blog_id);
    Ok(())
}

/// Comments of a blog, oldest first.
pub fn get_comments(store: &DocumentStore, blog_id: &str) -> anyhow::Result<Vec<Comment>> {
    store.query(COMMENTS_COLLECTION, "blog_id", blog_id, "created_at", Direction::Asc)
}

fn get_comment(store: &DocumentStore, comment_id: &str) -> anyhow::Result<Option<Comment>> {
    store.get(COMMENTS_COLLECTION, comment_id)
}

// === HTTP Handlers ===

pub async fn handle_add_comment(
    store: web::Data<DocumentStore>,
    req: HttpRequest,
    body: web::Json<AddCommentRequest>,
) -> Result<HttpResponse, ApiError> {
    let blog_id = body.blog_id.trim();
    if blog_id.is_empty() {
        return Err(ApiError::BadRequest("blog_id is required".to_string()));
    }

    // Length is checked on what will be stored.
    let content = sanitize_html(body.content.trim()).trim().to_string();
    let content_len = content.chars().count();
    if content_len == 0 || content_len > MAX_COMMENT_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "comment must be between 1 and {} characters",
            MAX_COMMENT_LENGTH
        )));
    }

    let author_id = match session_user(&req, &store)? {
        Some(user) => user.id,
        None => {
            let reference = body.author_id.trim();
            if reference.is_empty() {
                return Err(ApiError::Unauthorized("authenticated user required".to_string()));
            }
            get_user_id(&store, reference)?
                .ok_or_else(|| ApiError::Unauthorized("author not found".to_string()))?
        }
    };

    if !blog_exists(&store, blog_id)? {
        return Err(ApiError::NotFound("blog not found".to_string()));
    }

    let parent_id = match body.parent_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(parent_id) => {
            match get_comment(&store, parent_id)? {
                Some(parent) if parent.blog_id == blog_id => Some(parent.comment_id),
                _ => return Err(ApiError::BadRequest("parent comment not found".to_string())),
            }
        }
    };

    let comment = Comment {
        comment_id: new_id(),
        blog_id: blog_id.to_string(),
        author_id,
        parent_id,
        content,
        likes: 0,
        created_at: now_iso(),
    };
    add_comment(&store, &comment)?;
    tracing::info!(comment_id = %comment.comment_id, blog_id = %comment.blog_id, "comment added");

    Ok(HttpResponse::Created().json(ApiResponse::success("comment added successfully", comment)))
}

pub async fn handle_get_comments(
    store: web::Data<DocumentStore>,
    query: web::Query<CommentsQuery>,
) -> Result<HttpResponse, ApiError> {
    let blog_id = query.blog_id.trim();
    if blog_id.is_empty() {
        return Err(ApiError::BadRequest("blog_id is required".to_string()));
    }

    let comments = get_comments(&store, blog_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("comments fetched successfully", comments)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BLOGS_COLLECTION;
    use serde_json::json;

    fn comment(blog_id: &str, created_at: &str, content: &str) -> Comment {
        Comment {
            comment_id: new_id(),
            blog_id: blog_id.to_string(),
            author_id: "u1".to_string(),
            parent_id: None,
            content: content.to_string(),
            likes: 0,
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn comments_are_listed_oldest_first_per_blog() {
        let store = DocumentStore::in_memory();
        store.insert(BLOGS_COLLECTION, "b1", &json!({"id": "b1", "comments": 0})).unwrap();

        add_comment(&store, &comment("b1", "2026-01-02T00:00:00Z", "second")).unwrap();
        add_comment(&store, &comment("b1", "2026-01-01T00:00:00Z", "first")).unwrap();
        add_comment(&store, &comment("b2", "2026-01-01T00:00:00Z", "elsewhere")).unwrap();

        let listed = get_comments(&store, "b1").unwrap();
        let contents: Vec<&str> = listed.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);

        let blog: serde_json::Value = store.get(BLOGS_COLLECTION, "b1").unwrap().unwrap();
        assert_eq!(blog["comments"], 2);
    }

    #[test]
    fn comment_on_missing_blog_still_stores_comment() {
        // The counter bump is best effort and must not fail the write.
        let store = DocumentStore::in_memory();
        add_comment(&store, &comment("gone", "2026-01-01T00:00:00Z", "hi")).unwrap();
        assert_eq!(get_comments(&store, "gone").unwrap().len(), 1);
    }
}
