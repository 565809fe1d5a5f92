use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth::session_user;
use crate::config::USERS_COLLECTION;
use crate::core::db::DocumentStore;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, new_id, now_iso, verify_password};
use crate::models::models::{ApiResponse, User};

pub struct NewUser<'a> {
    pub full_name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Hashes the password and stores the user, unless the email is taken.
pub fn create_user(store: &DocumentStore, new_user: NewUser<'_>) -> Result<User, ApiError> {
    let id = new_id();
    let user = User {
        id: id.clone(),
        full_name: new_user.full_name.to_string(),
        username: new_user.username.to_string(),
        email: new_user.email.to_string(),
        password: hash_password(new_user.password)?,
        created_at: now_iso(),
        no_of_blogs: 0,
        followers: 0,
        followings: 0,
    };

    if !store.insert_unique(USERS_COLLECTION, &id, "email", &user.email, &user)? {
        return Err(ApiError::Conflict(
            "user with this email already exists".to_string(),
        ));
    }
    Ok(user)
}

/// Checks credentials. Unknown email and wrong password are indistinguishable.
pub fn validate_user(store: &DocumentStore, email: &str, password: &str) -> Result<User, ApiError> {
    let invalid = || ApiError::Unauthorized("invalid email or password".to_string());

    let user = store
        .find_one::<User>(USERS_COLLECTION, "email", email)?
        .ok_or_else(invalid)?;
    if !verify_password(password, &user.password) {
        return Err(invalid());
    }
    Ok(user)
}

pub fn get_user(store: &DocumentStore, user_id: &str) -> anyhow::Result<Option<User>> {
    store.get::<User>(USERS_COLLECTION, user_id)
}

/// Resolves a user reference given either as a document id or an email.
pub fn get_user_id(store: &DocumentStore, reference: &str) -> anyhow::Result<Option<String>> {
    if get_user(store, reference)?.is_some() {
        return Ok(Some(reference.to_string()));
    }
    Ok(store
        .find_one::<User>(USERS_COLLECTION, "email", reference)?
        .map(|u| u.id))
}

/// Bumps the author's post counter. Failures are logged and ignored.
pub fn increment_blog_count(store: &DocumentStore, user_id: &str) {
    match store.increment(USERS_COLLECTION, user_id, "no_of_blogs", 1) {
        Ok(Some(_)) => {}
        Ok(None) => tracing::warn!(user_id, "post counter not updated: user missing"),
        Err(e) => tracing::warn!(user_id, error = %e, "post counter not updated"),
    }
}

// === HTTP Handlers ===

pub async fn get_profile(
    store: web::Data<DocumentStore>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let user = session_user(&req, &store)?
        .ok_or_else(|| ApiError::Unauthorized("authenticated user required".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("profile fetched successfully", user.public_json())))
}
