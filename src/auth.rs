use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::config::*;
use crate::core::db::DocumentStore;
use crate::core::errors::ApiError;
use crate::core::helpers::{is_strong_password, is_valid_email, sanitize_text};
use crate::models::models::{ApiResponse, User};
use crate::users::{create_user, get_user, validate_user, NewUser};

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "fullName", default)]
    pub full_name: String,
    #[serde(default)]
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Session cookie carrying the user id, valid for SESSION_TTL_MINUTES.
pub fn auth_cookie(value: &str, secure: bool) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE_NAME, value.to_string())
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(SESSION_TTL_MINUTES))
        .finish()
}

fn expired_auth_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = auth_cookie("", secure);
    cookie.make_removal();
    cookie
}

/// The user named by the request's session cookie, if any.
pub fn session_user(req: &HttpRequest, store: &DocumentStore) -> Result<Option<User>, ApiError> {
    let Some(cookie) = req.cookie(AUTH_COOKIE_NAME) else {
        return Ok(None);
    };
    let user_id = cookie.value();
    if user_id.is_empty() {
        return Ok(None);
    }
    Ok(get_user(store, user_id)?)
}

/// Returns the sanitized username; its length is checked after cleaning so
/// the stored value obeys the same limits.
fn validate_registration(body: &RegisterRequest) -> Result<String, ApiError> {
    if !is_valid_email(body.email.trim()) {
        return Err(ApiError::BadRequest("a valid email is required".to_string()));
    }
    let username = sanitize_text(body.username.trim());
    let username_len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&username_len) {
        return Err(ApiError::BadRequest(format!(
            "username must be between {} and {} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }
    if !is_strong_password(&body.password) {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {} characters and include one uppercase letter and one special character",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(username)
}

// === HTTP Handlers ===

pub async fn register(
    store: web::Data<DocumentStore>,
    config: web::Data<Config>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let username = validate_registration(&body)?;
    let full_name = sanitize_text(body.full_name.trim());
    let user = create_user(
        &store,
        NewUser {
            full_name: &full_name,
            username: &username,
            email: body.email.trim(),
            password: &body.password,
        },
    )?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok(HttpResponse::Ok()
        .cookie(auth_cookie(&user.id, config.cookie_secure))
        .json(ApiResponse::success(
            "registration successful",
            serde_json::json!({
                "id": user.id,
                "fullName": user.full_name,
                "email": user.email,
                "username": user.username,
            }),
        )))
}

pub async fn login(
    store: web::Data<DocumentStore>,
    config: web::Data<Config>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = validate_user(&store, body.email.trim(), &body.password)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(HttpResponse::Ok()
        .cookie(auth_cookie(&user.id, config.cookie_secure))
        .json(ApiResponse::success(
            "login successful",
            serde_json::json!({
                "id": user.id,
                "email": user.email,
                "username": user.username,
            }),
        )))
}

pub async fn logout(config: web::Data<Config>) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(expired_auth_cookie(config.cookie_secure))
        .json(ApiResponse::ok("logout successful"))
}
