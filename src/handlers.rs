use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{error, http, web, HttpRequest, HttpResponse};

use crate::config::Config;
use crate::core::db::DocumentStore;
use crate::core::errors::ApiError;
use crate::models::models::ApiResponse;
use crate::{auth, blogs, comments, users};

/// Registers every route plus the JSON/query extractor error mapping.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .route("/health", web::get().to(health))
        .route("/register", web::post().to(auth::register))
        .route("/login", web::post().to(auth::login))
        .route("/logout", web::post().to(auth::logout))
        .route("/profile", web::get().to(users::get_profile))
        .service(
            web::scope("/blogs")
                .service(
                    web::resource("")
                        .route(web::post().to(blogs::handle_create_blog))
                        .route(web::get().to(blogs::handle_get_blogs)),
                )
                .route("/increment-views", web::post().to(blogs::handle_increment_views))
                .route("/toggle-like", web::post().to(blogs::handle_toggle_like))
                .service(
                    web::resource("/comments")
                        .route(web::post().to(comments::handle_add_comment))
                        .route(web::get().to(comments::handle_get_comments)),
                ),
        )
        .default_service(web::to(not_found));
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> error::Error {
    ApiError::BadRequest(err.to_string()).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> error::Error {
    ApiError::BadRequest(err.to_string()).into()
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error("no route found"))
}

pub async fn health(store: web::Data<DocumentStore>) -> HttpResponse {
    match store.ping() {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success(
            "health ok",
            serde_json::json!({ "status": "ok" }),
        )),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            HttpResponse::ServiceUnavailable().json(ApiResponse::error("document store unavailable"))
        }
    }
}

/// Credentialed CORS for the configured frontend origins.
pub fn cors(config: &Config) -> Cors {
    config
        .allowed_origins()
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["POST", "OPTIONS", "GET", "PUT", "DELETE", "PATCH"])
        .allowed_headers(vec![
            http::header::CONTENT_TYPE,
            http::header::CONTENT_LENGTH,
            http::header::ACCEPT_ENCODING,
            http::header::AUTHORIZATION,
            http::header::ACCEPT,
            http::header::ORIGIN,
            http::header::CACHE_CONTROL,
            http::header::HeaderName::from_static("x-csrf-token"),
            http::header::HeaderName::from_static("x-requested-with"),
        ])
        .supports_credentials()
        .max_age(86400)
}

/// Access log: client, method, path, status and latency. Health probes are noise.
pub fn access_log() -> Logger {
    Logger::new("%a | %r | %s | %Dms")
        .exclude("/health")
        .exclude("/favicon.ico")
}
