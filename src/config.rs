use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;

// === Validation limits ===
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 20;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MIN_TITLE_LENGTH: usize = 5;
pub const MAX_TITLE_LENGTH: usize = 100;
pub const MIN_CONTENT_WORDS: usize = 1;
pub const MAX_CONTENT_WORDS: usize = 500;
pub const MAX_COMMENT_LENGTH: usize = 1000;

// === Session cookie ===
pub const AUTH_COOKIE_NAME: &str = "auth_token";
pub const SESSION_TTL_MINUTES: i64 = 10;

// === Collections ===
pub const USERS_COLLECTION: &str = "users";
pub const BLOGS_COLLECTION: &str = "blogs";
pub const COMMENTS_COLLECTION: &str = "comments";

/// Runtime settings, read from the process environment (and `.env` if present).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Comma-separated list of origins allowed to call the API with credentials.
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: String,
    /// Snapshot file for the document store. In-memory only when unset.
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    #[serde(default)]
    pub seed_demo_data: bool,
    #[serde(default)]
    pub cookie_secure: bool,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    6969
}

fn default_cors_allowed_origins() -> String {
    "http://localhost:8080".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: default_server_host(),
            server_port: default_server_port(),
            cors_allowed_origins: default_cors_allowed_origins(),
            data_file: None,
            seed_demo_data: false,
            cookie_secure: false,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env is fine; the real environment still applies.
        let _ = dotenvy::dotenv();
        envy::from_env::<Config>().context("invalid server configuration in environment")
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.server_host.clone(), self.server_port)
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect()
    }
}
