//! Insight Hub: blogging backend with accounts, blogs, likes, views and comments.

pub mod auth;
pub mod blogs;
pub mod comments;
pub mod config;
pub mod core;
pub mod handlers;
pub mod models;
pub mod users;
