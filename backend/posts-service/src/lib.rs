/// Posts Service Library
///
/// Yatube: a server-rendered blogging site. Users publish text posts with an
/// optional image and group, comment on posts and follow authors.
///
/// # Modules
///
/// - `app`: Actix application factory
/// - `handlers`: HTTP request handlers and route table
/// - `models`: Users, groups, posts, comments, follows
/// - `services`: Business logic layer
/// - `db`: `Store` trait with PostgreSQL and in-memory implementations
/// - `cache`: Rendered-page cache
/// - `forms`: Form parsing and validation
/// - `middleware`: Session authentication and request metrics
/// - `security`: Password hashing and session tokens
/// - `templates`: Askama page templates
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod app;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod media;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod security;
pub mod services;
pub mod state;
pub mod templates;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
