/// Error types for the posts service
///
/// Every handler returns `Result<HttpResponse>`; failures are turned into
/// rendered HTML error pages (or a login redirect) by `ResponseError`.
use actix_web::{
    error::ResponseError,
    http::{header, StatusCode},
    HttpResponse,
};
use askama::Template;
use thiserror::Error;

use crate::templates::{NotFoundTemplate, ServerErrorTemplate};

/// Result type for posts-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Cache operation failed
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Template rendering failed
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Validation failed
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Viewer must log in first; carries the path to return to
    #[error("Login required for {0}")]
    LoginRequired(String),

    /// Forbidden access
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Conflict (duplicate resource, etc.)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Where unauthenticated viewers are sent.
pub const LOGIN_URL: &str = "/auth/login/";

/// Login URL carrying a `next` parameter back to `path`.
pub fn login_redirect_url(path: &str) -> String {
    format!("{}?next={}", LOGIN_URL, urlencoding::encode(path))
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::CacheError(_) | AppError::TemplateError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::LoginRequired(_) => StatusCode::FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        match self {
            AppError::LoginRequired(next) => {
                return HttpResponse::Found()
                    .insert_header((header::LOCATION, login_redirect_url(next)))
                    .finish();
            }
            AppError::NotFound(what) => {
                tracing::debug!(%what, "rendering 404 page");
                let page = NotFoundTemplate {
                    viewer: None,
                    path: what.clone(),
                };
                return html_error(status, page.render());
            }
            _ => {}
        }

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            html_error(status, ServerErrorTemplate { viewer: None }.render())
        } else {
            HttpResponse::build(status)
                .content_type(mime::TEXT_PLAIN_UTF_8)
                .body(self.to_string())
        }
    }
}

fn html_error(status: StatusCode, rendered: askama::Result<String>) -> HttpResponse {
    match rendered {
        Ok(body) => HttpResponse::build(status)
            .content_type(mime::TEXT_HTML_UTF_8)
            .body(body),
        Err(err) => {
            tracing::error!(error = %err, "error page failed to render");
            HttpResponse::build(status)
                .content_type(mime::TEXT_PLAIN_UTF_8)
                .body(status.canonical_reason().unwrap_or("Error"))
        }
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::CacheError(err.to_string())
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::TemplateError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
