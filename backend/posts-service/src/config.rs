/// Configuration management for the posts service
///
/// Values come from environment variables (a `.env` file is loaded by `main`),
/// with development defaults and a few hard checks for production.
use db_pool::env_utils::parse_env_strict;
use db_pool::DbConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const SERVICE_NAME: &str = "posts-service";
const DEV_JWT_SECRET: &str = "yatube-dev-secret-change-me";

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Storage backend and database settings
    pub storage: StorageConfig,
    /// Page cache settings
    pub cache: CacheConfig,
    /// Listing settings
    pub pagination: PaginationConfig,
    /// Session/token settings
    pub auth: AuthConfig,
    /// Uploaded media settings
    pub media: MediaConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// Which store implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database: DbConfig,
}

/// Page cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis URL; the in-memory cache is used when absent
    pub redis_url: Option<String>,
    /// Lifetime of the cached index page
    pub index_ttl_secs: u64,
    /// Key prefix of the cached index page
    pub index_key_prefix: String,
}

/// Listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub posts_per_page: i64,
}

/// Session configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub cookie_name: String,
    pub secure_cookies: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("cookie_name", &self.cookie_name)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

/// Uploaded media configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub root: PathBuf,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let app = AppConfig {
            env: app_env,
            host: std::env::var("YATUBE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env_strict("YATUBE_PORT", 8000)?,
        };

        let backend = match std::env::var("STORAGE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => StorageBackend::Postgres,
        };
        if app.is_production() && backend == StorageBackend::Memory {
            return Err("STORAGE_BACKEND=memory is not allowed in production".to_string());
        }

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if app.is_production() => {
                return Err("JWT_SECRET must be set in production".to_string())
            }
            _ => DEV_JWT_SECRET.to_string(),
        };
        if app.is_production() && jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 bytes in production".to_string());
        }

        let posts_per_page: i64 = parse_env_strict("POSTS_PER_PAGE", 10)?;
        if posts_per_page < 1 {
            return Err("POSTS_PER_PAGE must be at least 1".to_string());
        }

        Ok(Config {
            storage: StorageConfig {
                backend,
                database: DbConfig::from_env(SERVICE_NAME, "postgres://localhost/yatube")?,
            },
            cache: CacheConfig {
                redis_url: std::env::var("REDIS_URL")
                    .ok()
                    .filter(|url| !url.trim().is_empty()),
                index_ttl_secs: parse_env_strict("INDEX_CACHE_TTL_SECS", 20)?,
                index_key_prefix: std::env::var("INDEX_CACHE_KEY_PREFIX")
                    .unwrap_or_else(|_| "index_page".to_string()),
            },
            pagination: PaginationConfig { posts_per_page },
            auth: AuthConfig {
                jwt_secret,
                session_ttl_hours: parse_env_strict("SESSION_TTL_HOURS", 24 * 14)?,
                cookie_name: std::env::var("SESSION_COOKIE_NAME")
                    .unwrap_or_else(|_| "yatube_session".to_string()),
                secure_cookies: app.is_production(),
            },
            media: MediaConfig {
                root: std::env::var("MEDIA_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./media")),
                max_upload_bytes: parse_env_strict("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            },
            app,
        })
    }

    /// Development defaults with the in-memory store, used by tests and local runs.
    pub fn for_memory(media_root: PathBuf) -> Self {
        Config {
            app: AppConfig {
                env: "test".to_string(),
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                database: DbConfig::default(),
            },
            cache: CacheConfig {
                redis_url: None,
                index_ttl_secs: 20,
                index_key_prefix: "index_page".to_string(),
            },
            pagination: PaginationConfig { posts_per_page: 10 },
            auth: AuthConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                session_ttl_hours: 24,
                cookie_name: "yatube_session".to_string(),
                secure_cookies: false,
            },
            media: MediaConfig {
                root: media_root,
                max_upload_bytes: 5 * 1024 * 1024,
            },
        }
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.app.host.clone(), self.app.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses() {
        assert_eq!("memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert_eq!(
            "PostgreSQL".parse::<StorageBackend>(),
            Ok(StorageBackend::Postgres)
        );
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn memory_config_defaults() {
        let config = Config::for_memory(PathBuf::from("/tmp/media"));
        assert_eq!(config.pagination.posts_per_page, 10);
        assert_eq!(config.cache.index_ttl_secs, 20);
        assert_eq!(config.cache.index_key_prefix, "index_page");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }
}
