use actix_web::HttpServer;
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use posts_service::app::build_app;
use posts_service::cache::{MemoryPageCache, PageCache, RedisPageCache};
use posts_service::config::StorageBackend;
use posts_service::db::{run_migrations, MemoryStore, PgStore, Store};
use posts_service::{AppState, Config};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,posts_service=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn build_store(config: &Config) -> io::Result<Arc<dyn Store>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let db_cfg = &config.storage.database;
            db_cfg.log_config();
            let pool = db_pool::create_pool(db_cfg)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            tracing::info!("Connected to database via db-pool crate");

            run_migrations(&pool)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

async fn build_page_cache(config: &Config) -> Arc<dyn PageCache> {
    match &config.cache.redis_url {
        Some(url) => match RedisPageCache::connect(url).await {
            Ok(cache) => {
                tracing::info!("Page cache backed by Redis");
                Arc::new(cache)
            }
            Err(e) => {
                tracing::warn!("Redis unavailable ({}); using in-process page cache", e);
                Arc::new(MemoryPageCache::new())
            }
        },
        None => {
            tracing::info!("REDIS_URL not set; using in-process page cache");
            Arc::new(MemoryPageCache::new())
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting posts-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let store = match build_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Store initialization failed: {}", e);
            eprintln!("ERROR: Failed to initialize storage: {}", e);
            std::process::exit(1);
        }
    };
    let page_cache = build_page_cache(&config).await;

    tokio::fs::create_dir_all(&config.media.root).await?;

    let (host, port) = config.bind_addr();
    let state = AppState::new(store, page_cache, config);

    tracing::info!("Starting HTTP server at {}:{}", host, port);

    HttpServer::new(move || build_app(state.clone()))
        .bind((host.as_str(), port))?
        .run()
        .await?;

    tracing::info!("posts-service shutting down");
    Ok(())
}
