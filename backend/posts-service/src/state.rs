/// Shared application state handed to every handler
use std::sync::Arc;
use std::time::Duration;

use crate::cache::PageCache;
use crate::config::Config;
use crate::db::Store;
use crate::media::MediaStorage;
use crate::security::SessionTokens;
use crate::services::{AccountService, CommentService, FollowService, PostService};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub page_cache: Arc<dyn PageCache>,
    pub config: Arc<Config>,
    pub tokens: Arc<SessionTokens>,
    pub media: MediaStorage,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, page_cache: Arc<dyn PageCache>, config: Config) -> Self {
        let tokens = Arc::new(SessionTokens::new(&config.auth));
        let media = MediaStorage::new(config.media.root.clone());
        Self {
            store,
            page_cache,
            config: Arc::new(config),
            tokens,
            media,
        }
    }

    pub fn post_service(&self) -> PostService {
        PostService::new(
            self.store.clone(),
            self.media.clone(),
            self.config.pagination.posts_per_page,
            self.config.media.max_upload_bytes,
        )
    }

    pub fn comment_service(&self) -> CommentService {
        CommentService::new(self.store.clone())
    }

    pub fn follow_service(&self) -> FollowService {
        FollowService::new(self.store.clone())
    }

    pub fn account_service(&self) -> AccountService {
        AccountService::new(self.store.clone())
    }

    pub fn index_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache.index_ttl_secs)
    }
}
