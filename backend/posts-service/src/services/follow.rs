/// Follow service - subscriptions between users
use std::sync::Arc;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::metrics::CONTENT_WRITES_TOTAL;
use crate::middleware::Viewer;
use crate::models::User;

pub struct FollowService {
    store: Arc<dyn Store>,
}

impl FollowService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn author(&self, username: &str) -> Result<User> {
        self.store
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))
    }

    /// Follow `username`. Following yourself or someone already followed is a no-op.
    pub async fn follow(&self, viewer: &Viewer, username: &str) -> Result<bool> {
        let author = self.author(username).await?;
        if author.id == viewer.id {
            tracing::debug!(user = %viewer.username, "ignoring self-follow");
            return Ok(false);
        }

        let created = self.store.create_follow(viewer.id, author.id).await?;
        if created {
            CONTENT_WRITES_TOTAL.with_label_values(&["follow"]).inc();
            tracing::info!(user = %viewer.username, author = %author.username, "followed");
        }
        Ok(created)
    }

    /// Stop following `username`; a no-op when not following.
    pub async fn unfollow(&self, viewer: &Viewer, username: &str) -> Result<bool> {
        let author = self.author(username).await?;
        let removed = self.store.delete_follow(viewer.id, author.id).await?;
        if removed {
            tracing::info!(user = %viewer.username, author = %author.username, "unfollowed");
        }
        Ok(removed)
    }
}
