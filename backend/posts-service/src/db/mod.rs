/// Database access layer
///
/// `Store` is the seam between services and storage. `PgStore` is the
/// production implementation; `MemoryStore` backs tests and local runs.
pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{run_migrations, PgStore};

use crate::error::Result;
use crate::models::{
    Comment, Group, NewPost, NewUser, Post, PostChanges, PostFilter, User,
};

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Create a user; `Conflict` when the username is taken
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn get_user(&self, user_id: i64) -> Result<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Create a group; `Conflict` when the slug is taken
    async fn create_group(&self, title: &str, slug: &str, description: &str) -> Result<Group>;

    async fn get_group(&self, group_id: i64) -> Result<Option<Group>>;

    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>>;

    /// All groups ordered by title
    async fn list_groups(&self) -> Result<Vec<Group>>;

    async fn count_posts(&self, filter: PostFilter) -> Result<i64>;

    /// Posts matching `filter`, newest first
    async fn list_posts(&self, filter: PostFilter, limit: i64, offset: i64) -> Result<Vec<Post>>;

    async fn get_post(&self, post_id: i64) -> Result<Option<Post>>;

    async fn create_post(&self, post: NewPost) -> Result<Post>;

    /// Apply an edit; `None` when the post does not exist
    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>>;

    /// Comments of a post, oldest first
    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>>;

    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment>;

    /// Idempotent create follow; returns true if a new row was inserted.
    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Idempotent delete; returns true if a row was removed.
    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Number of authors `user_id` follows
    async fn count_following(&self, user_id: i64) -> Result<i64>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
