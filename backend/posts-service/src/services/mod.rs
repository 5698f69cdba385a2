/// Business logic layer for posts-service
///
/// This module provides high-level operations:
/// - Post service: listings, detail, creation and editing
/// - Comment service: comments on posts
/// - Follow service: subscriptions between users
/// - Account service: signup, login and admin account creation
pub mod accounts;
pub mod comments;
pub mod follow;
pub mod posts;

// Re-export commonly used services
pub use accounts::AccountService;
pub use comments::CommentService;
pub use follow::FollowService;
pub use posts::{FormResult, PostDetail, PostService, Profile};
