/// Comment service - attaches comments to posts
use std::sync::Arc;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::forms::{CommentForm, CommentFormData};
use crate::metrics::CONTENT_WRITES_TOTAL;
use crate::middleware::Viewer;
use crate::models::Comment;

pub struct CommentService {
    store: Arc<dyn Store>,
}

impl CommentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Add the viewer's comment to a post.
    ///
    /// Returns `None` when the text does not validate; the caller redirects
    /// back to the post either way.
    pub async fn add_comment(
        &self,
        viewer: &Viewer,
        post_id: i64,
        data: &CommentFormData,
    ) -> Result<Option<Comment>> {
        if self.store.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }

        let text = match CommentForm::validate(data) {
            Ok(text) => text,
            Err(errors) => {
                tracing::debug!(post_id, ?errors, "dropping invalid comment");
                return Ok(None);
            }
        };

        let comment = self.store.create_comment(post_id, viewer.id, &text).await?;
        CONTENT_WRITES_TOTAL.with_label_values(&["comment"]).inc();
        tracing::info!(post_id, comment_id = comment.id, author = %viewer.username, "comment added");
        Ok(Some(comment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewPost, NewUser};

    #[tokio::test]
    async fn comment_added_and_blank_dropped() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                username: "auth".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                password_hash: String::new(),
            })
            .await
            .unwrap();
        let post = store
            .create_post(NewPost {
                author_id: user.id,
                text: "text".to_string(),
                group_id: None,
                image: None,
            })
            .await
            .unwrap();
        let viewer = Viewer {
            id: user.id,
            username: user.username.clone(),
        };
        let service = CommentService::new(store.clone());

        let added = service
            .add_comment(
                &viewer,
                post.id,
                &CommentFormData {
                    text: "Great post".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(added.is_some());

        let dropped = service
            .add_comment(&viewer, post.id, &CommentFormData::default())
            .await
            .unwrap();
        assert!(dropped.is_none());
        assert_eq!(store.list_comments(post.id).await.unwrap().len(), 1);

        assert!(matches!(
            service
                .add_comment(&viewer, 999, &CommentFormData::default())
                .await,
            Err(AppError::NotFound(_))
        ));
    }
}
