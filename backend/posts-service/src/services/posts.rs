/// Post service - listings, detail, creation and editing of posts
use std::sync::Arc;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::forms::{FormErrors, PostForm, PostFormData};
use crate::media::MediaStorage;
use crate::metrics::CONTENT_WRITES_TOTAL;
use crate::middleware::Viewer;
use crate::models::{Comment, Group, NewPost, Post, PostChanges, PostFilter, User};
use crate::pagination::{Page, PageRequest};

/// Outcome of a form submission: the saved value or the form's errors.
pub type FormResult<T> = std::result::Result<T, FormErrors>;

/// An author's profile listing.
#[derive(Debug)]
pub struct Profile {
    pub author: User,
    pub page: Page<Post>,
    /// Whether the viewer follows this author
    pub following: bool,
}

/// A single post with its comments.
#[derive(Debug)]
pub struct PostDetail {
    pub post: Post,
    pub author_posts_count: i64,
    pub comments: Vec<Comment>,
}

pub struct PostService {
    store: Arc<dyn Store>,
    media: MediaStorage,
    per_page: i64,
    max_upload_bytes: usize,
}

impl PostService {
    pub fn new(
        store: Arc<dyn Store>,
        media: MediaStorage,
        per_page: i64,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            store,
            media,
            per_page,
            max_upload_bytes,
        }
    }

    /// One page of posts matching `filter`, newest first.
    pub async fn list(&self, filter: PostFilter, requested_page: i64) -> Result<Page<Post>> {
        let total = self.store.count_posts(filter).await?;
        let request = PageRequest::resolve(requested_page, self.per_page, total);
        let posts = self
            .store
            .list_posts(filter, request.limit(), request.offset())
            .await?;

        Ok(Page::new(posts, &request))
    }

    pub async fn group_page(&self, slug: &str, requested_page: i64) -> Result<(Group, Page<Post>)> {
        let group = self
            .store
            .get_group_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("group '{}'", slug)))?;
        let page = self.list(PostFilter::Group(group.id), requested_page).await?;
        Ok((group, page))
    }

    pub async fn profile(
        &self,
        username: &str,
        requested_page: i64,
        viewer: Option<&Viewer>,
    ) -> Result<Profile> {
        let author = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))?;
        let page = self.list(PostFilter::Author(author.id), requested_page).await?;

        let following = match viewer {
            Some(viewer) if viewer.id != author.id => {
                self.store.is_following(viewer.id, author.id).await?
            }
            _ => false,
        };

        Ok(Profile {
            author,
            page,
            following,
        })
    }

    /// Posts by the authors the viewer follows.
    pub async fn follow_feed(&self, viewer: &Viewer, requested_page: i64) -> Result<Page<Post>> {
        self.list(PostFilter::FollowedBy(viewer.id), requested_page)
            .await
    }

    pub async fn get(&self, post_id: i64) -> Result<Post> {
        self.store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
    }

    pub async fn detail(&self, post_id: i64) -> Result<PostDetail> {
        let post = self.get(post_id).await?;
        let author_posts_count = self
            .store
            .count_posts(PostFilter::Author(post.author_id))
            .await?;
        let comments = self.store.list_comments(post.id).await?;

        Ok(PostDetail {
            post,
            author_posts_count,
            comments,
        })
    }

    pub async fn groups(&self) -> Result<Vec<Group>> {
        self.store.list_groups().await
    }

    /// Validate and store a new post authored by the viewer.
    pub async fn create(&self, viewer: &Viewer, data: &PostFormData) -> Result<FormResult<Post>> {
        let groups = self.store.list_groups().await?;
        let valid = match PostForm::validate(data, &groups, self.max_upload_bytes) {
            Ok(valid) => valid,
            Err(errors) => return Ok(Err(errors)),
        };

        let image = match &valid.image {
            Some(upload) => Some(self.media.save(&upload.filename, &upload.bytes).await?),
            None => None,
        };

        let created = self
            .store
            .create_post(NewPost {
                author_id: viewer.id,
                text: valid.text,
                group_id: valid.group_id,
                image: image.clone(),
            })
            .await;
        let post = match created {
            Ok(post) => post,
            Err(e) => {
                self.discard_upload(image.as_deref()).await;
                return Err(e);
            }
        };

        CONTENT_WRITES_TOTAL.with_label_values(&["post"]).inc();
        tracing::info!(post_id = post.id, author = %viewer.username, "post created");
        Ok(Ok(post))
    }

    /// Validate and apply an edit. The caller has checked authorship.
    pub async fn update(
        &self,
        viewer: &Viewer,
        post: &Post,
        data: &PostFormData,
    ) -> Result<FormResult<Post>> {
        let groups = self.store.list_groups().await?;
        let valid = match PostForm::validate(data, &groups, self.max_upload_bytes) {
            Ok(valid) => valid,
            Err(errors) => return Ok(Err(errors)),
        };

        let image = match &valid.image {
            Some(upload) => Some(self.media.save(&upload.filename, &upload.bytes).await?),
            None => None,
        };

        let saved = self
            .store
            .update_post(
                post.id,
                PostChanges {
                    author_id: viewer.id,
                    text: valid.text,
                    group_id: valid.group_id,
                    image: image.clone(),
                },
            )
            .await;
        let updated = match saved {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                self.discard_upload(image.as_deref()).await;
                return Err(AppError::NotFound(format!("post {}", post.id)));
            }
            Err(e) => {
                self.discard_upload(image.as_deref()).await;
                return Err(e);
            }
        };

        tracing::info!(post_id = updated.id, author = %viewer.username, "post edited");
        Ok(Ok(updated))
    }

    async fn discard_upload(&self, image: Option<&str>) {
        if let Some(relative) = image {
            self.media.remove(relative).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewUser;

    async fn setup() -> (Arc<dyn Store>, PostService, Viewer, tempfile::TempDir) {
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
        let media_dir = tempfile::tempdir().unwrap();
        let service = PostService::new(
            store.clone(),
            MediaStorage::new(media_dir.path()),
            10,
            1024,
        );
        let viewer = Viewer {
            id: user.id,
            username: user.username,
        };
        (store, service, viewer, media_dir)
    }

    fn form(text: &str, group: &str) -> PostFormData {
        PostFormData {
            text: text.to_string(),
            group: group.to_string(),
            image: None,
        }
    }

    #[tokio::test]
    async fn thirteen_posts_paginate() {
        let (_store, service, viewer, _dir) = setup().await;
        for i in 0..13 {
            service
                .create(&viewer, &form(&format!("post {}", i), ""))
                .await
                .unwrap()
                .unwrap();
        }

        let first = service.list(PostFilter::All, 1).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].text, "post 12");

        let second = service.list(PostFilter::All, 2).await.unwrap();
        assert_eq!(second.items.len(), 3);

        let beyond = service.list(PostFilter::All, 3).await.unwrap();
        assert_eq!(beyond.number, 2);
        assert_eq!(beyond.items.len(), 3);
    }

    #[tokio::test]
    async fn invalid_form_saves_nothing() {
        let (store, service, viewer, _dir) = setup().await;
        let errors = service
            .create(&viewer, &form("   ", "42"))
            .await
            .unwrap()
            .unwrap_err();
        assert!(errors.has("text"));
        assert!(errors.has("group"));
        assert_eq!(store.count_posts(PostFilter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_group_and_user_are_not_found() {
        let (_store, service, _viewer, _dir) = setup().await;
        assert!(matches!(
            service.group_page("nope", 1).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.profile("nobody", 1, None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(service.detail(999).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn failed_insert_removes_stored_image() {
        const SMALL_GIF: &[u8] = &[
            0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00,
            0x00, 0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C,
            0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00,
            0x3B,
        ];
        let (store, service, _viewer, dir) = setup().await;
        let ghost = Viewer {
            id: 999,
            username: "ghost".to_string(),
        };
        let mut data = form("with image", "");
        data.image = Some(crate::forms::Upload {
            filename: "small.gif".to_string(),
            bytes: SMALL_GIF.to_vec(),
        });

        assert!(service.create(&ghost, &data).await.is_err());
        assert_eq!(store.count_posts(PostFilter::All).await.unwrap(), 0);
        assert!(!dir.path().join("posts/small.gif").exists());
    }

    #[tokio::test]
    async fn update_changes_text() {
        let (_store, service, viewer, _dir) = setup().await;
        let post = service
            .create(&viewer, &form("before", ""))
            .await
            .unwrap()
            .unwrap();
        let updated = service
            .update(&viewer, &post, &form("after", ""))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, post.id);
        assert_eq!(updated.text, "after");
    }
}
