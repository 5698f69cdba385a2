use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::Store;
use crate::error::{AppError, Result};
use crate::models::{
    Comment, Follow, Group, NewPost, NewUser, Post, PostChanges, PostFilter, User,
};

#[derive(Debug, Clone)]
struct PostRow {
    id: i64,
    text: String,
    pub_date: chrono::DateTime<Utc>,
    author_id: i64,
    group_id: Option<i64>,
    image: Option<String>,
}

#[derive(Debug, Clone)]
struct CommentRow {
    id: i64,
    post_id: i64,
    author_id: i64,
    text: String,
    created: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, PostRow>,
    comments: BTreeMap<i64, CommentRow>,
    follows: Vec<Follow>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn matches(&self, row: &PostRow, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => row.group_id == Some(group_id),
            PostFilter::Author(author_id) => row.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|f| f.user_id == user_id && f.author_id == row.author_id),
        }
    }

    fn join_post(&self, row: &PostRow) -> Result<Post> {
        let author = self.users.get(&row.author_id).ok_or_else(|| {
            AppError::DatabaseError(format!("post {} references missing user", row.id))
        })?;
        let group = row.group_id.and_then(|id| self.groups.get(&id));

        Ok(Post {
            id: row.id,
            text: row.text.clone(),
            pub_date: row.pub_date,
            author_id: row.author_id,
            author_username: author.username.clone(),
            author_first_name: author.first_name.clone(),
            author_last_name: author.last_name.clone(),
            group_id: group.map(|g| g.id),
            group_title: group.map(|g| g.title.clone()),
            group_slug: group.map(|g| g.slug.clone()),
            image: row.image.clone(),
        })
    }

    fn join_comment(&self, row: &CommentRow) -> Result<Comment> {
        let author = self.users.get(&row.author_id).ok_or_else(|| {
            AppError::DatabaseError(format!("comment {} references missing user", row.id))
        })?;

        Ok(Comment {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            author_username: author.username.clone(),
            text: row.text.clone(),
            created: row.created,
        })
    }

    fn require_user(&self, user_id: i64) -> Result<()> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(AppError::DatabaseError(format!(
                "foreign key violation: user {} does not exist",
                user_id
            )))
        }
    }

    fn require_group(&self, group_id: Option<i64>) -> Result<()> {
        match group_id {
            Some(id) if !self.groups.contains_key(&id) => Err(AppError::DatabaseError(format!(
                "foreign key violation: group {} does not exist",
                id
            ))),
            _ => Ok(()),
        }
    }
}

/// In-process store with the same constraints as the PostgreSQL schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("username already exists".to_string()));
        }

        let id = tables.allocate_id();
        let created = User {
            id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            date_joined: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_group(&self, title: &str, slug: &str, description: &str) -> Result<Group> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|g| g.slug == slug) {
            return Err(AppError::Conflict("group slug already exists".to_string()));
        }

        let id = tables.allocate_id();
        let group = Group {
            id,
            title: title.to_string(),
            slug: slug.to_string(),
            description: description.to_string(),
        };
        tables.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn get_group(&self, group_id: i64) -> Result<Option<Group>> {
        Ok(self.tables.read().await.groups.get(&group_id).cloned())
    }

    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .posts
            .values()
            .filter(|row| tables.matches(row, filter))
            .count();
        Ok(count as i64)
    }

    async fn list_posts(&self, filter: PostFilter, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&PostRow> = tables
            .posts
            .values()
            .filter(|row| tables.matches(row, filter))
            .collect();
        rows.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));

        rows.into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|row| tables.join_post(row))
            .collect()
    }

    async fn get_post(&self, post_id: i64) -> Result<Option<Post>> {
        let tables = self.tables.read().await;
        tables
            .posts
            .get(&post_id)
            .map(|row| tables.join_post(row))
            .transpose()
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let mut tables = self.tables.write().await;
        tables.require_user(post.author_id)?;
        tables.require_group(post.group_id)?;

        let id = tables.allocate_id();
        let row = PostRow {
            id,
            text: post.text,
            pub_date: Utc::now(),
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
        };
        let joined = tables.join_post(&row)?;
        tables.posts.insert(id, row);
        Ok(joined)
    }

    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let mut tables = self.tables.write().await;
        tables.require_user(changes.author_id)?;
        tables.require_group(changes.group_id)?;

        let Some(row) = tables.posts.get_mut(&post_id) else {
            return Ok(None);
        };
        row.text = changes.text;
        row.author_id = changes.author_id;
        row.group_id = changes.group_id;
        if let Some(image) = changes.image {
            row.image = Some(image);
        }
        let row = row.clone();

        tables.join_post(&row).map(Some)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&CommentRow> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .collect();
        rows.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        rows.into_iter().map(|row| tables.join_comment(row)).collect()
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let mut tables = self.tables.write().await;
        tables.require_user(author_id)?;
        if !tables.posts.contains_key(&post_id) {
            return Err(AppError::DatabaseError(format!(
                "foreign key violation: post {} does not exist",
                post_id
            )));
        }

        let id = tables.allocate_id();
        let row = CommentRow {
            id,
            post_id,
            author_id,
            text: text.to_string(),
            created: Utc::now(),
        };
        let joined = tables.join_comment(&row)?;
        tables.comments.insert(id, row);
        Ok(joined)
    }

    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if user_id == author_id {
            return Err(AppError::DatabaseError(
                "check violation: follows_no_self_follow".to_string(),
            ));
        }
        tables.require_user(user_id)?;
        tables.require_user(author_id)?;

        if tables
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Ok(false);
        }

        let id = tables.allocate_id();
        tables.follows.push(Follow {
            id,
            user_id,
            author_id,
        });
        Ok(true)
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(tables.follows.len() < before)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn count_following(&self, user_id: i64) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables.follows.iter().filter(|f| f.user_id == user_id).count() as i64)
    }
}
