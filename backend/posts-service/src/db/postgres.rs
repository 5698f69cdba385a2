use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::Store;
use crate::error::{AppError, Result};
use crate::models::{
    Comment, Group, NewPost, NewUser, Post, PostChanges, PostFilter, User,
};

/// Columns of `Post`, selected from `posts p` joined with `users u` and
/// `post_groups g`.
const POST_COLUMNS: &str = r#"
    p.id, p.text, p.pub_date, p.author_id,
    u.username AS author_username,
    u.first_name AS author_first_name,
    u.last_name AS author_last_name,
    p.group_id,
    g.title AS group_title,
    g.slug AS group_slug,
    p.image
"#;

const POST_JOINS: &str = r#"
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id
"#;

/// Run the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations completed successfully");
    Ok(())
}

/// PostgreSQL store (source of truth)
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// WHERE clause for a listing; `$1` is always bound to `filter_param`.
fn filter_clause(filter: PostFilter) -> &'static str {
    match filter {
        PostFilter::All => "$1::BIGINT IS NULL",
        PostFilter::Group(_) => "p.group_id = $1",
        PostFilter::Author(_) => "p.author_id = $1",
        PostFilter::FollowedBy(_) => {
            "p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = $1)"
        }
    }
}

fn filter_param(filter: PostFilter) -> Option<i64> {
    match filter {
        PostFilter::All => None,
        PostFilter::Group(id) | PostFilter::Author(id) | PostFilter::FollowedBy(id) => Some(id),
    }
}

fn conflict_or_db(err: sqlx::Error, what: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(format!("{} already exists", what))
        }
        _ => AppError::from(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, first_name, last_name, email, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, first_name, last_name, email, password_hash, date_joined
            "#,
        )
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "username"))
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, first_name, last_name, email, password_hash, date_joined
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, first_name, last_name, email, password_hash, date_joined
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_group(&self, title: &str, slug: &str, description: &str) -> Result<Group> {
        sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO post_groups (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, slug, description
            "#,
        )
        .bind(title)
        .bind(slug)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "group slug"))
    }

    async fn get_group(&self, group_id: i64) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM post_groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM post_groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM post_groups ORDER BY title, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM posts p WHERE {}",
            filter_clause(filter)
        );
        let (count,) = sqlx::query_as::<_, (i64,)>(&sql)
            .bind(filter_param(filter))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn list_posts(&self, filter: PostFilter, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let sql = format!(
            r#"
            SELECT {columns}
            FROM posts p
            {joins}
            WHERE {clause}
            ORDER BY p.pub_date DESC, p.id DESC
            LIMIT $2 OFFSET $3
            "#,
            columns = POST_COLUMNS,
            joins = POST_JOINS,
            clause = filter_clause(filter),
        );

        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(filter_param(filter))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        debug!(?filter, limit, offset, returned = posts.len(), "listed posts");
        Ok(posts)
    }

    async fn get_post(&self, post_id: i64) -> Result<Option<Post>> {
        let sql = format!(
            "SELECT {} FROM posts p {} WHERE p.id = $1",
            POST_COLUMNS, POST_JOINS
        );
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let sql = format!(
            r#"
            WITH p AS (
                INSERT INTO posts (text, author_id, group_id, image)
                VALUES ($1, $2, $3, $4)
                RETURNING id, text, pub_date, author_id, group_id, image
            )
            SELECT {} FROM p {}
            "#,
            POST_COLUMNS, POST_JOINS
        );

        let created = sqlx::query_as::<_, Post>(&sql)
            .bind(&post.text)
            .bind(post.author_id)
            .bind(post.group_id)
            .bind(&post.image)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let sql = format!(
            r#"
            WITH p AS (
                UPDATE posts
                SET text = $2,
                    author_id = $3,
                    group_id = $4,
                    image = COALESCE($5, image)
                WHERE id = $1
                RETURNING id, text, pub_date, author_id, group_id, image
            )
            SELECT {} FROM p {}
            "#,
            POST_COLUMNS, POST_JOINS
        );

        let updated = sqlx::query_as::<_, Post>(&sql)
            .bind(post_id)
            .bind(&changes.text)
            .bind(changes.author_id)
            .bind(changes.group_id)
            .bind(&changes.image)
            .fetch_optional(&self.pool)
            .await?;

        Ok(updated)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH c AS (
                INSERT INTO comments (post_id, author_id, text)
                VALUES ($1, $2, $3)
                RETURNING id, post_id, author_id, text, created
            )
            SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created
            FROM c
            JOIN users u ON u.id = c.author_id
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let inserted = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO follows (user_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, author_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.is_some())
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let affected = sqlx::query(
            r#"
            DELETE FROM follows
            WHERE user_id = $1 AND author_id = $2
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let (exists,) = sqlx::query_as::<_, (bool,)>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn count_following(&self, user_id: i64) -> Result<i64> {
        let (count,) =
            sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM follows WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
