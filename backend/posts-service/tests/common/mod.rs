//! Shared fixtures for the HTTP tests: an app over the in-memory store,
//! users with ready-made session cookies and multipart bodies.
#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::{http::header, test};
use std::sync::Arc;
use tempfile::TempDir;

use posts_service::cache::MemoryPageCache;
use posts_service::db::{MemoryStore, Store};
use posts_service::handlers::auth::session_cookie;
use posts_service::models::{Group, NewPost, NewUser, Post, User};
use posts_service::{AppState, Config};

pub const BOUNDARY: &str = "yatube-test-boundary";

/// 2x1 GIF
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x00,
    0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

/// State over fresh in-memory backends. Keep the `TempDir` alive for the test.
pub fn test_state() -> (AppState, TempDir) {
    let media_dir = tempfile::tempdir().expect("temp media dir");
    let config = Config::for_memory(media_dir.path().to_path_buf());
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryPageCache::new()),
        config,
    );
    (state, media_dir)
}

pub async fn create_user(state: &AppState, username: &str) -> User {
    state
        .store
        .create_user(NewUser {
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: format!("{}@example.com", username),
            password_hash: String::new(),
        })
        .await
        .expect("create user")
}

pub async fn create_group(state: &AppState, title: &str, slug: &str) -> Group {
    state
        .store
        .create_group(title, slug, "Тестовое описание")
        .await
        .expect("create group")
}

pub async fn create_post(state: &AppState, author: &User, text: &str, group: Option<&Group>) -> Post {
    state
        .store
        .create_post(NewPost {
            author_id: author.id,
            text: text.to_string(),
            group_id: group.map(|g| g.id),
            image: None,
        })
        .await
        .expect("create post")
}

/// Session cookie that logs `user` in.
pub fn login_cookie(state: &AppState, user: &User) -> Cookie<'static> {
    let token = state
        .tokens
        .issue(user.id, &user.username)
        .expect("issue session token");
    session_cookie(&state.tokens, token)
}

/// `multipart/form-data` body with text fields and an optional file part.
pub fn multipart_body(
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((name, filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/gif\r\n\r\n",
                BOUNDARY, name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn body_string<B>(resp: ServiceResponse<B>) -> String
where
    B: actix_web::body::MessageBody,
{
    let bytes = test::read_body(resp).await;
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Number of post cards on a listing page.
pub fn card_count(html: &str) -> usize {
    html.matches("<article>").count()
}
