/// HTTP handlers for the Yatube pages
///
/// This module contains handlers for:
/// - Posts: listings, detail, create and edit
/// - Comments: adding a comment to a post
/// - Follow: subscriptions and the follow feed
/// - Auth: signup, login and logout
/// - Media: serving uploaded images
/// - Health: liveness for orchestrators
pub mod auth;
pub mod comments;
pub mod follow;
pub mod health;
pub mod media;
pub mod posts;

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use askama::Template;

use crate::error::{AppError, Result};
use crate::metrics::serve_metrics;

/// Render a template as a 200 HTML response.
pub(crate) fn render<T: Template>(template: &T) -> Result<HttpResponse> {
    let body = template.render()?;
    Ok(html(body))
}

pub(crate) fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(mime::TEXT_HTML_UTF_8)
        .body(body)
}

pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub(crate) fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub(crate) fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

/// Requested path plus query string, as the cache key and `next` target.
pub(crate) fn path_and_query(req: &HttpRequest) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.path().to_string())
}

/// Unmatched URLs render the custom 404 page.
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse> {
    Err(AppError::NotFound(req.path().to_string()))
}

/// Register every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::PathConfig::default()
            .error_handler(|_, req| AppError::NotFound(req.path().to_string()).into()),
    )
    .route("/", web::get().to(posts::index))
    .route("/group/{slug}/", web::get().to(posts::group_posts))
    .route("/profile/{username}/", web::get().to(posts::profile))
    .route(
        "/profile/{username}/follow/",
        web::get().to(follow::profile_follow),
    )
    .route(
        "/profile/{username}/unfollow/",
        web::get().to(follow::profile_unfollow),
    )
    .route("/follow/", web::get().to(follow::follow_index))
    .route("/posts/{post_id}/", web::get().to(posts::post_detail))
    .service(
        web::resource("/posts/{post_id}/edit/")
            .route(web::get().to(posts::post_edit_form))
            .route(web::post().to(posts::post_edit)),
    )
    .route(
        "/posts/{post_id}/comment/",
        web::post().to(comments::add_comment),
    )
    .service(
        web::resource("/create/")
            .route(web::get().to(posts::post_create_form))
            .route(web::post().to(posts::post_create)),
    )
    .service(
        web::scope("/auth")
            .service(
                web::resource("/signup/")
                    .route(web::get().to(auth::signup_form))
                    .route(web::post().to(auth::signup)),
            )
            .service(
                web::resource("/login/")
                    .route(web::get().to(auth::login_form))
                    .route(web::post().to(auth::login)),
            )
            .service(
                web::resource("/logout/")
                    .route(web::get().to(auth::logout))
                    .route(web::post().to(auth::logout)),
            ),
    )
    .route("/media/{tail:.*}", web::get().to(media::serve_media))
    .route("/health", web::get().to(health::health))
    .route("/metrics", web::get().to(serve_metrics))
    .default_service(web::to(not_found));
}
