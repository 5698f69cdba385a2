/// Comment handlers
use actix_web::{web, HttpResponse};

use super::{post_url, redirect};
use crate::error::Result;
use crate::forms::CommentFormData;
use crate::middleware::Viewer;
use crate::state::AppState;

/// Add a comment and go back to the post, whether or not it validated.
pub async fn add_comment(
    path: web::Path<i64>,
    viewer: Viewer,
    state: web::Data<AppState>,
    form: web::Form<CommentFormData>,
) -> Result<HttpResponse> {
    let post_id = path.into_inner();
    state
        .comment_service()
        .add_comment(&viewer, post_id, &form)
        .await?;

    Ok(redirect(&post_url(post_id)))
}
