/// Follow handlers - subscriptions and the follow feed
use actix_web::{web, HttpResponse};

use super::{profile_url, redirect, render};
use crate::error::Result;
use crate::middleware::Viewer;
use crate::pagination::PageQuery;
use crate::state::AppState;
use crate::templates::FollowTemplate;

/// Posts by everyone the viewer follows.
pub async fn follow_index(
    viewer: Viewer,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = state
        .post_service()
        .follow_feed(&viewer, query.requested())
        .await?;

    render(&FollowTemplate {
        viewer: Some(viewer),
        page,
    })
}

pub async fn profile_follow(
    path: web::Path<String>,
    viewer: Viewer,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let username = path.into_inner();
    state.follow_service().follow(&viewer, &username).await?;
    Ok(redirect(&profile_url(&username)))
}

pub async fn profile_unfollow(
    path: web::Path<String>,
    viewer: Viewer,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let username = path.into_inner();
    state.follow_service().unfollow(&viewer, &username).await?;
    Ok(redirect(&profile_url(&username)))
}
