/// Post handlers - listings, detail, create and edit pages
use actix_web::{web, HttpRequest, HttpResponse};
use askama::Template;

use super::{html, path_and_query, post_url, profile_url, redirect, render};
use crate::cache::{cached_page, page_key};
use crate::error::Result;
use crate::forms::{group_choices, read_post_submission, FormErrors, PostFormData};
use crate::middleware::{can_edit_post, Viewer};
use crate::models::{Group, Post, PostFilter};
use crate::pagination::PageQuery;
use crate::state::AppState;
use crate::templates::{
    CreatePostTemplate, GroupListTemplate, IndexTemplate, PostDetailTemplate, ProfileTemplate,
};

/// Home page: every post, newest first.
///
/// The rendered page is shared by all visitors for the cache TTL, so its
/// navigation bar is rendered for an anonymous viewer.
pub async fn index(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let key = page_key(&state.config.cache.index_key_prefix, &path_and_query(&req));
    let service = state.post_service();
    let requested = query.requested();

    let body = cached_page(
        state.page_cache.as_ref(),
        &key,
        state.index_cache_ttl(),
        || async move {
            let page = service.list(PostFilter::All, requested).await?;
            Ok(IndexTemplate { viewer: None, page }.render()?)
        },
    )
    .await?;

    Ok(html(body))
}

/// Posts of one group.
pub async fn group_posts(
    path: web::Path<String>,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
    viewer: Option<Viewer>,
) -> Result<HttpResponse> {
    let slug = path.into_inner();
    let (group, page) = state
        .post_service()
        .group_page(&slug, query.requested())
        .await?;

    render(&GroupListTemplate {
        viewer,
        group,
        page,
    })
}

/// An author's posts, with follow controls for other logged-in users.
pub async fn profile(
    path: web::Path<String>,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
    viewer: Option<Viewer>,
) -> Result<HttpResponse> {
    let username = path.into_inner();
    let profile = state
        .post_service()
        .profile(&username, query.requested(), viewer.as_ref())
        .await?;

    let show_follow = viewer
        .as_ref()
        .map(|v| v.id != profile.author.id)
        .unwrap_or(false);

    render(&ProfileTemplate {
        viewer,
        count: profile.page.total,
        author: profile.author,
        page: profile.page,
        following: profile.following,
        show_follow,
    })
}

pub async fn post_detail(
    path: web::Path<i64>,
    state: web::Data<AppState>,
    viewer: Option<Viewer>,
) -> Result<HttpResponse> {
    let detail = state.post_service().detail(path.into_inner()).await?;
    let can_edit = can_edit_post(viewer.as_ref(), &detail.post);

    render(&PostDetailTemplate {
        viewer,
        post: detail.post,
        author_posts_count: detail.author_posts_count,
        comments: detail.comments,
        can_edit,
    })
}

pub async fn post_create_form(viewer: Viewer, state: web::Data<AppState>) -> Result<HttpResponse> {
    let groups = state.post_service().groups().await?;
    render(&post_form_page(
        viewer,
        None,
        PostFormData::default(),
        FormErrors::new(),
        &groups,
    ))
}

/// Create a post; redirects to the author's profile on success.
pub async fn post_create(
    req: HttpRequest,
    payload: web::Payload,
    viewer: Viewer,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let data = read_post_submission(&req, payload, state.config.media.max_upload_bytes).await?;
    let service = state.post_service();

    match service.create(&viewer, &data).await? {
        Ok(_) => Ok(redirect(&profile_url(&viewer.username))),
        Err(errors) => {
            let groups = service.groups().await?;
            render(&post_form_page(viewer, None, data, errors, &groups))
        }
    }
}

/// Edit form; non-authors are sent back to the post.
pub async fn post_edit_form(
    path: web::Path<i64>,
    viewer: Viewer,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let service = state.post_service();
    let post = service.get(path.into_inner()).await?;
    if !can_edit_post(Some(&viewer), &post) {
        return Ok(redirect(&post_url(post.id)));
    }

    let groups = service.groups().await?;
    let data = PostFormData::from_post(&post);
    render(&post_form_page(
        viewer,
        Some(&post),
        data,
        FormErrors::new(),
        &groups,
    ))
}

/// Save an edit; redirects to the post on success or when the viewer is not the author.
pub async fn post_edit(
    req: HttpRequest,
    payload: web::Payload,
    path: web::Path<i64>,
    viewer: Viewer,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let service = state.post_service();
    let post = service.get(path.into_inner()).await?;
    if !can_edit_post(Some(&viewer), &post) {
        tracing::debug!(post_id = post.id, user = %viewer.username, "edit by non-author ignored");
        return Ok(redirect(&post_url(post.id)));
    }

    let data = read_post_submission(&req, payload, state.config.media.max_upload_bytes).await?;
    match service.update(&viewer, &post, &data).await? {
        Ok(updated) => Ok(redirect(&post_url(updated.id))),
        Err(errors) => {
            let groups = service.groups().await?;
            render(&post_form_page(viewer, Some(&post), data, errors, &groups))
        }
    }
}

fn post_form_page(
    viewer: Viewer,
    editing: Option<&Post>,
    form: PostFormData,
    errors: FormErrors,
    groups: &[Group],
) -> CreatePostTemplate {
    let choices = group_choices(groups, form.group.trim());
    CreatePostTemplate {
        viewer: Some(viewer),
        is_edit: editing.is_some(),
        action: match editing {
            Some(post) => format!("/posts/{}/edit/", post.id),
            None => "/create/".to_string(),
        },
        form,
        errors,
        groups: choices,
        current_image: editing.and_then(|post| post.image_url()),
    }
}
