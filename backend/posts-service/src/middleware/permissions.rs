/// Authorization checks for posts
///
/// Only a post's author may edit it. A failed check is not an error page:
/// the edit view sends the viewer back to the post instead.
use crate::middleware::Viewer;
use crate::models::Post;

/// Check if the viewer wrote the post
pub fn is_post_author(viewer: &Viewer, post: &Post) -> bool {
    post.is_authored_by(viewer.id)
}

/// Verify a viewer may edit a post
pub fn can_edit_post(viewer: Option<&Viewer>, post: &Post) -> bool {
    viewer.map(|v| is_post_author(v, post)).unwrap_or(false)
}
