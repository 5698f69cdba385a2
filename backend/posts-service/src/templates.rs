/// Server-rendered pages
///
/// One askama template struct per page. Every page extends `base.html`,
/// whose navigation bar reads `viewer`.
use askama::Template;

use crate::forms::{FormErrors, GroupChoice, PostFormData, SignupForm};
use crate::middleware::Viewer;
use crate::models::{Comment, Group, Post, User};
use crate::pagination::Page;

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub viewer: Option<Viewer>,
    pub page: Page<Post>,
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupListTemplate {
    pub viewer: Option<Viewer>,
    pub group: Group,
    pub page: Page<Post>,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub viewer: Option<Viewer>,
    pub author: User,
    pub page: Page<Post>,
    /// Total posts by the author
    pub count: i64,
    pub following: bool,
    /// Follow controls are hidden from anonymous viewers and on your own profile
    pub show_follow: bool,
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub viewer: Option<Viewer>,
    pub post: Post,
    pub author_posts_count: i64,
    pub comments: Vec<Comment>,
    pub can_edit: bool,
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct CreatePostTemplate {
    pub viewer: Option<Viewer>,
    pub is_edit: bool,
    pub action: String,
    pub form: PostFormData,
    pub errors: FormErrors,
    pub groups: Vec<GroupChoice>,
    pub current_image: Option<String>,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate {
    pub viewer: Option<Viewer>,
    pub page: Page<Post>,
}

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub viewer: Option<Viewer>,
    pub username: String,
    pub next: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate {
    pub viewer: Option<Viewer>,
    pub form: SignupForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "users/logged_out.html")]
pub struct LoggedOutTemplate {
    pub viewer: Option<Viewer>,
}

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundTemplate {
    pub viewer: Option<Viewer>,
    pub path: String,
}

#[derive(Template)]
#[template(path = "core/500.html")]
pub struct ServerErrorTemplate {
    pub viewer: Option<Viewer>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::PageRequest;
    use chrono::Utc;

    fn post(text: &str) -> Post {
        Post {
            id: 5,
            text: text.to_string(),
            pub_date: Utc::now(),
            author_id: 1,
            author_username: "auth".to_string(),
            author_first_name: String::new(),
            author_last_name: String::new(),
            group_id: Some(2),
            group_title: Some("Cats".to_string()),
            group_slug: Some("cats".to_string()),
            image: Some("posts/small.gif".to_string()),
        }
    }

    #[test]
    fn index_renders_posts_escaped() {
        let request = PageRequest::resolve(1, 10, 1);
        let page = IndexTemplate {
            viewer: None,
            page: Page::new(vec![post("<b>hello</b>")], &request),
        }
        .render()
        .unwrap();

        assert!(page.contains("&lt;b&gt;hello&lt;/b&gt;"));
        assert!(page.contains("/group/cats/"));
        assert!(page.contains("/media/posts/small.gif"));
        assert!(page.contains("/posts/5/"));
    }

    #[test]
    fn nav_reflects_viewer() {
        let anonymous = LoggedOutTemplate { viewer: None }.render().unwrap();
        assert!(anonymous.contains("/auth/login/"));

        let logged_in = LoggedOutTemplate {
            viewer: Some(Viewer {
                id: 1,
                username: "leo".to_string(),
            }),
        }
        .render()
        .unwrap();
        assert!(logged_in.contains("/create/"));
        assert!(logged_in.contains("leo"));
    }
}
