/// Account handlers - signup, login and logout
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{http::header, web, HttpResponse};
use serde::Deserialize;

use super::render;
use crate::error::{AppError, Result};
use crate::forms::{safe_next, FormErrors, LoginForm, SignupForm};
use crate::middleware::Viewer;
use crate::security::SessionTokens;
use crate::state::AppState;
use crate::templates::{LoggedOutTemplate, LoginTemplate, SignupTemplate};

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

pub async fn signup_form(viewer: Option<Viewer>) -> Result<HttpResponse> {
    render(&SignupTemplate {
        viewer,
        form: SignupForm::default(),
        errors: FormErrors::new(),
    })
}

/// Register, log the new user in and send them to the home page.
pub async fn signup(
    state: web::Data<AppState>,
    form: web::Form<SignupForm>,
    viewer: Option<Viewer>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    match state.account_service().signup(&form).await? {
        Ok(user) => {
            let token = state.tokens.issue(user.id, &user.username)?;
            Ok(HttpResponse::Found()
                .insert_header((header::LOCATION, "/"))
                .cookie(session_cookie(&state.tokens, token))
                .finish())
        }
        Err(errors) => render(&SignupTemplate {
            viewer,
            form: SignupForm {
                password1: String::new(),
                password2: String::new(),
                ..form
            },
            errors,
        }),
    }
}

pub async fn login_form(
    query: web::Query<NextQuery>,
    viewer: Option<Viewer>,
) -> Result<HttpResponse> {
    render(&LoginTemplate {
        viewer,
        username: String::new(),
        next: safe_next(query.next.as_deref()).unwrap_or_default(),
        errors: FormErrors::new(),
    })
}

/// Check credentials, set the session cookie and follow `next`.
pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<LoginForm>,
    viewer: Option<Viewer>,
) -> Result<HttpResponse> {
    let next = safe_next(form.next.as_deref());
    match state.account_service().login(&form).await? {
        Ok(user) => {
            let token = state.tokens.issue(user.id, &user.username)?;
            Ok(HttpResponse::Found()
                .insert_header((header::LOCATION, next.unwrap_or_else(|| "/".to_string())))
                .cookie(session_cookie(&state.tokens, token))
                .finish())
        }
        Err(errors) => render(&LoginTemplate {
            viewer,
            username: form.username.trim().to_string(),
            next: next.unwrap_or_default(),
            errors,
        }),
    }
}

/// Drop the session cookie and show the goodbye page.
pub async fn logout(state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut cookie = Cookie::build(state.tokens.cookie_name().to_string(), "")
        .path("/")
        .finish();
    cookie.make_removal();

    let mut response = render(&LoggedOutTemplate { viewer: None })?;
    response
        .add_cookie(&cookie)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(response)
}

/// The session cookie holding a signed token.
pub fn session_cookie(tokens: &SessionTokens, token: String) -> Cookie<'static> {
    Cookie::build(tokens.cookie_name().to_string(), token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(tokens.secure_cookies())
        .max_age(CookieDuration::seconds(tokens.ttl().num_seconds()))
        .finish()
}
