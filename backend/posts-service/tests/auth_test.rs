//! HTTP tests: signup, login and logout.

mod common;

use actix_web::{http::StatusCode, test};
use common::*;
use posts_service::app::build_app;
use posts_service::services::AccountService;

#[actix_web::test]
async fn signup_creates_user_logs_in_and_redirects_home() {
    let (state, _media) = test_state();
    let app = test::init_service(build_app(state.clone())).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/auth/signup/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form([
                ("first_name", "Лев"),
                ("last_name", "Толстой"),
                ("username", "leo"),
                ("email", "leo@example.com"),
                ("password1", "War&Peace1869"),
                ("password2", "War&Peace1869"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    assert!(resp
        .response()
        .cookies()
        .any(|c| c.name() == state.tokens.cookie_name() && !c.value().is_empty()));

    let user = state.store.get_user_by_username("leo").await.unwrap().unwrap();
    assert_eq!(user.first_name, "Лев");
    assert_ne!(user.password_hash, "War&Peace1869");
}

#[actix_web::test]
async fn signup_with_mismatched_passwords_rerenders() {
    let (state, _media) = test_state();
    let app = test::init_service(build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form([
                ("username", "leo"),
                ("password1", "War&Peace1869"),
                ("password2", "Anna&Karenina"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(state.store.get_user_by_username("leo").await.unwrap().is_none());
}

#[actix_web::test]
async fn login_sets_session_and_follows_next() {
    let (state, _media) = test_state();
    AccountService::new(state.store.clone())
        .create_user("leo", "War&Peace1869")
        .await
        .unwrap();
    let app = test::init_service(build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/auth/login/?next=/create/")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("/create/"));

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([
                ("username", "leo"),
                ("password", "War&Peace1869"),
                ("next", "/create/"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/create/");

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == state.tokens.cookie_name())
        .expect("session cookie")
        .into_owned();
    assert!(!cookie.value().is_empty());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/create/")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn login_ignores_offsite_next() {
    let (state, _media) = test_state();
    AccountService::new(state.store.clone())
        .create_user("leo", "War&Peace1869")
        .await
        .unwrap();
    let app = test::init_service(build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([
                ("username", "leo"),
                ("password", "War&Peace1869"),
                ("next", "https://evil.example.com/"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
}

#[actix_web::test]
async fn bad_credentials_rerender_login() {
    let (state, _media) = test_state();
    AccountService::new(state.store.clone())
        .create_user("leo", "War&Peace1869")
        .await
        .unwrap();
    let app = test::init_service(build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([("username", "leo"), ("password", "wrong-password")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.response().cookies().next().is_none());
    assert!(body_string(resp)
        .await
        .contains("Please enter a correct username and password."));
}

#[actix_web::test]
async fn logout_clears_session_cookie() {
    let (state, _media) = test_state();
    let user = create_user(&state, "leo").await;
    let app = test::init_service(build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/auth/logout/")
            .cookie(login_cookie(&state, &user))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == state.tokens.cookie_name())
        .expect("removal cookie")
        .into_owned();
    assert!(cookie.value().is_empty());
}

#[actix_web::test]
async fn forged_session_is_anonymous() {
    let (state, _media) = test_state();
    let app = test::init_service(build_app(state.clone())).await;

    let forged = actix_web::cookie::Cookie::new(state.tokens.cookie_name().to_string(), "not-a-token");
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/create/")
            .cookie(forged)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(location(&resp).starts_with("/auth/login/"));
}
