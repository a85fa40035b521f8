//! Route guards following the session.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use shopfront_core::OrderId;
use shopfront_integration_tests::{TestContext, user};
use shopfront_storefront::forms::LoginForm;
use shopfront_storefront::router::{Admission, Route};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_anonymous_visitor_is_sent_to_login() {
    let ctx = TestContext::new().await;
    let router = ctx.shop.router();
    for route in [
        Route::Products,
        Route::Cart,
        Route::Checkout,
        Route::Orders,
        Route::OrderDetail(OrderId::new(5)),
        Route::Admin,
    ] {
        assert_eq!(
            router.navigate(route),
            Admission::Redirect {
                from: route,
                to: Route::Login
            }
        );
    }
    assert_eq!(router.navigate_path("/signup"), Admission::Render(Route::Signup));
}

#[tokio::test]
async fn test_login_lands_home_and_hides_auth_pages() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/accounts/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "a1",
            "refresh": "r1",
            "email": "ada@example.com",
        })))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cart/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.server)
        .await;

    ctx.shop.router().navigate(Route::Login);
    let form = LoginForm {
        username: "ada".into(),
        password: SecretString::from("secret"),
    };
    ctx.shop.login(&form).await.unwrap();

    assert_eq!(ctx.shop.router().current(), Route::Home);
    assert_eq!(ctx.shop.router().navigate(Route::Login).route(), Route::Home);
    assert_eq!(ctx.shop.router().navigate(Route::Cart).route(), Route::Cart);
}

#[tokio::test]
async fn test_admin_panel_needs_staff() {
    let ctx = TestContext::new().await;
    ctx.login_as(user("customer", false), "t", None);
    assert_eq!(ctx.shop.router().navigate(Route::Admin).route(), Route::Home);

    ctx.login_as(user("root", true), "t", None);
    assert_eq!(
        ctx.shop.router().navigate(Route::Admin),
        Admission::Render(Route::Admin)
    );
}

#[tokio::test]
async fn test_session_cleared_elsewhere_moves_protected_view() {
    let ctx = TestContext::logged_in("t", Some("r")).await;
    let _tasks = ctx.shop.start_background_tasks();
    let mut view = ctx.shop.router().subscribe();
    ctx.shop.router().navigate(Route::Cart);
    view.borrow_and_update();

    ctx.shop.session().clear();

    tokio::time::timeout(Duration::from_secs(2), view.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(*view.borrow(), Route::Login);
}
