//! Shared fixtures for the end-to-end tests.
//!
//! Each test gets its own [`wiremock::MockServer`] standing in for the shop
//! API and a [`Storefront`] pointed at it with in-memory session storage.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{Value, json};
use shopfront_storefront::config::ClientConfig;
use shopfront_storefront::session::MemoryStorage;
use shopfront_storefront::types::{SessionTokens, UserProfile};
use shopfront_storefront::Storefront;
use wiremock::MockServer;

pub struct TestContext {
    pub server: MockServer,
    pub shop: Storefront,
}

impl TestContext {
    /// Fresh mock API and an anonymous storefront.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let config = ClientConfig::for_api_url(&server.uri()).expect("mock server URL is valid");
        let shop = Storefront::new(config, Arc::new(MemoryStorage::new()))
            .expect("storefront builds");
        Self { server, shop }
    }

    /// Like [`Self::new`], with a session already stored.
    pub async fn logged_in(access: &str, refresh: Option<&str>) -> Self {
        let ctx = Self::new().await;
        ctx.login_as(user("ada", false), access, refresh);
        ctx
    }

    pub fn login_as(&self, user: UserProfile, access: &str, refresh: Option<&str>) {
        self.shop
            .session()
            .set_session(
                SessionTokens {
                    access: SecretString::from(access),
                    refresh: refresh.map(SecretString::from),
                },
                user,
            )
            .expect("memory storage never fails");
    }

    /// Number of requests the mock API received for `path`.
    pub async fn hits(&self, path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == path)
            .count()
    }
}

#[must_use]
pub fn user(username: &str, staff: bool) -> UserProfile {
    UserProfile {
        username: username.to_string(),
        email: Some(format!("{username}@example.com")),
        id: None,
        is_staff: staff,
        is_superuser: false,
    }
}

/// A cart line as the backend serializes it.
#[must_use]
pub fn cart_line(product_id: i64, title: &str, price: &str, quantity: i64) -> Value {
    json!({
        "id": product_id * 10,
        "product": {"id": product_id, "title": title, "price": price},
        "quantity": quantity,
        "price": price,
    })
}

#[must_use]
pub fn product_json(id: i64, title: &str, price: &str, category: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": format!("{title} description"),
        "price": price,
        "category": category,
    })
}
