//! REST client for the shop API.
//!
//! # Architecture
//!
//! - One async method per remote operation, grouped by area (`auth`,
//!   `catalog`, `cart`, `orders`)
//! - Bearer token from the [`SessionStore`] attached to every non-auth call
//! - Bounded per-request timeout, `X-Request-Id` on every request
//! - In-memory caching via `moka` for catalog responses
//!
//! # Token refresh
//!
//! A 401 on an authenticated call triggers exactly one refresh-and-replay.
//! Refreshes are single-flight: concurrent 401s queue on one lock, and a
//! caller that finds the stored token already differs from the one its
//! request used skips the refresh and replays with the new token. If the
//! refresh fails, or the replay is rejected again, the session is cleared
//! and the call fails with [`ApiError::SessionExpired`].
//!
//! # Example
//!
//! ```rust,ignore
//! use shopfront_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config, session)?;
//! let products = client.list_products().await?;
//! let cart = client.add_to_cart(products[0].id, 1).await?;
//! ```

mod auth;
mod cache;
mod cart;
mod catalog;
pub(crate) mod conversions;
mod orders;
pub(crate) mod wire;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ApiError, FieldErrors};
use crate::session::SessionStore;

use cache::{CacheKey, CacheValue};

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the shop REST API. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    session: SessionStore,
    refresh_lock: tokio::sync::Mutex<()>,
    cache: Cache<CacheKey, CacheValue>,
    health_timeout: Duration,
}

impl ApiClient {
    /// Create a client that reads and rotates tokens in `session`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("shopfront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.api_url.clone(),
                session,
                refresh_lock: tokio::sync::Mutex::new(()),
                cache,
                health_timeout: config.health_timeout,
            }),
        })
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // =========================================================================
    // Transport
    // =========================================================================

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send one request, attaching `token` if given. Never retries.
    #[instrument(
        skip(self, req, token),
        fields(method = %req.method, path = %req.path, request_id = tracing::field::Empty)
    )]
    async fn dispatch(&self, req: &Request, token: Option<&SecretString>) -> Result<Reply, ApiError> {
        let request_id = Uuid::new_v4();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));

        let mut builder = self
            .inner
            .http
            .request(req.method.clone(), self.endpoint(&req.path)?)
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = req.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, timeout = e.is_timeout(), "API request failed");
            ApiError::Network(e)
        })?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), "API response");

        Ok(Reply {
            status,
            path: req.path.clone(),
            body,
        })
    }

    /// Send without credentials (login, signup, refresh, health).
    async fn send_public(&self, req: Request) -> Result<Reply, ApiError> {
        self.dispatch(&req, None).await
    }

    /// Send with the current access token, refreshing once on 401.
    async fn send(&self, req: Request) -> Result<Reply, ApiError> {
        let token = self.inner.session.access_token();
        let reply = self.dispatch(&req, token.as_ref()).await?;
        if reply.status != StatusCode::UNAUTHORIZED {
            return Ok(reply);
        }

        debug!(path = %req.path, "Access token rejected, refreshing");
        let fresh = self.ensure_fresh_token(token.as_ref()).await?;
        let replay = self.dispatch(&req, Some(&fresh)).await?;
        if replay.status == StatusCode::UNAUTHORIZED {
            warn!(path = %req.path, "Request rejected after token refresh, ending session");
            self.inner.session.clear();
            return Err(ApiError::SessionExpired);
        }
        Ok(replay)
    }

    /// Return an access token newer than `stale`, refreshing if nobody else has.
    async fn ensure_fresh_token(&self, stale: Option<&SecretString>) -> Result<SecretString, ApiError> {
        let _guard = self.inner.refresh_lock.lock().await;
        let session = &self.inner.session;

        if let Some(current) = session.access_token() {
            let rotated = stale.is_none_or(|s| s.expose_secret() != current.expose_secret());
            if rotated {
                debug!("Token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        let Some(refresh) = session.refresh_token() else {
            warn!("No refresh token available, ending session");
            session.clear();
            return Err(ApiError::SessionExpired);
        };

        match self.refresh_access_token(&refresh).await {
            Ok(tokens) => {
                let access = tokens.access.clone();
                session.update_tokens(tokens.access, tokens.refresh)?;
                Ok(access)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                session.clear();
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// Drop every cached catalog response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Request / Reply
// =============================================================================

/// A replayable request description.
#[derive(Debug, Clone)]
struct Request {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    timeout: Option<Duration>,
}

impl Request {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            timeout: None,
        }
    }

    fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug)]
struct Reply {
    status: StatusCode,
    path: String,
    body: String,
}

impl Reply {
    /// Decode a success body, or turn the status into an error.
    fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        if !self.status.is_success() {
            return Err(self.into_error());
        }
        let text = if self.body.trim().is_empty() {
            "{}"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(text).map_err(|e| {
            error!(
                error = %e,
                path = %self.path,
                body = %truncate(&self.body, 500),
                "Failed to parse API response"
            );
            ApiError::Decode(e)
        })
    }

    fn into_error(self) -> ApiError {
        let parsed = serde_json::from_str::<serde_json::Value>(&self.body).ok();
        let message = parsed.as_ref().and_then(explicit_message);

        match self.status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden(message.unwrap_or_else(|| {
                "You do not have permission to perform this action.".to_string()
            })),
            StatusCode::NOT_FOUND => ApiError::NotFound(
                message.unwrap_or_else(|| format!("{} was not found", self.path)),
            ),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                if let Some(message) = message {
                    ApiError::Business(message)
                } else if let Some(fields) = parsed.as_ref().and_then(field_errors) {
                    ApiError::Validation(fields)
                } else {
                    ApiError::Http {
                        status: self.status.as_u16(),
                        message: truncate(&self.body, 200),
                    }
                }
            }
            status => {
                error!(
                    status = %status,
                    path = %self.path,
                    body = %truncate(&self.body, 500),
                    "API returned non-success status"
                );
                ApiError::Http {
                    status: status.as_u16(),
                    message: message.unwrap_or_else(|| truncate(&self.body, 200)),
                }
            }
        }
    }
}

/// `error`, `detail` or `message` when the body is an object carrying one.
fn explicit_message(value: &serde_json::Value) -> Option<String> {
    ["error", "detail", "message"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map(str::to_string)
}

/// Interpret a body as field errors: `{field: [msg, ...]}`, `{field: msg}`,
/// a bare string, or a list of strings.
fn field_errors(value: &serde_json::Value) -> Option<FieldErrors> {
    use serde_json::Value;

    fn text(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Array(items) => items.iter().map(text).collect::<Vec<_>>().join(" "),
            other => other.to_string(),
        }
    }

    let mut errors = FieldErrors::new();
    match value {
        Value::Object(map) => {
            for (field, messages) in map {
                let field = if field == "non_field_errors" {
                    FieldErrors::GENERAL
                } else {
                    field.as_str()
                };
                errors.insert(field, text(messages));
            }
        }
        Value::String(_) | Value::Array(_) => errors.insert(FieldErrors::GENERAL, text(value)),
        _ => {}
    }
    (!errors.is_empty()).then_some(errors)
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn reply(status: u16, body: &str) -> Reply {
        Reply {
            status: StatusCode::from_u16(status).unwrap(),
            path: "cart/add/".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_error_mapping_by_status() {
        assert!(matches!(reply(401, "").into_error(), ApiError::Unauthorized));
        assert!(matches!(reply(403, "{}").into_error(), ApiError::Forbidden(_)));
        assert!(matches!(
            reply(404, r#"{"detail":"Not found."}"#).into_error(),
            ApiError::NotFound(m) if m == "Not found."
        ));
        assert!(matches!(
            reply(500, "<html>boom</html>").into_error(),
            ApiError::Http { status: 500, .. }
        ));
    }

    #[test]
    fn test_explicit_error_is_business() {
        let err = reply(400, r#"{"error":"Product out of stock"}"#).into_error();
        assert!(matches!(err, ApiError::Business(m) if m == "Product out of stock"));
    }

    #[test]
    fn test_field_errors_from_drf_payload() {
        let err = reply(
            400,
            r#"{"username":["A user with that username already exists."],"email":"Enter a valid email address.","non_field_errors":["Try again."]}"#,
        )
        .into_error();
        let ApiError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.get("email"), Some("Enter a valid email address."));
        assert_eq!(fields.get(FieldErrors::GENERAL), Some("Try again."));
        assert!(fields.joined().starts_with("Try again."));
    }

    #[test]
    fn test_bare_string_error_becomes_general() {
        let err = reply(400, r#""Signup is closed""#).into_error();
        let ApiError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.get(FieldErrors::GENERAL), Some("Signup is closed"));
    }

    #[test]
    fn test_empty_success_body_decodes_as_empty_object() {
        let parsed: wire::MessageResponse = reply(204, "").json().unwrap();
        assert!(parsed.message.is_none());
    }

    #[test]
    fn test_undecodable_success_body() {
        let result: Result<Vec<wire::WireProduct>, _> = reply(200, "{}").json();
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }
}
