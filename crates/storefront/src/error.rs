//! Error types for API calls, with Sentry helpers.
//!
//! Every remote operation returns `Result<T, ApiError>`. The variants
//! separate transport problems from the server's verdicts so callers can
//! decide what to show: [`ApiError::user_message`] gives the text meant
//! for a notification.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::session::StorageError;

/// Errors that can occur when talking to the shop API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Timeout, DNS failure, refused connection.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 401 on a call that does not go through token refresh.
    #[error("Unauthorized")]
    Unauthorized,

    /// Refresh failed or a replayed request was rejected again. The
    /// session has been cleared.
    #[error("Session expired")]
    SessionExpired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Field-level input errors.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Explicit refusal from the server (`{"error": ...}`, `{"detail": ...}`).
    #[error("{0}")]
    Business(String),

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Success status but the payload was not what the endpoint promises.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Message to show the user, if the error carries one worth showing.
    ///
    /// Transport and decoding errors return `None` so callers can fall back
    /// to an operation-specific message.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Business(msg) | Self::Forbidden(msg) | Self::NotFound(msg) => {
                Some(msg.clone())
            }
            Self::Validation(fields) => Some(fields.joined()),
            Self::SessionExpired => Some("Session expired. Please log in again.".to_string()),
            Self::Unauthorized => Some("Please login first".to_string()),
            Self::Network(e) if e.is_timeout() => {
                Some("The server took too long to respond. Please try again.".to_string())
            }
            Self::Network(_) => Some("Unable to reach the server. Please try again.".to_string()),
            Self::Http { .. }
            | Self::UnexpectedResponse(_)
            | Self::Decode(_)
            | Self::InvalidUrl(_)
            | Self::Storage(_) => None,
        }
    }

    /// Whether the session was lost as part of this failure.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

// =============================================================================
// FieldErrors
// =============================================================================

/// Validation messages keyed by field name.
///
/// Messages that are not tied to a field are stored under [`FieldErrors::GENERAL`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub const GENERAL: &'static str = "general";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message, appending to any existing one for the same field.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let message = message.into();
        self.0
            .entry(field.into())
            .and_modify(|existing| {
                existing.push(' ');
                existing.push_str(&message);
            })
            .or_insert(message);
    }

    #[must_use]
    pub fn general(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(Self::GENERAL, message);
        errors
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// All messages, general first, separated by spaces.
    #[must_use]
    pub fn joined(&self) -> String {
        let general = self.get(Self::GENERAL).into_iter();
        let rest = self
            .0
            .iter()
            .filter(|(k, _)| k.as_str() != Self::GENERAL)
            .map(|(_, v)| v.as_str());
        general.chain(rest).collect::<Vec<_>>().join(" ")
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join("; "))
    }
}

// =============================================================================
// Sentry helpers
// =============================================================================

/// Associate subsequent Sentry events with the logged-in user.
pub fn set_sentry_user(username: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            username: Some(username.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Stop associating events with a user (logout or session loss).
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Record a user action so it shows up in the trail of a later error report.
pub fn add_breadcrumb(category: &str, message: &str) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("product 7".to_string());
        assert_eq!(err.to_string(), "Not found: product 7");

        let err = ApiError::Http {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
    }

    #[test]
    fn test_user_message() {
        assert_eq!(
            ApiError::Business("Out of stock".into()).user_message().as_deref(),
            Some("Out of stock")
        );
        assert!(ApiError::SessionExpired.user_message().is_some());
        assert_eq!(
            ApiError::UnexpectedResponse("x".into()).user_message(),
            None
        );
    }

    #[test]
    fn test_field_errors_join_general_first() {
        let mut errors = FieldErrors::new();
        errors.insert("username", "A user with that username already exists.");
        errors.insert(FieldErrors::GENERAL, "Please fix the errors below.");
        assert_eq!(
            errors.joined(),
            "Please fix the errors below. A user with that username already exists."
        );
    }

    #[test]
    fn test_field_errors_append_same_field() {
        let mut errors = FieldErrors::new();
        errors.insert("password", "This password is too short.");
        errors.insert("password", "This password is too common.");
        assert_eq!(
            errors.get("password"),
            Some("This password is too short. This password is too common.")
        );
    }
}
