//! Account endpoints: login, signup, token refresh.
//!
//! These calls never carry a bearer token and never enter the refresh path.

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use super::wire::{LoginRequest, LoginResponse, MessageResponse, RefreshRequest, RefreshResponse, SignupRequest};
use super::{ApiClient, Request};
use crate::error::{ApiError, FieldErrors};
use crate::types::{SessionTokens, UserProfile};

/// Detail the backend sends when the username does not exist.
const NO_ACCOUNT_DETAIL: &str = "No active account found with the given credentials";

impl ApiClient {
    /// Log in and store the new session.
    ///
    /// # Errors
    ///
    /// - `ApiError::Business` with a user-facing message for bad credentials
    ///   or an unknown account
    /// - `ApiError::NotFound` if the login endpoint is missing
    /// - `ApiError::UnexpectedResponse` if no access token was issued
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<UserProfile, ApiError> {
        let req = Request::post("accounts/login/").json(&LoginRequest {
            username,
            password: password.expose_secret(),
        })?;
        let reply = self.send_public(req).await?;

        let data: LoginResponse = match reply.status {
            StatusCode::UNAUTHORIZED => {
                let detail = serde_json::from_str::<MessageResponse>(&reply.body)
                    .ok()
                    .and_then(|m| m.detail);
                warn!("Login rejected");
                return Err(ApiError::Business(
                    if detail.as_deref() == Some(NO_ACCOUNT_DETAIL) {
                        "User does not exist. Please sign up first."
                    } else {
                        "Invalid username or password"
                    }
                    .to_string(),
                ));
            }
            StatusCode::NOT_FOUND => {
                return Err(ApiError::NotFound(
                    "Login endpoint not found. Check backend configuration.".to_string(),
                ));
            }
            _ => reply.json()?,
        };

        let Some(access) = data.access else {
            return Err(ApiError::UnexpectedResponse(
                "login response did not include an access token".to_string(),
            ));
        };

        let user = UserProfile {
            username: username.to_string(),
            email: data.email,
            id: data.user_id,
            is_staff: data.is_staff,
            is_superuser: data.is_superuser,
        };
        let tokens = SessionTokens {
            access: SecretString::from(access),
            refresh: data.refresh.map(SecretString::from),
        };
        self.session().set_session(tokens, user.clone())?;
        info!(admin = user.is_admin(), "Logged in");
        Ok(user)
    }

    /// Create an account. Returns the server's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` with per-field messages when the server
    /// rejects the input.
    #[instrument(skip(self, email, password), fields(username = %username))]
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<String, ApiError> {
        let req = Request::post("accounts/signup/").json(&SignupRequest {
            username,
            email,
            password: password.expose_secret(),
        })?;
        let reply = self.send_public(req).await?;

        if reply.status.is_client_error() && reply.status != StatusCode::NOT_FOUND {
            // Field errors take precedence over a generic message here.
            let parsed = serde_json::from_str::<serde_json::Value>(&reply.body).ok();
            if let Some(fields) = parsed.as_ref().and_then(super::field_errors) {
                return Err(ApiError::Validation(fields));
            }
            return Err(ApiError::Validation(FieldErrors::general("Signup failed")));
        }

        let data: MessageResponse = reply.json()?;
        if let Some(error) = data.error {
            return Err(ApiError::Validation(FieldErrors::general(error)));
        }
        info!("Account created");
        Ok(data
            .message
            .unwrap_or_else(|| "Signup successful! Please log in.".to_string()))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Does not touch the session; the caller decides what to store.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is rejected or the call fails.
    #[instrument(skip_all)]
    pub async fn refresh_access_token(&self, refresh: &SecretString) -> Result<SessionTokens, ApiError> {
        let req = Request::post("token/refresh/").json(&RefreshRequest {
            refresh: refresh.expose_secret(),
        })?;
        let data: RefreshResponse = self.send_public(req).await?.json()?;

        Ok(SessionTokens {
            access: SecretString::from(data.access),
            refresh: data.refresh.map(SecretString::from),
        })
    }
}
