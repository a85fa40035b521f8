//! Command implementations.
//!
//! Each command enters the route of the view it stands in for before doing
//! anything, so guards behave exactly as they do for a graphical front end.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

use shopfront_storefront::cart::CartError;
use shopfront_storefront::config::ConfigError;
use shopfront_storefront::error::ApiError;
use shopfront_storefront::forms::FormError;
use shopfront_storefront::router::{Admission, Route};
use shopfront_storefront::state::AuthError;
use shopfront_storefront::Storefront;
use thiserror::Error;

/// Errors surfaced to the terminal.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error("{from} is not available; redirected to {to}")]
    Redirected { from: Route, to: Route },
}

impl CliError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) | Self::Cart(CartError::Api(e)) => {
                e.user_message().unwrap_or_else(|| e.to_string())
            }
            Self::Auth(e) => e.user_message(),
            Self::Redirected { from, to } if *to == Route::Login => {
                format!("{from} requires login. Run `shopfront login` first.")
            }
            other => other.to_string(),
        }
    }
}

/// Enter `route` through its guard.
pub(crate) fn enter(shop: &Storefront, route: Route) -> Result<(), CliError> {
    match shop.router().navigate(route) {
        Admission::Render(_) => Ok(()),
        Admission::Redirect { from, to } => Err(CliError::Redirected { from, to }),
    }
}
