//! Shopfront storefront client library.
//!
//! Talks to the shop's REST API and keeps the client-side state a shopping
//! front end needs: the persisted login session, a mirror of the server
//! cart, transient notifications, and route guards.
//!
//! [`state::Storefront`] wires these together; the CLI and the integration
//! tests both drive the library through it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod forms;
pub mod notify;
pub mod orders;
pub mod router;
pub mod session;
pub mod state;
pub mod types;

pub use api::ApiClient;
pub use cart::CartStore;
pub use config::ClientConfig;
pub use error::ApiError;
pub use session::SessionStore;
pub use state::Storefront;
