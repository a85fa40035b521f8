//! Client context shared by every view.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::api::ApiClient;
use crate::cart::CartStore;
use crate::config::ClientConfig;
use crate::error::{self, ApiError};
use crate::forms::{FormError, LoginForm, SignupForm};
use crate::notify::Notifier;
use crate::router::{Admission, Route, Router};
use crate::session::{SessionStore, SessionStorage};
use crate::types::UserProfile;

/// Login and signup failures, shown inline on the form.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Message to display under the form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Form(e) => e.to_string(),
            Self::Api(e) => e
                .user_message()
                .unwrap_or_else(|| "An error occurred. Please try again.".to_string()),
        }
    }
}

/// Everything a view needs: configuration, session, API client, cart,
/// notifications and navigation.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: ClientConfig,
    session: SessionStore,
    api: ApiClient,
    cart: CartStore,
    notifier: Notifier,
    router: Router,
}

impl Storefront {
    /// Build the context over the given session storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, storage: Arc<dyn SessionStorage>) -> Result<Self, ApiError> {
        let session = SessionStore::new(storage);
        let api = ApiClient::new(&config, session.clone())?;
        let notifier = Notifier::new(config.toast_duration);
        let cart = CartStore::new(api.clone(), notifier.clone());
        let router = Router::new(session.clone());

        if let Some(user) = session.current_user() {
            error::set_sentry_user(&user.username, user.email.as_deref());
        }

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                session,
                api,
                cart,
                notifier,
                router,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Validate the form, log in, load the cart and go home.
    ///
    /// # Errors
    ///
    /// Returns the form or API error; nothing is stored on failure.
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn login(&self, form: &LoginForm) -> Result<UserProfile, AuthError> {
        form.validate()?;
        let user = self.inner.api.login(form.username.trim(), &form.password).await?;

        error::set_sentry_user(&user.username, user.email.as_deref());
        error::add_breadcrumb("auth", "login");

        if let Err(e) = self.inner.cart.fetch().await {
            info!(error = %e, "Cart not loaded after login");
        }
        self.inner.router.navigate(Route::Home);
        Ok(user)
    }

    /// Validate the form and create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns the form or API error.
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn signup(&self, form: &SignupForm) -> Result<String, AuthError> {
        let email = form.validate()?;
        let message = self
            .inner
            .api
            .signup(form.username.trim(), email.as_str(), &form.password)
            .await?;
        error::add_breadcrumb("auth", "signup");
        self.inner.router.navigate(Route::Login);
        Ok(message)
    }

    /// Drop the session and the cart, then re-check the current route.
    pub fn logout(&self) -> Admission {
        self.inner.session.clear();
        self.inner.cart.reset();
        error::clear_sentry_user();
        error::add_breadcrumb("auth", "logout");
        info!("Logged out");
        self.inner.router.reevaluate()
    }

    /// Start the session, cart and router listeners.
    ///
    /// The listeners stop when the returned handle is dropped.
    #[must_use]
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        BackgroundTasks {
            handles: vec![
                self.inner
                    .session
                    .spawn_revalidation(self.inner.config.revalidate_interval),
                self.inner.cart.watch_session(),
                self.inner.router.spawn_auth_listener(),
            ],
        }
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("api_url", &self.inner.config.api_url.as_str())
            .field("session", &self.inner.session)
            .field("router", &self.inner.router)
            .finish_non_exhaustive()
    }
}

/// Running listeners; aborted on drop.
#[derive(Debug)]
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
