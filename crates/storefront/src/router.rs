//! Routes and the guards in front of them.
//!
//! Each [`Route`] has a [`Gate`]. Navigation checks the gate against the
//! current session synchronously; a refused navigation becomes a redirect.
//! The router also re-checks the current route whenever the session
//! changes, so logging out on the cart view lands on the login view.

use std::fmt;
use std::sync::Arc;

use shopfront_core::OrderId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::session::{AuthState, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Route {
    #[default]
    Home,
    Login,
    Signup,
    Products,
    Cart,
    Checkout,
    Orders,
    OrderDetail(OrderId),
    Admin,
}

impl Route {
    /// Resolve a path. Unknown paths resolve to [`Route::Home`].
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim().trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Self::Home,
            ["login"] => Self::Login,
            ["signup"] => Self::Signup,
            ["products"] => Self::Products,
            ["cart"] => Self::Cart,
            ["checkout"] => Self::Checkout,
            ["orders"] => Self::Orders,
            ["orders", id] => id.parse().map_or(Self::Home, Self::OrderDetail),
            ["admin-panel"] => Self::Admin,
            _ => Self::Home,
        }
    }

    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Login => "/login".to_string(),
            Self::Signup => "/signup".to_string(),
            Self::Products => "/products".to_string(),
            Self::Cart => "/cart".to_string(),
            Self::Checkout => "/checkout".to_string(),
            Self::Orders => "/orders".to_string(),
            Self::OrderDetail(id) => format!("/orders/{id}"),
            Self::Admin => "/admin-panel".to_string(),
        }
    }

    #[must_use]
    pub const fn gate(&self) -> Gate {
        match self {
            Self::Home => Gate::Open,
            Self::Login | Self::Signup => Gate::PublicOnly,
            Self::Products | Self::Cart | Self::Checkout | Self::Orders | Self::OrderDetail(_) => {
                Gate::Protected
            }
            Self::Admin => Gate::Staff,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Access rule for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Open,
    /// Requires a session; otherwise go to login.
    Protected,
    /// Requires no session; otherwise go home.
    PublicOnly,
    /// Requires a staff or superuser session.
    Staff,
}

impl Gate {
    /// Where to send the user instead, or `None` if they may pass.
    #[must_use]
    pub fn redirect(&self, auth: &AuthState) -> Option<Route> {
        match (self, auth.is_authenticated()) {
            (Self::Open, _) | (Self::PublicOnly, false) | (Self::Protected, true) => None,
            (Self::Protected | Self::Staff, false) => Some(Route::Login),
            (Self::PublicOnly, true) => Some(Route::Home),
            (Self::Staff, true) => (!auth.is_admin()).then_some(Route::Home),
        }
    }
}

/// Outcome of a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Render(Route),
    Redirect { from: Route, to: Route },
}

impl Admission {
    /// The route that ends up rendered.
    #[must_use]
    pub const fn route(&self) -> Route {
        match self {
            Self::Render(route) | Self::Redirect { to: route, .. } => *route,
        }
    }
}

/// Decide what `requested` renders as for `auth`.
///
/// Redirect targets are Home or Login, which never redirect further for the
/// same session, so one step is enough.
#[must_use]
pub fn admit(requested: Route, auth: &AuthState) -> Admission {
    match requested.gate().redirect(auth) {
        None => Admission::Render(requested),
        Some(to) => Admission::Redirect {
            from: requested,
            to,
        },
    }
}

// =============================================================================
// Router
// =============================================================================

/// Current route plus navigation. Cheap to clone.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    session: SessionStore,
    current: watch::Sender<Route>,
}

impl Router {
    /// Start at `/`.
    #[must_use]
    pub fn new(session: SessionStore) -> Self {
        let (current, _) = watch::channel(Route::Home);
        Self {
            inner: Arc::new(RouterInner { session, current }),
        }
    }

    #[must_use]
    pub fn current(&self) -> Route {
        *self.inner.current.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.inner.current.subscribe()
    }

    /// Navigate to `route`, following the guard.
    pub fn navigate(&self, route: Route) -> Admission {
        let admission = admit(route, &self.inner.session.auth_state());
        if let Admission::Redirect { from, to } = admission {
            debug!(%from, %to, "Navigation redirected");
        }
        self.inner.current.send_replace(admission.route());
        admission
    }

    pub fn navigate_path(&self, path: &str) -> Admission {
        self.navigate(Route::parse(path))
    }

    /// Re-check the current route against the session.
    pub fn reevaluate(&self) -> Admission {
        let current = self.current();
        let admission = admit(current, &self.inner.session.auth_state());
        if let Admission::Redirect { from, to } = admission {
            info!(%from, %to, "Session change moved the current view");
            self.inner.current.send_replace(to);
        }
        admission
    }

    /// Re-evaluate on every session change until aborted.
    #[must_use]
    pub fn spawn_auth_listener(&self) -> JoinHandle<()> {
        let router = self.clone();
        let mut auth = self.inner.session.subscribe();
        tokio::spawn(async move {
            while auth.changed().await.is_ok() {
                auth.borrow_and_update();
                router.reevaluate();
            }
        })
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("current", &self.current()).finish()
    }
}
