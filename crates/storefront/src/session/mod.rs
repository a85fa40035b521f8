//! Session store: tokens and the cached user profile.
//!
//! The session lives in a [`SessionStorage`] under three fixed keys
//! (`access`, `refresh`, `user`) and is mirrored in memory. Every change is
//! published as an [`AuthState`] on a `watch` channel so the cart and router
//! can react. [`SessionStore::revalidate`] re-reads storage to pick up
//! changes made by another client sharing the same storage.

mod storage;

pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::types::{SessionTokens, UserProfile};

pub const ACCESS_KEY: &str = "access";
pub const REFRESH_KEY: &str = "refresh";
pub const USER_KEY: &str = "user";

/// Authentication state as observed by subscribers.
///
/// Token rotation does not change this value; only login, logout and
/// session loss do.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticated {
        /// `None` if a token is present but no profile was cached.
        user: Option<UserProfile>,
    },
}

impl AuthState {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub const fn user(&self) -> Option<&UserProfile> {
        match self {
            Self::Authenticated { user } => user.as_ref(),
            Self::Anonymous => None,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(UserProfile::is_admin)
    }
}

#[derive(Default)]
struct Snapshot {
    access: Option<SecretString>,
    refresh: Option<SecretString>,
    user: Option<UserProfile>,
}

impl Snapshot {
    fn auth_state(&self) -> AuthState {
        if self.access.is_some() {
            AuthState::Authenticated {
                user: self.user.clone(),
            }
        } else {
            AuthState::Anonymous
        }
    }

    fn same_tokens(&self, other: &Self) -> bool {
        fn eq(a: Option<&SecretString>, b: Option<&SecretString>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
                (None, None) => true,
                _ => false,
            }
        }
        eq(self.access.as_ref(), other.access.as_ref())
            && eq(self.refresh.as_ref(), other.refresh.as_ref())
    }
}

// =============================================================================
// SessionStore
// =============================================================================

/// Shared handle to the session. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    storage: Arc<dyn SessionStorage>,
    snapshot: RwLock<Snapshot>,
    state: watch::Sender<AuthState>,
}

impl SessionStore {
    /// Open a session over `storage`, loading whatever it already holds.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let snapshot = read_snapshot(storage.as_ref()).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read stored session, starting anonymous");
            Snapshot::default()
        });
        let (state, _) = watch::channel(snapshot.auth_state());

        Self {
            inner: Arc::new(SessionStoreInner {
                storage,
                snapshot: RwLock::new(snapshot),
                state,
            }),
        }
    }

    /// Session backed by process memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Current access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.read().access.clone()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.read().refresh.clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        self.read().user.clone()
    }

    /// A session counts as authenticated whenever an access token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().access.is_some()
    }

    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        self.read().auth_state()
    }

    /// Store a fresh session after login.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be persisted. The
    /// in-memory session is left unchanged in that case.
    pub fn set_session(&self, tokens: SessionTokens, user: UserProfile) -> Result<(), StorageError> {
        let storage = self.inner.storage.as_ref();
        storage.set(ACCESS_KEY, tokens.access.expose_secret())?;
        match &tokens.refresh {
            Some(refresh) => storage.set(REFRESH_KEY, refresh.expose_secret())?,
            None => storage.remove(REFRESH_KEY)?,
        }
        storage.set(USER_KEY, &serde_json::to_string(&user)?)?;

        info!(username = %user.username, "Session started");
        self.replace(Snapshot {
            access: Some(tokens.access),
            refresh: tokens.refresh,
            user: Some(user),
        });
        Ok(())
    }

    /// Store tokens obtained from a refresh. A `None` refresh token keeps
    /// the existing one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the tokens cannot be persisted.
    pub fn update_tokens(
        &self,
        access: SecretString,
        refresh: Option<SecretString>,
    ) -> Result<(), StorageError> {
        let storage = self.inner.storage.as_ref();
        storage.set(ACCESS_KEY, access.expose_secret())?;
        if let Some(refresh) = &refresh {
            storage.set(REFRESH_KEY, refresh.expose_secret())?;
        }

        debug!("Access token rotated");
        let mut snapshot = self.write();
        snapshot.access = Some(access);
        if refresh.is_some() {
            snapshot.refresh = refresh;
        }
        let state = snapshot.auth_state();
        drop(snapshot);
        self.publish(state);
        Ok(())
    }

    /// Destroy the session.
    ///
    /// The in-memory session is always cleared; storage failures are logged.
    pub fn clear(&self) {
        for key in [ACCESS_KEY, REFRESH_KEY, USER_KEY] {
            if let Err(e) = self.inner.storage.remove(key) {
                warn!(error = %e, key, "Failed to remove session key");
            }
        }
        if self.is_authenticated() {
            info!("Session cleared");
        }
        self.replace(Snapshot::default());
    }

    /// Subscribe to authentication changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Re-read storage and publish any change made outside this handle.
    pub fn revalidate(&self) -> AuthState {
        match read_snapshot(self.inner.storage.as_ref()) {
            Ok(fresh) => {
                let changed = {
                    let current = self.read();
                    !current.same_tokens(&fresh) || current.user != fresh.user
                };
                if changed {
                    debug!("Session changed in storage");
                    self.replace(fresh);
                }
            }
            Err(e) => warn!(error = %e, "Session revalidation failed"),
        }
        self.auth_state()
    }

    /// Periodically call [`Self::revalidate`] until the handle is aborted.
    #[must_use]
    pub fn spawn_revalidation(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.revalidate();
            }
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
        self.inner.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Snapshot> {
        self.inner.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, snapshot: Snapshot) {
        let state = snapshot.auth_state();
        *self.write() = snapshot;
        self.publish(state);
    }

    fn publish(&self, state: AuthState) {
        self.inner.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.read();
        f.debug_struct("SessionStore")
            .field("access", &snapshot.access.as_ref().map(|_| "[REDACTED]"))
            .field("refresh", &snapshot.refresh.as_ref().map(|_| "[REDACTED]"))
            .field("user", &snapshot.user)
            .finish()
    }
}

fn read_snapshot(storage: &dyn SessionStorage) -> Result<Snapshot, StorageError> {
    let user = match storage.get(USER_KEY)? {
        Some(json) => match serde_json::from_str::<UserProfile>(&json) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable stored user profile");
                None
            }
        },
        None => None,
    };

    Ok(Snapshot {
        access: storage
            .get(ACCESS_KEY)?
            .filter(|t| !t.is_empty())
            .map(SecretString::from),
        refresh: storage
            .get(REFRESH_KEY)?
            .filter(|t| !t.is_empty())
            .map(SecretString::from),
        user,
    })
}
