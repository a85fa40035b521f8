//! Ephemeral toast notifications.
//!
//! At most one toast is visible. Showing a new one replaces the current
//! one, and each toast expires after the configured duration unless it has
//! already been replaced.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub kind: ToastKind,
}

/// Publishes the current toast. Cheap to clone.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    current: watch::Sender<Option<Toast>>,
    next_id: AtomicU64,
    ttl: Duration,
}

impl Notifier {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            inner: Arc::new(NotifierInner {
                current,
                next_id: AtomicU64::new(1),
                ttl,
            }),
        }
    }

    /// Show a toast, replacing any visible one. Returns its id.
    ///
    /// Expiry needs a Tokio runtime; outside one the toast stays until
    /// replaced or dismissed.
    pub fn show(&self, message: impl Into<String>, kind: ToastKind) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let toast = Toast {
            id,
            message: message.into(),
            kind,
        };
        debug!(id, ?kind, message = %toast.message, "Toast");
        self.inner.current.send_replace(Some(toast));

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let notifier = self.clone();
            let ttl = self.inner.ttl;
            handle.spawn(async move {
                tokio::time::sleep(ttl).await;
                notifier.dismiss(id);
            });
        }
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.show(message, ToastKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.show(message, ToastKind::Error)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.show(message, ToastKind::Info)
    }

    /// Hide toast `id` if it is still the visible one.
    pub fn dismiss(&self, id: u64) {
        self.inner.current.send_if_modified(|current| {
            if current.as_ref().is_some_and(|t| t.id == id) {
                *current = None;
                true
            } else {
                false
            }
        });
    }

    #[must_use]
    pub fn current(&self) -> Option<Toast> {
        self.inner.current.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Toast>> {
        self.inner.current.subscribe()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("current", &*self.inner.current.borrow())
            .field("ttl", &self.inner.ttl)
            .finish()
    }
}
