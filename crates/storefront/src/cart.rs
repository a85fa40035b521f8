//! Cart store: a local mirror of the server cart.
//!
//! # Consistency
//!
//! Local state is a cache of server truth. Every successful mutation
//! replaces the item list with the server's canonical cart (or refetches it
//! when the reply has none); every failed mutation shows an error toast and
//! refetches, keeping the prior items if that fails too. `clear` is the one
//! optimistic operation: the cart empties immediately and is restored if
//! the server refuses. Every round trip publishes [`CartPhase::Loading`]
//! first and [`CartPhase::Ready`] when it settles.
//!
//! # Ordering and cancellation
//!
//! Operations queue on a fair `tokio::sync::Mutex`, so they reach the
//! server one at a time in call order. Each operation captures the cart
//! epoch when it starts; [`CartStore::reset`] bumps the epoch, and results
//! from an older epoch are discarded instead of written into live state.
//!
//! Totals are never stored: [`CartState::count`] and [`CartState::total`]
//! are computed from the item list on each read.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use shopfront_core::{Price, ProductId};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::notify::{Notifier, ToastKind};
use crate::session::{AuthState, SessionStore};
use crate::types::{CartItem, CheckoutReceipt, Product};

pub const LOGIN_REQUIRED: &str = "Please login first";
pub const ORDER_PLACED: &str = "Order placed successfully!";

/// Errors returned by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Please login first")]
    NotAuthenticated,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Your cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Api(#[from] ApiError),
}

// =============================================================================
// CartState
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartPhase {
    #[default]
    Uninitialized,
    Loading,
    Ready,
}

/// Snapshot of the cart as published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartState {
    pub phase: CartPhase,
    pub items: Vec<CartItem>,
}

impl CartState {
    /// Number of units across all lines.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartItem::subtotal).sum()
    }

    /// A loaded cart with no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// Shared cart state plus the operations that change it. Cheap to clone.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    api: ApiClient,
    notifier: Notifier,
    state: watch::Sender<CartState>,
    writer: tokio::sync::Mutex<()>,
    epoch: AtomicU64,
}

impl CartStore {
    #[must_use]
    pub fn new(api: ApiClient, notifier: Notifier) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            inner: Arc::new(CartStoreInner {
                api,
                notifier,
                state,
                writer: tokio::sync::Mutex::new(()),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn cart_count(&self) -> u64 {
        self.inner.state.borrow().count()
    }

    #[must_use]
    pub fn total_price(&self) -> Price {
        self.inner.state.borrow().total()
    }

    fn session(&self) -> &SessionStore {
        self.inner.api.session()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Load the cart from the server.
    ///
    /// Without a session the cart becomes empty and no request is made.
    ///
    /// # Errors
    ///
    /// Returns the API error if loading fails; prior items are kept.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<(), CartError> {
        if !self.session().is_authenticated() {
            self.reset_to(CartPhase::Ready);
            return Ok(());
        }
        let _writer = self.inner.writer.lock().await;
        let epoch = self.epoch();
        self.refetch_locked(epoch).await.map_err(Into::into)
    }

    /// Add one unit of `product`.
    ///
    /// # Errors
    ///
    /// - `CartError::NotAuthenticated` without a session (toast shown, no request)
    /// - `CartError::Api` if the server refuses
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: &Product) -> Result<(), CartError> {
        self.require_session()?;
        let (id, title) = (product.id, product.title.clone());
        self.mutate(
            move |api| async move { api.add_to_cart(id, 1).await },
            Some(Feedback::success(format!("{title} added to cart"))),
            "Failed to add item to cart",
        )
        .await
    }

    /// Remove a line entirely.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add`].
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: ProductId) -> Result<(), CartError> {
        self.require_session()?;
        self.mutate(
            move |api| async move { api.remove_from_cart(product_id).await },
            Some(Feedback::info("Item removed from cart")),
            "Failed to remove item",
        )
        .await
    }

    /// Decrease a line by one unit. A line at quantity 1, or a product not
    /// in the cart, is left alone and no request is made.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add`].
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn decrease(&self, product_id: ProductId) -> Result<(), CartError> {
        self.require_session()?;
        let _writer = self.inner.writer.lock().await;

        let quantity = self.inner.state.borrow().line(product_id).map(|l| l.quantity);
        if quantity.is_none_or(|q| q <= 1) {
            debug!(?quantity, "Decrease ignored");
            return Ok(());
        }
        self.mutate_locked(
            move |api| async move { api.decrease_quantity(product_id).await },
            None,
            "Failed to update quantity",
        )
        .await
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// `CartError::InvalidQuantity` for zero, otherwise same as [`Self::add`].
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn set_quantity(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        self.require_session()?;
        self.mutate(
            move |api| async move { api.update_quantity(product_id, quantity).await },
            None,
            "Failed to update quantity",
        )
        .await
    }

    /// Empty the cart, locally at once and then on the server. If the
    /// server refuses, the previous items come back.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add`].
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), CartError> {
        self.require_session()?;
        let _writer = self.inner.writer.lock().await;
        let epoch = self.epoch();

        let previous = self.inner.state.borrow().items.clone();
        self.publish(epoch, CartPhase::Loading, Some(Vec::new()));

        match self.inner.api.clear_cart().await {
            Ok(items) => {
                // An empty-bodied reply means the server cart is empty too.
                self.publish(epoch, CartPhase::Ready, Some(items.unwrap_or_default()));
                self.inner.notifier.info("Cart cleared");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Clearing cart failed, restoring items");
                self.report(&e, "Failed to clear cart");
                if e.is_session_expired() {
                    self.reset();
                } else {
                    self.publish(epoch, CartPhase::Ready, Some(previous));
                }
                Err(e.into())
            }
        }
    }

    /// Place an order for the current cart.
    ///
    /// # Errors
    ///
    /// - `CartError::NotAuthenticated` without a session
    /// - `CartError::EmptyCart` if there is nothing to buy
    /// - `CartError::Api` if the server refuses; the cart is left untouched
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> Result<CheckoutReceipt, CartError> {
        self.require_session()?;
        let _writer = self.inner.writer.lock().await;
        let epoch = self.epoch();

        if self.inner.state.borrow().is_empty() {
            self.inner.notifier.error(CartError::EmptyCart.to_string());
            return Err(CartError::EmptyCart);
        }
        self.publish(epoch, CartPhase::Loading, None);

        match self.inner.api.checkout().await {
            Ok(receipt) => {
                info!(order_id = ?receipt.order_id, "Order placed");
                self.publish(epoch, CartPhase::Ready, Some(Vec::new()));
                self.inner.notifier.success(ORDER_PLACED);
                Ok(receipt)
            }
            Err(e) => {
                warn!(error = %e, "Checkout failed");
                self.report(&e, "Checkout failed");
                if e.is_session_expired() {
                    self.reset();
                } else {
                    self.publish(epoch, CartPhase::Ready, None);
                }
                Err(e.into())
            }
        }
    }

    /// Forget the cart (logout or session loss). In-flight operations
    /// finish but their results are discarded.
    pub fn reset(&self) {
        self.reset_to(CartPhase::Uninitialized);
    }

    /// Follow the session: reset on logout, load on login.
    #[must_use]
    pub fn watch_session(&self) -> JoinHandle<()> {
        let store = self.clone();
        let mut auth = self.session().subscribe();
        tokio::spawn(async move {
            while auth.changed().await.is_ok() {
                let state = auth.borrow_and_update().clone();
                match state {
                    AuthState::Anonymous => store.reset(),
                    AuthState::Authenticated { .. } => {
                        if let Err(e) = store.fetch().await {
                            warn!(error = %e, "Cart refresh after login failed");
                        }
                    }
                }
            }
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn reset_to(&self, phase: CartPhase) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_replace(CartState {
            phase,
            items: Vec::new(),
        });
    }

    fn require_session(&self) -> Result<(), CartError> {
        if self.session().is_authenticated() {
            Ok(())
        } else {
            self.inner.notifier.error(LOGIN_REQUIRED);
            Err(CartError::NotAuthenticated)
        }
    }

    /// Publish a new phase and optionally new items, unless `epoch` is stale.
    fn publish(&self, epoch: u64, phase: CartPhase, items: Option<Vec<CartItem>>) -> bool {
        if epoch != self.epoch() {
            debug!("Discarding cart update from an abandoned operation");
            return false;
        }
        self.inner.state.send_modify(|state| {
            state.phase = phase;
            if let Some(items) = items {
                state.items = items;
            }
        });
        true
    }

    fn report(&self, error: &ApiError, fallback: &str) {
        let message = error.user_message().unwrap_or_else(|| fallback.to_string());
        self.inner.notifier.error(message);
    }

    /// Load the server cart while holding the writer lock.
    async fn refetch_locked(&self, epoch: u64) -> Result<(), ApiError> {
        self.publish(epoch, CartPhase::Loading, None);
        match self.inner.api.get_cart().await {
            Ok(items) => {
                self.publish(epoch, CartPhase::Ready, Some(items));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to load cart");
                if e.is_session_expired() {
                    self.reset();
                } else {
                    self.publish(epoch, CartPhase::Ready, None);
                }
                Err(e)
            }
        }
    }

    async fn mutate<F, Fut>(&self, op: F, feedback: Option<Feedback>, fallback: &str) -> Result<(), CartError>
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = Result<Option<Vec<CartItem>>, ApiError>>,
    {
        let _writer = self.inner.writer.lock().await;
        self.mutate_locked(op, feedback, fallback).await
    }

    async fn mutate_locked<F, Fut>(&self, op: F, feedback: Option<Feedback>, fallback: &str) -> Result<(), CartError>
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = Result<Option<Vec<CartItem>>, ApiError>>,
    {
        let epoch = self.epoch();
        self.publish(epoch, CartPhase::Loading, None);

        match op(self.inner.api.clone()).await {
            Ok(Some(items)) => {
                self.publish(epoch, CartPhase::Ready, Some(items));
            }
            Ok(None) => {
                debug!("Mutation reply had no items, refetching");
                if let Err(e) = self.refetch_locked(epoch).await {
                    debug!(error = %e, "Refetch after mutation failed");
                }
            }
            Err(e) => {
                self.report(&e, fallback);
                if e.is_session_expired() {
                    self.reset();
                } else if let Err(refetch) = self.refetch_locked(epoch).await {
                    debug!(error = %refetch, "Refetch after failed mutation failed");
                }
                return Err(e.into());
            }
        }

        if let Some(feedback) = feedback {
            self.inner.notifier.show(feedback.message, feedback.kind);
        }
        Ok(())
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &*self.inner.state.borrow())
            .field("epoch", &self.epoch())
            .finish()
    }
}

struct Feedback {
    message: String,
    kind: ToastKind,
}

impl Feedback {
    fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Success,
        }
    }

    fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Info,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use serde_json::json;
    use shopfront_core::OrderId;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    use crate::config::ClientConfig;
    use crate::types::{SessionTokens, UserProfile};

    fn item(id: i64, price_minor: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            title: format!("Item {id}"),
            image: None,
            quantity,
            unit_price: Price::from_minor(price_minor),
        }
    }

    fn product(id: i64) -> Product {
        Product {
            id: ProductId::new(id),
            title: "Desk Lamp".to_string(),
            description: String::new(),
            price: Price::from_minor(4_000),
            category: "Lighting".to_string(),
            image: None,
        }
    }

    async fn store(server: &MockServer, logged_in: bool) -> (CartStore, Notifier) {
        let session = SessionStore::in_memory();
        if logged_in {
            session
                .set_session(
                    SessionTokens {
                        access: SecretString::from("token"),
                        refresh: Some(SecretString::from("refresh")),
                    },
                    UserProfile {
                        username: "ada".into(),
                        email: None,
                        id: None,
                        is_staff: false,
                        is_superuser: false,
                    },
                )
                .unwrap();
        }
        let config = ClientConfig::for_api_url(&server.uri()).unwrap();
        let api = ApiClient::new(&config, session).unwrap();
        let notifier = Notifier::new(Duration::from_secs(3));
        (CartStore::new(api, notifier.clone()), notifier)
    }

    #[test]
    fn test_state_totals_are_derived() {
        let state = CartState {
            phase: CartPhase::Ready,
            items: vec![item(1, 10_000, 2), item(2, 2_550, 1)],
        };
        assert_eq!(state.count(), 3);
        assert_eq!(state.total(), Price::from_minor(22_550));
        assert!(CartState::default().total().is_zero());
    }

    #[tokio::test]
    async fn test_fetch_without_session_is_empty_and_offline() {
        let server = MockServer::start().await;
        let (cart, _) = store(&server, false).await;

        cart.fetch().await.unwrap();
        assert_eq!(cart.state().phase, CartPhase::Ready);
        assert!(cart.state().is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_replaces_items_with_server_cart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/add/"))
            .and(header("Authorization", "Bearer token"))
            .and(body_json(json!({"product_id": 7, "quantity": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"product": {"id": 7, "title": "Desk Lamp", "price": "40.00"}, "quantity": 1}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (cart, notifier) = store(&server, true).await;
        cart.add(&product(7)).await.unwrap();

        assert_eq!(cart.cart_count(), 1);
        assert_eq!(cart.total_price(), Price::from_minor(4_000));
        let toast = notifier.current().unwrap();
        assert_eq!(toast.message, "Desk Lamp added to cart");
        assert_eq!(toast.kind, ToastKind::Success);
    }

    #[tokio::test]
    async fn test_add_without_items_in_reply_refetches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/add/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "added"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cart/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"product_id": 7, "title": "Desk Lamp", "quantity": 3, "price": 40}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let (cart, _) = store(&server, true).await;
        cart.add(&product(7)).await.unwrap();
        assert_eq!(cart.cart_count(), 3);
        assert_eq!(cart.state().phase, CartPhase::Ready);
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_items_and_shows_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cart/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"product_id": 1, "quantity": 2, "price": "100"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cart/remove/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (cart, notifier) = store(&server, true).await;
        cart.fetch().await.unwrap();
        let err = cart.remove(ProductId::new(1)).await.unwrap_err();

        assert!(matches!(err, CartError::Api(ApiError::Http { status: 500, .. })));
        assert_eq!(cart.cart_count(), 2);
        let toast = notifier.current().unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.message, "Failed to remove item");
    }

    #[tokio::test]
    async fn test_decrease_at_one_is_a_local_noop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cart/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"product_id": 1, "quantity": 1, "price": "100"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cart/decrease/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(0)
            .mount(&server)
            .await;

        let (cart, _) = store(&server, true).await;
        cart.fetch().await.unwrap();
        cart.decrease(ProductId::new(1)).await.unwrap();
        cart.decrease(ProductId::new(99)).await.unwrap();
        assert_eq!(cart.cart_count(), 1);
    }

    #[tokio::test]
    async fn test_set_quantity_rejects_zero() {
        let server = MockServer::start().await;
        let (cart, _) = store(&server, true).await;
        assert!(matches!(
            cart.set_quantity(ProductId::new(1), 0).await,
            Err(CartError::InvalidQuantity)
        ));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_rolls_back_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cart/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"product_id": 1, "quantity": 2, "price": "5"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cart/clear/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Cart is locked"})))
            .mount(&server)
            .await;

        let (cart, notifier) = store(&server, true).await;
        cart.fetch().await.unwrap();
        let err = cart.clear().await.unwrap_err();

        assert!(matches!(err, CartError::Api(ApiError::Business(_))));
        assert_eq!(cart.cart_count(), 2);
        assert_eq!(notifier.current().unwrap().message, "Cart is locked");
    }

    #[tokio::test]
    async fn test_clear_success_empties_cart() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cart/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"product_id": 1, "quantity": 2, "price": "5"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cart/clear/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Cart cleared"})))
            .expect(1)
            .mount(&server)
            .await;

        let (cart, notifier) = store(&server, true).await;
        cart.fetch().await.unwrap();
        cart.clear().await.unwrap();

        assert!(cart.state().is_empty());
        assert_eq!(notifier.current().unwrap().kind, ToastKind::Info);
    }

    #[tokio::test]
    async fn test_checkout_publishes_loading_then_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cart/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"product_id": 1, "quantity": 1, "price": "250"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cart/checkout/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "order_id": 12}))
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;

        let (cart, _) = store(&server, true).await;
        cart.fetch().await.unwrap();
        let mut states = cart.subscribe();
        states.borrow_and_update();

        let pending = {
            let cart = cart.clone();
            tokio::spawn(async move { cart.checkout().await })
        };

        states.changed().await.unwrap();
        let loading = states.borrow_and_update().clone();
        assert_eq!(loading.phase, CartPhase::Loading);
        assert_eq!(loading.count(), 1);

        states.changed().await.unwrap();
        let ready = states.borrow_and_update().clone();
        assert_eq!(ready.phase, CartPhase::Ready);
        assert!(ready.is_empty());

        let receipt = pending.await.unwrap().unwrap();
        assert_eq!(receipt.order_id, Some(OrderId::new(12)));
    }

    #[tokio::test]
    async fn test_failed_checkout_returns_to_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cart/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"product_id": 1, "quantity": 2, "price": "250"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cart/checkout/"))
            .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(100)))
            .mount(&server)
            .await;

        let (cart, _) = store(&server, true).await;
        cart.fetch().await.unwrap();
        let mut states = cart.subscribe();
        states.borrow_and_update();

        let pending = {
            let cart = cart.clone();
            tokio::spawn(async move { cart.checkout().await })
        };

        states.changed().await.unwrap();
        assert_eq!(states.borrow_and_update().phase, CartPhase::Loading);

        assert!(pending.await.unwrap().is_err());
        let state = cart.state();
        assert_eq!(state.phase, CartPhase::Ready);
        assert_eq!(state.count(), 2);
    }

    #[tokio::test]
    async fn test_clear_is_loading_with_empty_items_until_reply() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cart/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"product_id": 1, "quantity": 2, "price": "5"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cart/clear/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": []}))
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;

        let (cart, _) = store(&server, true).await;
        cart.fetch().await.unwrap();
        let mut states = cart.subscribe();
        states.borrow_and_update();

        let pending = {
            let cart = cart.clone();
            tokio::spawn(async move { cart.clear().await })
        };

        states.changed().await.unwrap();
        let loading = states.borrow_and_update().clone();
        assert_eq!(loading.phase, CartPhase::Loading);
        assert!(loading.is_empty());

        pending.await.unwrap().unwrap();
        assert_eq!(cart.state().phase, CartPhase::Ready);
        assert!(cart.state().is_empty());
    }

    #[tokio::test]
    async fn test_extreme_quantities_and_prices_from_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cart/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"product_id": 1, "quantity": 4_294_967_295_u32, "price": "1"},
                    {"product_id": 2, "quantity": 1, "price": "1"},
                    {"product_id": 3, "quantity": 2, "price": "79228162514264337593543950335"}
                ]
            })))
            .mount(&server)
            .await;

        let (cart, _) = store(&server, true).await;
        cart.fetch().await.unwrap();

        assert_eq!(cart.state().items.len(), 2);
        assert!(cart.state().line(ProductId::new(3)).is_none());
        assert_eq!(cart.cart_count(), 4_294_967_296);
        assert_eq!(cart.total_price(), "4294967296".parse::<Price>().unwrap());
    }

    #[test]
    fn test_total_saturates_instead_of_panicking() {
        let max: Price = "79228162514264337593543950335".parse().unwrap();
        let mut huge = item(1, 0, 1);
        huge.unit_price = max;
        let state = CartState {
            phase: CartPhase::Ready,
            items: vec![huge.clone(), huge],
        };
        assert_eq!(state.total(), max);
        assert_eq!(state.count(), 2);
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_is_refused_locally() {
        let server = MockServer::start().await;
        let (cart, _) = store(&server, true).await;
        assert!(matches!(cart.checkout().await, Err(CartError::EmptyCart)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_failure_leaves_cart() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cart/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"product_id": 1, "quantity": 1, "price": "250"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cart/checkout/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "Payment declined"})))
            .mount(&server)
            .await;

        let (cart, notifier) = store(&server, true).await;
        cart.fetch().await.unwrap();
        assert!(cart.checkout().await.is_err());
        assert_eq!(cart.cart_count(), 1);
        assert_eq!(notifier.current().unwrap().message, "Payment declined");
    }

    #[tokio::test]
    async fn test_reset_discards_late_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cart/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": [{"product_id": 1, "quantity": 5}]}))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let (cart, _) = store(&server, true).await;
        let pending = {
            let cart = cart.clone();
            tokio::spawn(async move { cart.fetch().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        cart.reset();

        pending.await.unwrap().unwrap();
        assert_eq!(cart.state().phase, CartPhase::Uninitialized);
        assert_eq!(cart.cart_count(), 0);
    }
}
