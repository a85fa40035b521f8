//! Domain types returned by the API client.
//!
//! These are the normalized shapes the rest of the crate works with. The
//! raw, loosely-typed server payloads live in `api::wire` and are converted
//! in `api::conversions`.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use shopfront_core::{OrderId, OrderStatus, Price, ProductId, UserId};

// =============================================================================
// Catalog
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub category: String,
    pub image: Option<String>,
}

// =============================================================================
// Cart
// =============================================================================

/// One line of the cart, as last reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: ProductId,
    pub title: String,
    pub image: Option<String>,
    /// Always at least 1.
    pub quantity: u32,
    /// Price snapshot for one unit.
    pub unit_price: Price,
}

impl CartItem {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Server acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub message: String,
    pub order_id: Option<OrderId>,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: Option<ProductId>,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Price,
}

impl OrderLine {
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// A past order, read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<OrderLine>,
    pub total: Price,
    pub created_at: Option<DateTime<Utc>>,
    pub status: OrderStatus,
}

impl Order {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|l| u64::from(l.quantity)).sum()
    }
}

// =============================================================================
// Session
// =============================================================================

/// Profile of the logged-in user, cached in session storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

impl UserProfile {
    /// Staff and superusers may use the admin panel.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

/// Access/refresh token pair issued by the auth endpoints.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access: SecretString,
    /// Absent when the server does not rotate refresh tokens.
    pub refresh: Option<SecretString>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_item_subtotal() {
        let item = CartItem {
            product_id: ProductId::new(1),
            title: "Kettle".into(),
            image: None,
            quantity: 3,
            unit_price: Price::from_minor(1_250),
        };
        assert_eq!(item.subtotal(), Price::from_minor(3_750));
    }

    #[test]
    fn test_user_profile_is_admin() {
        let mut user = UserProfile {
            username: "ada".into(),
            email: None,
            id: None,
            is_staff: false,
            is_superuser: false,
        };
        assert!(!user.is_admin());
        user.is_superuser = true;
        assert!(user.is_admin());
    }

    #[test]
    fn test_user_profile_tolerates_missing_flags() {
        let user: UserProfile = serde_json::from_str(r#"{"username":"ada"}"#).unwrap();
        assert!(!user.is_staff);
        assert_eq!(user.email, None);
    }
}
