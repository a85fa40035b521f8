//! Raw JSON payloads as the shop API sends them.
//!
//! The backend is lenient about shapes: lists may be bare or wrapped,
//! foreign keys may be ids or nested objects, prices may be numbers or
//! strings. Everything here is permissive; `conversions` decides what a
//! payload means.

use serde::{Deserialize, Serialize};
use shopfront_core::{OrderId, Price, ProductId, UserId};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SignupRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CartLineRequest {
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access: Option<String>,
    pub refresh: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    pub refresh: Option<String>,
}

/// `{message}`, `{error}` or `{detail}`; used by several endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct MessageResponse {
    pub message: Option<String>,
    pub error: Option<String>,
    pub detail: Option<String>,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WireProduct {
    pub id: ProductId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Product list, bare or paginated.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProductsPayload {
    Bare(Vec<WireProduct>),
    Results { results: Vec<WireProduct> },
}

// =============================================================================
// Cart
// =============================================================================

/// A product reference inside a cart or order line.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Nested(Box<NestedProduct>),
    Id(ProductId),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NestedProduct {
    pub id: Option<ProductId>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub price: Option<Price>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCartItem {
    pub id: Option<i64>,
    pub product: Option<ProductRef>,
    pub product_id: Option<ProductId>,
    pub title: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    pub price: Option<Price>,
}

/// `GET /cart/` answers with either `{items: [...]}` or a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CartPayload {
    Wrapped { items: Vec<WireCartItem> },
    Bare(Vec<WireCartItem>),
}

/// Reply to a cart mutation. `items` is the canonical cart when present.
#[derive(Debug, Default, Deserialize)]
pub struct CartMutationResponse {
    pub items: Option<Vec<WireCartItem>>,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub order_id: Option<OrderId>,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WireOrderLine {
    pub product: Option<ProductRef>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<Price>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireOrder {
    pub id: Option<OrderId>,
    pub order_id: Option<OrderId>,
    pub items: Option<Vec<WireOrderLine>>,
    pub products: Option<Vec<WireOrderLine>>,
    pub total: Option<Price>,
    pub total_price: Option<Price>,
    pub created_at: Option<String>,
    pub order_date: Option<String>,
    pub completed: Option<bool>,
    pub status: Option<String>,
    pub order_status: Option<String>,
}

/// Order history comes bare or wrapped under one of several keys.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OrdersPayload {
    Bare(Vec<WireOrder>),
    Results { results: Vec<WireOrder> },
    Orders { orders: Vec<WireOrder> },
    Data { data: Vec<WireOrder> },
}

impl OrdersPayload {
    pub fn into_orders(self) -> Vec<WireOrder> {
        match self {
            Self::Bare(orders)
            | Self::Results { results: orders }
            | Self::Orders { orders }
            | Self::Data { data: orders } => orders,
        }
    }
}
