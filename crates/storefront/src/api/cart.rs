//! Cart endpoints.
//!
//! Mutations return `Some(items)` when the server sent back the canonical
//! cart, `None` when the caller has to refetch it.

use shopfront_core::ProductId;
use tracing::instrument;

use super::conversions::convert_cart;
use super::wire::{CartLineRequest, CartMutationResponse, CartPayload, CheckoutResponse};
use super::{ApiClient, Request};
use crate::error::ApiError;
use crate::types::{CartItem, CheckoutReceipt};

impl ApiClient {
    /// Fetch the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Vec<CartItem>, ApiError> {
        let payload: CartPayload = self.send(Request::get("cart/")).await?.json()?;
        Ok(match payload {
            CartPayload::Wrapped { items } | CartPayload::Bare(items) => convert_cart(items),
        })
    }

    /// Add `quantity` units of a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the server refuses.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<Vec<CartItem>>, ApiError> {
        let req = Request::post("cart/add/").json(&CartLineRequest {
            product_id,
            quantity: Some(quantity),
        })?;
        self.mutate(req).await
    }

    /// Remove a product's line entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the server refuses.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_cart(&self, product_id: ProductId) -> Result<Option<Vec<CartItem>>, ApiError> {
        let req = Request::post("cart/remove/").json(&CartLineRequest {
            product_id,
            quantity: None,
        })?;
        self.mutate(req).await
    }

    /// Decrease a line's quantity by one.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the server refuses.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn decrease_quantity(&self, product_id: ProductId) -> Result<Option<Vec<CartItem>>, ApiError> {
        let req = Request::post("cart/decrease/").json(&CartLineRequest {
            product_id,
            quantity: None,
        })?;
        self.mutate(req).await
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the server refuses.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<Vec<CartItem>>, ApiError> {
        let req = Request::put("cart/update/").json(&CartLineRequest {
            product_id,
            quantity: Some(quantity),
        })?;
        self.mutate(req).await
    }

    /// Empty the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the server refuses.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<Option<Vec<CartItem>>, ApiError> {
        self.mutate(Request::post("cart/clear/")).await
    }

    /// Turn the server cart into an order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Business` if the server reports a failed checkout.
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> Result<CheckoutReceipt, ApiError> {
        let data: CheckoutResponse = self.send(Request::post("cart/checkout/")).await?.json()?;

        if let Some(error) = data.error {
            return Err(ApiError::Business(error));
        }
        match (data.success, data.message) {
            (Some(false), None) | (None, None) => Err(ApiError::Business("Checkout failed".to_string())),
            (_, message) => Ok(CheckoutReceipt {
                message: message.unwrap_or_else(|| "Order placed successfully!".to_string()),
                order_id: data.order_id,
            }),
        }
    }

    async fn mutate(&self, req: Request) -> Result<Option<Vec<CartItem>>, ApiError> {
        let data: CartMutationResponse = self.send(req).await?.json()?;
        if let Some(error) = data.error {
            return Err(ApiError::Business(error));
        }
        Ok(data.items.map(convert_cart))
    }
}
