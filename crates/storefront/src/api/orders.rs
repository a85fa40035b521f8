//! Order history endpoints.

use shopfront_core::OrderId;
use tracing::instrument;

use super::conversions::{convert_order, convert_orders};
use super::wire::{OrdersPayload, WireOrder};
use super::{ApiClient, Request};
use crate::error::ApiError;
use crate::types::Order;

impl ApiClient {
    /// List the user's orders, newest first as the server sends them.
    ///
    /// Accepts a bare list or one wrapped under `results`, `orders` or
    /// `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, ApiError> {
        let payload: OrdersPayload = self.send(Request::get("orders/")).await?.json()?;
        Ok(convert_orders(payload.into_orders()))
    }

    /// Get one order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order does not exist.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order, ApiError> {
        let wire: WireOrder = self
            .send(Request::get(format!("orders/{id}/")))
            .await?
            .json()?;
        convert_order(wire, Some(id))
            .ok_or_else(|| ApiError::UnexpectedResponse(format!("order {id} has no id")))
    }
}
