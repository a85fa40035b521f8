//! Product endpoints. Products are cached for the configured TTL.

use std::sync::Arc;

use shopfront_core::ProductId;
use tracing::{debug, info, instrument};

use super::cache::{CacheKey, CacheValue};
use super::conversions::{convert_product, convert_products};
use super::wire::{MessageResponse, ProductsPayload, WireProduct};
use super::{ApiClient, Request};
use crate::error::ApiError;
use crate::types::Product;

impl ApiClient {
    /// List the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>, ApiError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::Products).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let payload: ProductsPayload = self.send(Request::get("products/")).await?.json()?;
        let wire = match payload {
            ProductsPayload::Bare(p) | ProductsPayload::Results { results: p } => p,
        };
        let products = Arc::new(convert_products(wire));

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Get one product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let wire: WireProduct = self
            .send(Request::get(format!("products/{id}/")))
            .await?
            .json()?;
        let product = convert_product(wire);

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Ask the backend to re-import its catalog (staff only).
    ///
    /// Falls back to `/products/sync/` on backends that do not expose
    /// `/products/refresh/`. Clears the product cache on success.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-staff users, or
    /// `ApiError::Business` if the backend reports a failure.
    #[instrument(skip(self))]
    pub async fn refresh_catalog(&self) -> Result<String, ApiError> {
        let primary = self
            .send(Request::post("products/refresh/"))
            .await?
            .json::<MessageResponse>();
        let data = match primary {
            Err(ApiError::NotFound(_)) => {
                debug!("Refresh endpoint missing, trying sync endpoint");
                self.send(Request::post("products/sync/"))
                    .await?
                    .json::<MessageResponse>()?
            }
            other => other?,
        };

        if let Some(error) = data.error {
            return Err(ApiError::Business(error));
        }
        self.invalidate_catalog();
        let message = data
            .message
            .unwrap_or_else(|| "Products refreshed successfully".to_string());
        info!(%message, "Catalog refreshed");
        Ok(message)
    }

    /// Probe the catalog endpoint with a short timeout.
    ///
    /// Returns the number of products the backend currently serves.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<usize, ApiError> {
        let req = Request::get("products/").timeout(self.inner.health_timeout);
        let payload: ProductsPayload = self.send_public(req).await?.json()?;
        Ok(match payload {
            ProductsPayload::Bare(p) | ProductsPayload::Results { results: p } => p.len(),
        })
    }
}
