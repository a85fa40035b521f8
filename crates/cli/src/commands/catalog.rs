//! Catalog commands.

use shopfront_core::ProductId;
use shopfront_storefront::Storefront;
use shopfront_storefront::catalog::{self, CategoryFilter, ProductQuery};
use shopfront_storefront::router::Route;

use super::{CliError, enter};
use crate::render;

pub async fn health(shop: &Storefront) -> Result<(), CliError> {
    let count = shop.api().health().await?;
    render::line(&format!(
        "API reachable at {} ({count} products)",
        shop.api().base_url()
    ));
    Ok(())
}

pub async fn products(shop: &Storefront, category: &str, search: String) -> Result<(), CliError> {
    enter(shop, Route::Products)?;
    let products = shop.api().list_products().await?;
    let filter: CategoryFilter = category.parse().unwrap_or_default();
    let query = ProductQuery::new(search, filter);
    let matches = query.apply(&products);
    if matches.is_empty() {
        render::line("No products found");
    } else {
        render::products(&matches, shop.config().currency);
    }
    Ok(())
}

pub async fn categories(shop: &Storefront) -> Result<(), CliError> {
    enter(shop, Route::Products)?;
    let products = shop.api().list_products().await?;
    for category in catalog::categories(&products) {
        render::line(&category.to_string());
    }
    Ok(())
}

pub async fn product(shop: &Storefront, id: i64) -> Result<(), CliError> {
    enter(shop, Route::Products)?;
    let product = shop.api().get_product(ProductId::new(id)).await?;
    render::product(&product, shop.config().currency);
    Ok(())
}

pub async fn refresh(shop: &Storefront) -> Result<(), CliError> {
    enter(shop, Route::Admin)?;
    let message = shop.api().refresh_catalog().await?;
    render::line(&message);
    Ok(())
}
