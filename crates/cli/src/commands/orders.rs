//! Order history commands.

use shopfront_core::OrderId;
use shopfront_storefront::Storefront;
use shopfront_storefront::orders::newest_first;
use shopfront_storefront::router::Route;

use super::{CliError, enter};
use crate::render;

pub async fn list(shop: &Storefront) -> Result<(), CliError> {
    enter(shop, Route::Orders)?;
    let orders = newest_first(shop.api().list_orders().await?);
    if orders.is_empty() {
        render::line("You have no orders yet");
    } else {
        render::orders(&orders, shop.config().currency);
    }
    Ok(())
}

pub async fn show(shop: &Storefront, id: i64) -> Result<(), CliError> {
    let id = OrderId::new(id);
    enter(shop, Route::OrderDetail(id))?;
    let order = shop.api().get_order(id).await?;
    render::order(&order, shop.config().currency);
    Ok(())
}
