//! Cart and checkout commands.
//!
//! The cart store starts empty in a fresh process, so every command loads
//! the server cart before acting on it.

use clap::Args;
use secrecy::SecretString;
use shopfront_core::ProductId;
use shopfront_storefront::Storefront;
use shopfront_storefront::forms::CheckoutForm;
use shopfront_storefront::router::Route;

use super::{CliError, enter};
use crate::render;

/// Shipping and payment details. Card data is validated locally and never
/// sent to the server.
#[derive(Debug, Args)]
pub struct CheckoutArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    address: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    zip_code: String,
    #[arg(long)]
    card_number: String,
    /// Card expiry as MM/YY
    #[arg(long)]
    expiry: String,
    #[arg(long)]
    cvv: String,
}

async fn load(shop: &Storefront) -> Result<(), CliError> {
    enter(shop, Route::Cart)?;
    shop.cart().fetch().await?;
    Ok(())
}

fn finish(shop: &Storefront) {
    render::toast(shop.notifier());
    render::cart(&shop.cart().state(), shop.config().currency);
}

pub async fn show(shop: &Storefront) -> Result<(), CliError> {
    load(shop).await?;
    render::cart(&shop.cart().state(), shop.config().currency);
    Ok(())
}

pub async fn add(shop: &Storefront, product_id: i64) -> Result<(), CliError> {
    enter(shop, Route::Products)?;
    let product = shop.api().get_product(ProductId::new(product_id)).await?;
    load(shop).await?;
    shop.cart().add(&product).await?;
    finish(shop);
    Ok(())
}

pub async fn remove(shop: &Storefront, product_id: i64) -> Result<(), CliError> {
    load(shop).await?;
    shop.cart().remove(ProductId::new(product_id)).await?;
    finish(shop);
    Ok(())
}

pub async fn decrease(shop: &Storefront, product_id: i64) -> Result<(), CliError> {
    load(shop).await?;
    shop.cart().decrease(ProductId::new(product_id)).await?;
    finish(shop);
    Ok(())
}

pub async fn set_quantity(shop: &Storefront, product_id: i64, quantity: u32) -> Result<(), CliError> {
    load(shop).await?;
    shop.cart()
        .set_quantity(ProductId::new(product_id), quantity)
        .await?;
    finish(shop);
    Ok(())
}

pub async fn clear(shop: &Storefront) -> Result<(), CliError> {
    load(shop).await?;
    shop.cart().clear().await?;
    finish(shop);
    Ok(())
}

pub async fn checkout(shop: &Storefront, args: CheckoutArgs) -> Result<(), CliError> {
    enter(shop, Route::Checkout)?;
    let form = CheckoutForm {
        name: args.name,
        email: args.email,
        address: args.address,
        city: args.city,
        zip_code: args.zip_code,
        card_number: SecretString::from(args.card_number),
        expiry: args.expiry,
        cvv: SecretString::from(args.cvv),
    };
    let shipping = form.validate()?;

    shop.cart().fetch().await?;
    let total = shop.cart().total_price();
    let receipt = shop.cart().checkout().await?;

    render::toast(shop.notifier());
    render::receipt(&receipt, &shipping, total, shop.config().currency);
    Ok(())
}
