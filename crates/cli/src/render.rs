//! Terminal output.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use shopfront_core::{CurrencyCode, Price};
use shopfront_storefront::cart::CartState;
use shopfront_storefront::catalog::{DESCRIPTION_EXCERPT_CHARS, TITLE_EXCERPT_CHARS, excerpt};
use shopfront_storefront::forms::ShippingDetails;
use shopfront_storefront::notify::{Notifier, ToastKind};
use shopfront_storefront::orders::{long_date, short_date, status_marker};
use shopfront_storefront::types::{CheckoutReceipt, Order, Product, UserProfile};

pub fn line(text: &str) {
    println!("{text}");
}

pub fn failure(message: &str) {
    eprintln!("Error: {message}");
}

/// Print the visible toast, if any.
pub fn toast(notifier: &Notifier) {
    if let Some(toast) = notifier.current() {
        let marker = match toast.kind {
            ToastKind::Success => "✔",
            ToastKind::Error => "✖",
            ToastKind::Info => "ℹ",
        };
        println!("{marker} {}", toast.message);
    }
}

pub fn user(user: &UserProfile) {
    println!("Username: {}", user.username);
    if let Some(email) = &user.email {
        println!("Email:    {email}");
    }
    if user.is_admin() {
        println!("Role:     staff");
    }
}

pub fn products(products: &[&Product], currency: CurrencyCode) {
    for product in products {
        println!(
            "#{:<5} {:<52} {:>12}  [{}]",
            product.id,
            excerpt(&product.title, TITLE_EXCERPT_CHARS),
            product.price.display(currency),
            product.category,
        );
        if !product.description.is_empty() {
            println!("       {}", excerpt(&product.description, DESCRIPTION_EXCERPT_CHARS));
        }
    }
}

pub fn product(product: &Product, currency: CurrencyCode) {
    println!("#{} {}", product.id, product.title);
    println!("Price:    {}", product.price.display(currency));
    if !product.category.is_empty() {
        println!("Category: {}", product.category);
    }
    if let Some(image) = &product.image {
        println!("Image:    {image}");
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
}

pub fn cart(state: &CartState, currency: CurrencyCode) {
    if state.is_empty() {
        println!("Your cart is empty");
        return;
    }
    for item in &state.items {
        println!(
            "#{:<5} {:<40} {:>3} x {:>10} = {:>12}",
            item.product_id,
            excerpt(&item.title, 40),
            item.quantity,
            item.unit_price.display(currency),
            item.subtotal().display(currency),
        );
    }
    println!("Items: {}  Total: {}", state.count(), state.total().display(currency));
}

pub fn receipt(receipt: &CheckoutReceipt, shipping: &ShippingDetails, total: Price, currency: CurrencyCode) {
    if let Some(id) = receipt.order_id {
        println!("Order #{id}");
    }
    println!("Total:    {}", total.display(currency));
    println!("Ship to:  {}, {}, {} {}", shipping.name, shipping.address, shipping.city, shipping.zip_code);
    println!("Card:     **** {}", shipping.card_last4);
    println!("Receipt:  {}", shipping.email);
}

pub fn orders(orders: &[Order], currency: CurrencyCode) {
    for order in orders {
        println!(
            "#{:<6} {:<20} {} {:<10} {:>3} items {:>12}",
            order.id,
            short_date(order.created_at),
            status_marker(order.status),
            order.status,
            order.item_count(),
            order.total.display(currency),
        );
    }
}

pub fn order(order: &Order, currency: CurrencyCode) {
    println!("Order #{}", order.id);
    println!("Placed:   {}", long_date(order.created_at));
    println!("Status:   {} {}", status_marker(order.status), order.status);
    println!();
    for line in &order.items {
        println!(
            "{:<40} {:>3} x {:>10} = {:>12}",
            excerpt(&line.title, 40),
            line.quantity,
            line.unit_price.display(currency),
            line.subtotal().display(currency),
        );
    }
    println!("Total:    {}", order.total.display(currency));
}
