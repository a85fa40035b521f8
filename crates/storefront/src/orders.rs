//! Order history presentation helpers.

use chrono::{DateTime, Utc};
use shopfront_core::OrderStatus;

use crate::types::Order;

/// Short form used in the order list, e.g. "05 Mar 2024, 10:30".
#[must_use]
pub fn short_date(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "Date not available".to_string(),
        |dt| dt.format("%d %b %Y, %H:%M").to_string(),
    )
}

/// Long form used on the detail view, e.g. "Tuesday, 05 March 2024, 10:30".
#[must_use]
pub fn long_date(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "Date not available".to_string(),
        |dt| dt.format("%A, %d %B %Y, %H:%M").to_string(),
    )
}

/// Marker shown next to a status in terminal output.
#[must_use]
pub const fn status_marker(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Completed => "✔",
        OrderStatus::Processing => "…",
        OrderStatus::Cancelled => "✖",
    }
}

/// Orders sorted newest first; undated orders go last.
#[must_use]
pub fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}
