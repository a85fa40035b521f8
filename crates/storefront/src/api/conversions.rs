//! Wire payload → domain type conversions.

use chrono::{DateTime, NaiveDateTime, Utc};
use shopfront_core::{OrderId, OrderStatus, Price, ProductId};
use tracing::warn;

use super::wire::{
    NestedProduct, ProductRef, WireCartItem, WireOrder, WireOrderLine, WireProduct,
};
use crate::types::{CartItem, Order, OrderLine, Product};

const UNTITLED: &str = "Product";

// =============================================================================
// Products
// =============================================================================

pub fn convert_product(p: WireProduct) -> Product {
    Product {
        id: p.id,
        title: p.title.or(p.name).unwrap_or_else(|| UNTITLED.to_string()),
        description: p.description.unwrap_or_default(),
        price: p.price.unwrap_or(Price::ZERO),
        category: p.category.unwrap_or_default(),
        image: p.image.filter(|s| !s.is_empty()),
    }
}

pub fn convert_products(products: Vec<WireProduct>) -> Vec<Product> {
    products.into_iter().map(convert_product).collect()
}

// =============================================================================
// Cart
// =============================================================================

fn nested(product: Option<&ProductRef>) -> Option<&NestedProduct> {
    match product {
        Some(ProductRef::Nested(p)) => Some(p),
        _ => None,
    }
}

/// A zero price counts as missing, matching the server's habit of sending
/// `0` when the line has no snapshot.
fn first_price(candidates: [Option<Price>; 2]) -> Price {
    candidates
        .into_iter()
        .flatten()
        .find(|p| !p.is_zero())
        .unwrap_or(Price::ZERO)
}

/// Convert one cart line. Lines without a product reference, with a
/// non-positive quantity, or whose subtotal overflows are dropped.
pub fn convert_cart_item(item: WireCartItem) -> Option<CartItem> {
    let product = nested(item.product.as_ref());
    let product_id = match &item.product {
        Some(ProductRef::Id(id)) => Some(*id),
        Some(ProductRef::Nested(p)) => p.id,
        None => None,
    }
    .or(item.product_id)
    .or_else(|| item.id.map(ProductId::new));

    let Some(product_id) = product_id else {
        warn!(line = ?item, "Dropping cart line without a product reference");
        return None;
    };

    let Ok(quantity) = u32::try_from(item.quantity) else {
        warn!(%product_id, quantity = item.quantity, "Dropping cart line with invalid quantity");
        return None;
    };
    if quantity == 0 {
        warn!(%product_id, "Dropping cart line with zero quantity");
        return None;
    }

    let unit_price = first_price([item.price, product.and_then(|p| p.price)]);
    if unit_price.checked_times(quantity).is_none() {
        warn!(%product_id, %unit_price, quantity, "Dropping cart line whose subtotal overflows");
        return None;
    }

    Some(CartItem {
        product_id,
        title: product
            .and_then(|p| p.title.clone().or_else(|| p.name.clone()))
            .or(item.title)
            .unwrap_or_else(|| UNTITLED.to_string()),
        image: product.and_then(|p| p.image.clone()).or(item.image),
        quantity,
        unit_price,
    })
}

pub fn convert_cart(items: Vec<WireCartItem>) -> Vec<CartItem> {
    items.into_iter().filter_map(convert_cart_item).collect()
}

// =============================================================================
// Orders
// =============================================================================

fn convert_order_line(line: WireOrderLine) -> OrderLine {
    let product = nested(line.product.as_ref());
    let product_id = match &line.product {
        Some(ProductRef::Id(id)) => Some(*id),
        Some(ProductRef::Nested(p)) => p.id,
        None => None,
    };

    OrderLine {
        product_id,
        title: product
            .and_then(|p| p.title.clone())
            .or(line.name)
            .or(line.title)
            .unwrap_or_else(|| UNTITLED.to_string()),
        quantity: line
            .quantity
            .and_then(|q| u32::try_from(q).ok())
            .filter(|q| *q > 0)
            .unwrap_or(1),
        unit_price: first_price([line.price, product.and_then(|p| p.price)]),
    }
}

/// Parse the timestamp formats the order endpoints use.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn order_status(order: &WireOrder) -> OrderStatus {
    if let Some(completed) = order.completed {
        return OrderStatus::from_completed(completed);
    }
    order
        .status
        .as_deref()
        .or(order.order_status.as_deref())
        .map_or(OrderStatus::Processing, OrderStatus::from_label)
}

/// Normalize one order. `fallback_id` is used when the payload carries
/// neither `id` nor `order_id`; without either the order is dropped.
pub fn convert_order(order: WireOrder, fallback_id: Option<OrderId>) -> Option<Order> {
    let Some(id) = order.id.or(order.order_id).or(fallback_id) else {
        warn!("Dropping order without an id");
        return None;
    };
    let status = order_status(&order);

    let items: Vec<OrderLine> = order
        .items
        .or(order.products)
        .unwrap_or_default()
        .into_iter()
        .map(convert_order_line)
        .collect();

    let total = order
        .total
        .or(order.total_price)
        .unwrap_or_else(|| items.iter().map(OrderLine::subtotal).sum());

    let created_at = order
        .created_at
        .as_deref()
        .or(order.order_date.as_deref())
        .and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                warn!(%id, raw, "Unrecognised order timestamp");
            }
            parsed
        });

    Some(Order {
        id,
        items,
        total,
        created_at,
        status,
    })
}

pub fn convert_orders(orders: Vec<WireOrder>) -> Vec<Order> {
    orders
        .into_iter()
        .filter_map(|o| convert_order(o, None))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::api::wire::{CartPayload, OrdersPayload};

    fn cart(json: &str) -> Vec<CartItem> {
        match serde_json::from_str::<CartPayload>(json).unwrap() {
            CartPayload::Wrapped { items } | CartPayload::Bare(items) => convert_cart(items),
        }
    }

    #[test]
    fn test_cart_line_prefers_line_price_then_product_price() {
        let items = cart(
            r#"{"items":[
                {"id":9,"product":{"id":1,"title":"Lamp","price":"40.00"},"quantity":2,"price":"35.00"},
                {"id":10,"product":{"id":2,"title":"Rug","price":120},"quantity":1,"price":0},
                {"id":11,"product":{"id":3,"title":"Mug"},"quantity":1}
            ]}"#,
        );
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].unit_price, Price::from_minor(3_500));
        assert_eq!(items[1].unit_price, Price::from_minor(12_000));
        assert_eq!(items[2].unit_price, Price::ZERO);
    }

    #[test]
    fn test_cart_line_product_id_sources() {
        let items = cart(
            r#"[
                {"product":5,"quantity":1,"title":"Flat"},
                {"product_id":6,"quantity":1},
                {"id":7,"quantity":1}
            ]"#,
        );
        let ids: Vec<i64> = items.iter().map(|i| i.product_id.as_i64()).collect();
        assert_eq!(ids, vec![5, 6, 7]);
        assert_eq!(items[0].title, "Flat");
        assert_eq!(items[1].title, UNTITLED);
    }

    #[test]
    fn test_cart_drops_zero_and_negative_quantities() {
        let items = cart(
            r#"[{"product_id":1,"quantity":0},{"product_id":2,"quantity":-1},{"product_id":3,"quantity":4}]"#,
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 4);
    }

    #[test]
    fn test_order_fields_and_fallbacks() {
        let payload: OrdersPayload = serde_json::from_str(
            r#"{"orders":[{
                "order_id": 12,
                "products": [
                    {"product": {"id": 1, "title": "Lamp", "price": "40.00"}, "quantity": 2},
                    {"name": "Gift wrap", "price": 5}
                ],
                "order_date": "2024-03-05T10:30:00",
                "order_status": "Delivered"
            }]}"#,
        )
        .unwrap();
        let orders = convert_orders(payload.into_orders());
        assert_eq!(orders.len(), 1);

        let order = &orders[0];
        assert_eq!(order.id, OrderId::new(12));
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.items[1].title, "Gift wrap");
        assert_eq!(order.items[1].quantity, 1);
        assert_eq!(order.total, Price::from_minor(8_500));
        assert_eq!(
            order.created_at.unwrap().to_rfc3339(),
            "2024-03-05T10:30:00+00:00"
        );
    }

    #[test]
    fn test_order_completed_flag_wins_over_label() {
        let payload: OrdersPayload = serde_json::from_str(
            r#"[{"id":1,"completed":false,"status":"delivered","total":"10.00"}]"#,
        )
        .unwrap();
        let orders = convert_orders(payload.into_orders());
        assert_eq!(orders[0].status, OrderStatus::Processing);
        assert_eq!(orders[0].total, Price::from_minor(1_000));
    }

    #[test]
    fn test_order_without_id_is_dropped_unless_fallback() {
        let order: WireOrder = serde_json::from_str(r#"{"total": 3}"#).unwrap();
        assert!(convert_order(order.clone(), None).is_none());
        assert_eq!(
            convert_order(order, Some(OrderId::new(4))).unwrap().id,
            OrderId::new(4)
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-03-05T10:30:00.123456Z").is_some());
        assert!(parse_timestamp("2024-03-05T10:30:00+05:30").is_some());
        assert!(parse_timestamp("2024-03-05 10:30:00").is_some());
        assert!(parse_timestamp("2024-03-05").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_product_name_fallback() {
        let product: WireProduct =
            serde_json::from_str(r#"{"id": 3, "name": "Chair", "price": "15.5"}"#).unwrap();
        let product = convert_product(product);
        assert_eq!(product.title, "Chair");
        assert_eq!(product.price, Price::from_minor(1_550));
        assert_eq!(product.category, "");
    }
}
