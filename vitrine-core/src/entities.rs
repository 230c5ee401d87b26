//! Storefront entity structures
//!
//! These are the shapes the cached catalog hands out. They mirror what the
//! managed database returns; nothing here talks to a database itself.

use crate::{OrderId, ProductId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    /// Unit price in the smallest currency unit (e.g. cents).
    pub price_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    pub stock: i32,
    pub active: bool,
    pub updated_at: Timestamp,
}

/// Lifecycle of an order as reported by the payments provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Refunded,
    Cancelled,
}

impl OrderStatus {
    /// Whether the order's amount counts towards what the customer spent.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Paid | Self::Shipped)
    }
}

/// A single order as listed on a customer's account page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDigest {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub item_count: u32,
    pub placed_at: Timestamp,
}

/// Aggregate of a customer's orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub user_id: UserId,
    /// Orders, most recent first.
    pub orders: Vec<OrderDigest>,
    /// Sum of settled order totals.
    pub total_spent_cents: i64,
}

impl OrderSummary {
    /// Build a summary, ordering by recency and totalling settled orders.
    pub fn from_orders(user_id: UserId, mut orders: Vec<OrderDigest>) -> Self {
        orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));
        let total_spent_cents = orders
            .iter()
            .filter(|o| o.status.is_settled())
            .map(|o| o.total_cents)
            .sum();
        Self {
            user_id,
            orders,
            total_spent_cents,
        }
    }
}

/// Storefront theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub primary_color: String,
    pub accent_color: String,
    pub logo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn digest(status: OrderStatus, total_cents: i64, hours_ago: i64) -> OrderDigest {
        OrderDigest {
            order_id: OrderId::now_v7(),
            status,
            total_cents,
            item_count: 1,
            placed_at: Utc::now() - Duration::hours(hours_ago),
        }
    }

    #[test]
    fn test_order_summary_totals_only_settled_orders() {
        let summary = OrderSummary::from_orders(
            UserId::nil(),
            vec![
                digest(OrderStatus::Paid, 1_000, 5),
                digest(OrderStatus::Refunded, 2_500, 4),
                digest(OrderStatus::Shipped, 700, 3),
                digest(OrderStatus::Pending, 300, 1),
            ],
        );
        assert_eq!(summary.total_spent_cents, 1_700);
        assert_eq!(summary.orders.len(), 4);
    }

    #[test]
    fn test_order_summary_sorts_most_recent_first() {
        let summary = OrderSummary::from_orders(
            UserId::nil(),
            vec![
                digest(OrderStatus::Paid, 1, 10),
                digest(OrderStatus::Paid, 2, 1),
                digest(OrderStatus::Paid, 3, 5),
            ],
        );
        let totals: Vec<i64> = summary.orders.iter().map(|o| o.total_cents).collect();
        assert_eq!(totals, vec![2, 3, 1]);
    }

    #[test]
    fn test_product_serializes_ids_as_strings() {
        let product = Product {
            product_id: ProductId::now_v7(),
            name: "Mug".to_string(),
            slug: "mug".to_string(),
            description: None,
            price_cents: 1_200,
            currency: "EUR".to_string(),
            stock: 3,
            active: true,
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["product_id"], product.product_id.to_string());
        assert_eq!(value["price_cents"], 1_200);
        let back: Product = serde_json::from_value(value).unwrap();
        assert_eq!(back, product);
    }

    #[test]
    fn test_order_status_serde_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Refunded).unwrap();
        assert_eq!(json, "\"refunded\"");
    }
}
