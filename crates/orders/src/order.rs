use core::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use freshfood_core::{CustomerId, Entity, OrderId, OrderLineId, ProductId};

/// Why an order submission was rejected before anything was written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// The payload could not be read as an order request.
    #[error("malformed order request: {0}")]
    MalformedInput(String),

    /// The cart had no items at all.
    #[error("cart is empty")]
    EmptyCart,

    /// Items were sent, but none referenced an existing product with a
    /// positive quantity.
    #[error("no valid cart lines")]
    NoValidLines,
}

impl OrderError {
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::MalformedInput(_) => "malformed_input",
            OrderError::EmptyCart => "empty_cart",
            OrderError::NoValidLines => "no_valid_lines",
        }
    }
}

/// Committed order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    /// Display name; the customer's username when none was given.
    pub client_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Listing order: newest first, higher id first on equal timestamps.
    pub fn newest_first(a: &Order, b: &Order) -> Ordering {
        b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> OrderId {
        self.id
    }
}

/// Persisted line item. Holds no price: subtotals always use the product's
/// current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Always positive.
    pub quantity: i32,
}

impl Entity for OrderLine {
    type Id = OrderLineId;

    fn id(&self) -> OrderLineId {
        self.id
    }
}

/// Administrative edit of an order header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHeaderChanges {
    /// `Some("")` resets the display name to the customer's username.
    pub client_name: Option<String>,
}

impl OrderHeaderChanges {
    pub fn apply_to(&self, order: &mut Order, customer_username: &str, now: DateTime<Utc>) {
        if let Some(name) = &self.client_name {
            order.client_name = display_name(Some(name), customer_username);
        }
        order.updated_at = now.max(order.updated_at);
    }
}

/// Trimmed client name, or the customer's identifier when blank/absent.
pub(crate) fn display_name(client_name: Option<&str>, customer_username: &str) -> String {
    client_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(customer_username)
        .to_string()
}

/// Which orders a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All,
    Customer(CustomerId),
}

impl OrderScope {
    pub fn customer(self) -> Option<CustomerId> {
        match self {
            OrderScope::All => None,
            OrderScope::Customer(id) => Some(id),
        }
    }

    pub fn includes(self, order: &Order) -> bool {
        match self {
            OrderScope::All => true,
            OrderScope::Customer(id) => order.customer_id == id,
        }
    }
}
