//! Read-side view of committed orders: header, customer and priced lines.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use freshfood_catalog::Product;
use freshfood_core::{Customer, OrderId};

use crate::order::{Order, OrderLine};

/// An order line joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineDetails {
    pub line: OrderLine,
    pub product: Product,
}

impl LineDetails {
    /// `quantity × current product price`.
    pub fn subtotal(&self) -> Decimal {
        self.product.price * Decimal::from(self.line.quantity)
    }
}

/// Sum of line subtotals at the products' current prices.
pub fn total_price(lines: &[LineDetails]) -> Decimal {
    lines.iter().map(LineDetails::subtotal).sum()
}

/// An order pre-joined with its customer and lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    pub order: Order,
    pub customer: Customer,
    pub lines: Vec<LineDetails>,
}

impl OrderDetails {
    pub fn total_price(&self) -> Decimal {
        total_price(&self.lines)
    }

    /// Attach batch-fetched lines to their headers.
    ///
    /// Header order is preserved; lines within an order are sorted by line id.
    /// Lines whose order is not among `headers` are ignored.
    pub fn assemble(headers: Vec<(Order, Customer)>, lines: Vec<LineDetails>) -> Vec<OrderDetails> {
        let mut by_order: HashMap<OrderId, Vec<LineDetails>> = HashMap::new();
        for line in lines {
            by_order.entry(line.line.order_id).or_default().push(line);
        }

        headers
            .into_iter()
            .map(|(order, customer)| {
                let mut lines = by_order.remove(&order.id).unwrap_or_default();
                lines.sort_by_key(|l| l.line.id);
                OrderDetails { order, customer, lines }
            })
            .collect()
    }
}
