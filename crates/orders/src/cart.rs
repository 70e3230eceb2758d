//! Untrusted cart input and its reduction to valid order lines.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;
use serde_json::Value;

use freshfood_catalog::Product;
use freshfood_core::{Customer, ProductId};

use crate::order::{display_name, OrderError};

/// One client-submitted cart line, before validation.
///
/// Fields that could not be read as integers are kept as `None`; such lines
/// are dropped during planning rather than failing the whole request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: Option<ProductId>,
    pub quantity: Option<i64>,
}

impl CartItem {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id: Some(product_id),
            quantity: Some(quantity),
        }
    }
}

/// Parsed order submission payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub client_name: Option<String>,
    pub cart_items: Vec<CartItem>,
}

#[derive(Debug, Deserialize)]
struct RawOrderRequest {
    #[serde(default)]
    client_name: Option<String>,
    cart_items: Vec<RawCartItem>,
}

#[derive(Debug, Deserialize)]
struct RawCartItem {
    #[serde(default)]
    product_id: Value,
    #[serde(default)]
    quantity: Value,
}

/// Integers, or strings holding an integer.
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse `{"client_name": string?, "cart_items": [{"product_id", "quantity"}, ...]}`.
///
/// Only the envelope is strict: a body that is not JSON, lacks `cart_items`, or
/// whose items are not objects is [`OrderError::MalformedInput`]. Unreadable
/// ids or quantities inside an item only invalidate that item.
pub fn parse_order_request(body: &[u8]) -> Result<OrderRequest, OrderError> {
    let raw: RawOrderRequest =
        serde_json::from_slice(body).map_err(|e| OrderError::MalformedInput(e.to_string()))?;

    let cart_items = raw
        .cart_items
        .iter()
        .map(|item| CartItem {
            product_id: integer(&item.product_id).filter(|id| *id > 0).map(ProductId::new),
            quantity: integer(&item.quantity),
        })
        .collect();

    Ok(OrderRequest {
        client_name: raw.client_name,
        cart_items,
    })
}

/// A cart line that survived validation and will be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Distinct product ids referenced by a cart, ready for a single batch lookup.
pub fn requested_product_ids(cart: &[CartItem]) -> Vec<ProductId> {
    cart.iter()
        .filter_map(|item| item.product_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Reduce a cart to the lines that may be persisted.
///
/// A line is kept when its quantity is a positive integer (fitting the
/// storage column) and its product is present in `products`. Cart order is
/// preserved and repeated products stay separate lines.
pub fn plan_lines(
    cart: &[CartItem],
    products: &HashMap<ProductId, Product>,
) -> Result<Vec<PlannedLine>, OrderError> {
    if cart.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let lines: Vec<PlannedLine> = cart
        .iter()
        .filter_map(|item| {
            let product_id = item.product_id.filter(|id| products.contains_key(id))?;
            let quantity = item
                .quantity
                .filter(|q| *q > 0)
                .and_then(|q| i32::try_from(q).ok())?;
            Some(PlannedLine { product_id, quantity })
        })
        .collect();

    if lines.is_empty() {
        return Err(OrderError::NoValidLines);
    }
    Ok(lines)
}

/// Everything the store needs to commit an order atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSubmission {
    pub customer: Customer,
    pub client_name: Option<String>,
    pub cart: Vec<CartItem>,
}

impl OrderSubmission {
    /// Header display name: the given client name, else the customer's username.
    pub fn display_name(&self) -> String {
        display_name(self.client_name.as_deref(), &self.customer.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use freshfood_catalog::{Category, NewProduct};
    use freshfood_core::CustomerId;

    fn catalog(ids: &[i64]) -> HashMap<ProductId, Product> {
        ids.iter()
            .map(|id| {
                let new = NewProduct::new(format!("p{id}"), Category::Other, "1.00".parse().unwrap());
                (ProductId::new(*id), Product::from_new(ProductId::new(*id), new, Utc::now()))
            })
            .collect()
    }

    #[test]
    fn parses_well_formed_payload() {
        let body = br#"{"client_name": "Bistro", "cart_items": [{"product_id": 5, "quantity": 2}]}"#;
        let req = parse_order_request(body).unwrap();
        assert_eq!(req.client_name.as_deref(), Some("Bistro"));
        assert_eq!(req.cart_items, vec![CartItem::new(ProductId::new(5), 2)]);
    }

    #[test]
    fn client_name_is_optional() {
        let req = parse_order_request(br#"{"cart_items": []}"#).unwrap();
        assert_eq!(req.client_name, None);
        assert!(req.cart_items.is_empty());
    }

    #[test]
    fn unreadable_fields_invalidate_only_their_item() {
        let body = br#"{"cart_items": [
            {"product_id": 1, "quantity": "3"},
            {"product_id": "abc", "quantity": 1},
            {"product_id": 2, "quantity": 1.5},
            {"product_id": 3}
        ]}"#;
        let req = parse_order_request(body).unwrap();
        assert_eq!(req.cart_items.len(), 4);
        assert_eq!(req.cart_items[0], CartItem::new(ProductId::new(1), 3));
        assert_eq!(req.cart_items[1].product_id, None);
        assert_eq!(req.cart_items[2].quantity, None);
        assert_eq!(req.cart_items[3].quantity, None);
    }

    #[test]
    fn malformed_envelopes_are_rejected() {
        let bodies: [&[u8]; 6] = [
            b"not json",
            br#"{"client_name": "x"}"#,
            br#"{"cart_items": {"product_id": 1}}"#,
            br#"{"cart_items": [1, 2]}"#,
            br#"{"cart_items": [], "client_name": 12}"#,
            br#"[]"#,
        ];
        for body in bodies {
            assert!(
                matches!(parse_order_request(body), Err(OrderError::MalformedInput(_))),
                "expected malformed for {}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn unknown_products_are_silently_dropped() {
        let cart = vec![
            CartItem::new(ProductId::new(5), 2),
            CartItem::new(ProductId::new(999), 3),
        ];
        let lines = plan_lines(&cart, &catalog(&[5])).unwrap();
        assert_eq!(
            lines,
            vec![PlannedLine {
                product_id: ProductId::new(5),
                quantity: 2
            }]
        );
    }

    #[test]
    fn empty_cart_and_no_valid_lines_are_distinct() {
        assert_eq!(plan_lines(&[], &catalog(&[1])), Err(OrderError::EmptyCart));
        assert_eq!(
            plan_lines(&[CartItem::new(ProductId::new(999), 1)], &catalog(&[1])),
            Err(OrderError::NoValidLines)
        );
    }

    #[test]
    fn non_positive_and_oversized_quantities_are_dropped() {
        let cart = vec![
            CartItem::new(ProductId::new(1), 0),
            CartItem::new(ProductId::new(1), -4),
            CartItem::new(ProductId::new(1), i64::from(i32::MAX) + 1),
            CartItem {
                product_id: Some(ProductId::new(1)),
                quantity: None,
            },
        ];
        assert_eq!(plan_lines(&cart, &catalog(&[1])), Err(OrderError::NoValidLines));
    }

    #[test]
    fn repeated_products_stay_separate_lines_in_cart_order() {
        let cart = vec![
            CartItem::new(ProductId::new(2), 1),
            CartItem::new(ProductId::new(1), 4),
            CartItem::new(ProductId::new(2), 3),
        ];
        let lines = plan_lines(&cart, &catalog(&[1, 2])).unwrap();
        let got: Vec<(i64, i32)> = lines.iter().map(|l| (l.product_id.get(), l.quantity)).collect();
        assert_eq!(got, vec![(2, 1), (1, 4), (2, 3)]);
        assert_eq!(requested_product_ids(&cart), vec![ProductId::new(1), ProductId::new(2)]);
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut submission = OrderSubmission {
            customer: Customer::new(CustomerId::new(1), "alice"),
            client_name: None,
            cart: vec![],
        };
        assert_eq!(submission.display_name(), "alice");
        submission.client_name = Some("Chez Alice".into());
        assert_eq!(submission.display_name(), "Chez Alice");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: every planned line references a known product with a
            /// positive quantity, and no valid cart line is lost.
            #[test]
            fn planned_lines_are_exactly_the_valid_items(
                items in proptest::collection::vec((1_i64..20, -5_i64..50), 1..30)
            ) {
                let products = catalog(&[2, 3, 5, 7, 11, 13]);
                let cart: Vec<CartItem> = items
                    .iter()
                    .map(|(id, q)| CartItem::new(ProductId::new(*id), *q))
                    .collect();
                let expected = cart
                    .iter()
                    .filter(|c| products.contains_key(&c.product_id.unwrap()) && c.quantity.unwrap() > 0)
                    .count();

                match plan_lines(&cart, &products) {
                    Ok(lines) => {
                        prop_assert_eq!(lines.len(), expected);
                        for line in lines {
                            prop_assert!(line.quantity > 0);
                            prop_assert!(products.contains_key(&line.product_id));
                        }
                    }
                    Err(e) => {
                        prop_assert_eq!(e, OrderError::NoValidLines);
                        prop_assert_eq!(expected, 0);
                    }
                }
            }
        }
    }
}
