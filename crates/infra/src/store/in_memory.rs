use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Utc};

use freshfood_catalog::{NewProduct, Product, ProductChanges, ProductFilter};
use freshfood_core::{index_by_id, Customer, CustomerId, OrderId, OrderLineId, ProductId};
use freshfood_orders::{
    plan_lines, requested_product_ids, LineDetails, Order, OrderDetails, OrderHeaderChanges,
    OrderLine, OrderScope, OrderSubmission,
};

use super::{
    normalize_username, CatalogStore, IdentityStore, OrderStore, PlacedOrder, StoreError,
};

#[derive(Debug, Default)]
struct Sequences {
    product: i64,
    customer: i64,
    order: i64,
    line: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<ProductId, Product>,
    customers: BTreeMap<CustomerId, Customer>,
    orders: BTreeMap<OrderId, Order>,
    lines: BTreeMap<OrderLineId, OrderLine>,
    sequences: Sequences,
    last_timestamp: Option<DateTime<Utc>>,
}

impl State {
    /// Strictly increasing wall-clock timestamps at microsecond precision, so
    /// creation order is always recoverable from `created_at`.
    fn now(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = now.duration_trunc(Duration::microseconds(1)).unwrap_or(now);
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn details(&self, headers: Vec<Order>) -> Vec<OrderDetails> {
        let headers: Vec<(Order, Customer)> = headers
            .into_iter()
            .filter_map(|order| {
                let customer = self.customers.get(&order.customer_id)?.clone();
                Some((order, customer))
            })
            .collect();

        let lines: Vec<LineDetails> = self
            .lines
            .values()
            .filter(|line| headers.iter().any(|(o, _)| o.id == line.order_id))
            .filter_map(|line| {
                let product = self.products.get(&line.product_id)?.clone();
                Some(LineDetails {
                    line: line.clone(),
                    product,
                })
            })
            .collect();

        OrderDetails::assemble(headers, lines)
    }
}

/// In-memory storefront.
///
/// Intended for tests/dev. A single lock guards all tables, which makes every
/// operation trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryStorefront {
    state: RwLock<State>,
}

impl InMemoryStorefront {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))
    }
}

#[async_trait]
impl CatalogStore for InMemoryStorefront {
    async fn create_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let new = new.validate()?;
        let mut state = self.write()?;
        let id = ProductId::new(next(&mut state.sequences.product));
        let now = state.now();
        let product = Product::from_new(id, new, now);
        state.products.insert(id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, StoreError> {
        let changes = changes.validate()?;
        let mut state = self.write()?;
        let now = state.now();
        let product = state.products.get_mut(&id).ok_or(StoreError::NotFound)?;
        changes.apply_to(product, now);
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.products.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        state.lines.retain(|_, line| line.product_id != id);
        Ok(())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError> {
        let state = self.read()?;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        ProductFilter::sort(&mut products);
        Ok(products)
    }
}

#[async_trait]
impl IdentityStore for InMemoryStorefront {
    async fn create_customer(&self, username: &str) -> Result<Customer, StoreError> {
        let username = normalize_username(username)?;
        let mut state = self.write()?;
        if state.customers.values().any(|c| c.username == username) {
            return Err(StoreError::Conflict(format!(
                "username '{username}' is already registered"
            )));
        }
        let id = CustomerId::new(next(&mut state.sequences.customer));
        let customer = Customer::new(id, username);
        state.customers.insert(id, customer.clone());
        Ok(customer)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        Ok(self.read()?.customers.get(&id).cloned())
    }

    async fn ensure_customer(&self, username: &str) -> Result<Customer, StoreError> {
        let username = normalize_username(username)?;
        let mut state = self.write()?;
        if let Some(existing) = state.customers.values().find(|c| c.username == username) {
            return Ok(existing.clone());
        }
        let id = CustomerId::new(next(&mut state.sequences.customer));
        let customer = Customer::new(id, username);
        state.customers.insert(id, customer.clone());
        Ok(customer)
    }
}

#[async_trait]
impl OrderStore for InMemoryStorefront {
    async fn place_order(&self, submission: OrderSubmission) -> Result<PlacedOrder, StoreError> {
        let mut state = self.write()?;

        if !state.customers.contains_key(&submission.customer.id) {
            return Err(StoreError::Integrity(format!(
                "customer {} does not exist",
                submission.customer.id
            )));
        }

        let products = index_by_id(
            requested_product_ids(&submission.cart)
                .into_iter()
                .filter_map(|id| state.products.get(&id).cloned()),
        );
        let planned = plan_lines(&submission.cart, &products)?;

        // Nothing below can fail, so the write is all-or-nothing.
        let now = state.now();
        let order = Order {
            id: OrderId::new(next(&mut state.sequences.order)),
            customer_id: submission.customer.id,
            client_name: submission.display_name(),
            created_at: now,
            updated_at: now,
        };
        let lines: Vec<OrderLine> = planned
            .iter()
            .map(|p| OrderLine {
                id: OrderLineId::new(next(&mut state.sequences.line)),
                order_id: order.id,
                product_id: p.product_id,
                quantity: p.quantity,
            })
            .collect();

        state.orders.insert(order.id, order.clone());
        for line in &lines {
            state.lines.insert(line.id, line.clone());
        }

        Ok(PlacedOrder { order, lines })
    }

    async fn list_orders(&self, scope: OrderScope) -> Result<Vec<OrderDetails>, StoreError> {
        let state = self.read()?;
        let mut headers: Vec<Order> = state
            .orders
            .values()
            .filter(|o| scope.includes(o))
            .cloned()
            .collect();
        headers.sort_by(Order::newest_first);
        Ok(state.details(headers))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetails>, StoreError> {
        let state = self.read()?;
        let Some(order) = state.orders.get(&id).cloned() else {
            return Ok(None);
        };
        Ok(state.details(vec![order]).into_iter().next())
    }

    async fn update_order(
        &self,
        id: OrderId,
        changes: OrderHeaderChanges,
    ) -> Result<Order, StoreError> {
        let mut state = self.write()?;
        let now = state.now();
        let State {
            orders, customers, ..
        } = &mut *state;
        let order = orders.get_mut(&id).ok_or(StoreError::NotFound)?;
        let username = customers
            .get(&order.customer_id)
            .map(|c| c.username.as_str())
            .ok_or_else(|| {
                StoreError::Integrity(format!("customer {} does not exist", order.customer_id))
            })?;
        changes.apply_to(order, username, now);
        Ok(order.clone())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.orders.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        state.lines.retain(|_, line| line.order_id != id);
        Ok(())
    }
}
