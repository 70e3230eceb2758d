use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freshfood_catalog::{Category, NewProduct, ProductChanges, ProductFilter};
use freshfood_core::{CustomerId, DomainError, OrderId, OrderLineId, ProductId};
use freshfood_orders::{LineDetails, Order, OrderDetails, OrderHeaderChanges};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub label: String,
    pub category: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateProductRequest {
    pub fn into_new_product(self) -> Result<NewProduct, DomainError> {
        let category = self
            .category
            .as_deref()
            .map(str::parse::<Category>)
            .transpose()?
            .unwrap_or_default();
        let mut new = NewProduct::new(self.label, category, self.price);
        if let Some(description) = self.description {
            new = new.with_description(description);
        }
        Ok(new)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub label: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
}

impl UpdateProductRequest {
    pub fn into_changes(self) -> Result<ProductChanges, DomainError> {
        Ok(ProductChanges {
            label: self.label,
            category: self.category.as_deref().map(str::parse::<Category>).transpose()?,
            price: self.price,
            description: self.description,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

impl ListProductsQuery {
    pub fn into_filter(self) -> Result<ProductFilter, DomainError> {
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::parse::<Category>)
            .transpose()?;
        Ok(ProductFilter {
            search: self.search,
            category,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub client_name: Option<String>,
}

impl From<UpdateOrderRequest> for OrderHeaderChanges {
    fn from(body: UpdateOrderRequest) -> Self {
        OrderHeaderChanges {
            client_name: body.client_name,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct OrderCreatedResponse {
    pub message: &'static str,
    pub order_id: OrderId,
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub id: CustomerId,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    pub id: OrderLineId,
    pub product_id: ProductId,
    pub product_label: String,
    pub category: Category,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

impl From<&LineDetails> for OrderLineResponse {
    fn from(l: &LineDetails) -> Self {
        Self {
            id: l.line.id,
            product_id: l.product.id,
            product_label: l.product.label.clone(),
            category: l.product.category,
            unit_price: l.product.price,
            quantity: l.line.quantity,
            subtotal: l.subtotal(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub client_name: String,
    pub customer: CustomerResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_price: Decimal,
    pub lines: Vec<OrderLineResponse>,
}

impl From<&OrderDetails> for OrderResponse {
    fn from(d: &OrderDetails) -> Self {
        Self {
            id: d.order.id,
            client_name: d.order.client_name.clone(),
            customer: CustomerResponse {
                id: d.customer.id,
                username: d.customer.username.clone(),
            },
            created_at: d.order.created_at,
            updated_at: d.order.updated_at,
            total_price: d.total_price(),
            lines: d.lines.iter().map(OrderLineResponse::from).collect(),
        }
    }
}

/// Header-only view returned after an administrative update.
#[derive(Debug, Serialize)]
pub struct OrderHeaderResponse {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub client_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderHeaderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            customer_id: o.customer_id,
            client_name: o.client_name,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}
