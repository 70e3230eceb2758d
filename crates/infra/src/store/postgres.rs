//! Postgres-backed storefront.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `Integrity` |
//! | Database (check constraint violation) | `23514` | `Domain` (validation) |
//! | Database (other) | Any other | `Database` |
//! | RowNotFound | N/A | `NotFound` |
//! | Other | N/A | `Database` |
//!
//! ## Query Shape
//!
//! `place_order` runs in one transaction: a single `id = ANY($1)` product
//! lookup, one header insert, one batched line insert. Order listings take two
//! queries regardless of how many orders or lines they return.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgConnection, PgPool, Row};
use tracing::{instrument, Span};

use freshfood_catalog::{Category, NewProduct, Product, ProductChanges, ProductFilter};
use freshfood_core::{
    index_by_id, Customer, CustomerId, DomainError, OrderId, OrderLineId, ProductId,
};
use freshfood_orders::{
    plan_lines, requested_product_ids, LineDetails, Order, OrderDetails, OrderHeaderChanges,
    OrderLine, OrderScope, OrderSubmission,
};

use super::{
    normalize_username, CatalogStore, IdentityStore, OrderStore, PlacedOrder, StoreError,
};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const PRODUCT_COLUMNS: &str = "p.id, p.label, p.category, p.price, p.description, p.created_at, p.updated_at";

const ORDER_COLUMNS: &str = "o.id, o.customer_id, o.client_name, o.created_at, o.updated_at";

/// Postgres storefront over a shared connection pool.
///
/// `PgPool` is internally reference counted, so cloning the store is cheap.
#[derive(Debug, Clone)]
pub struct PostgresStorefront {
    pool: PgPool,
}

impl PostgresStorefront {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for PostgresStorefront {
    #[instrument(skip(self, new), fields(label = %new.label), err)]
    async fn create_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let new = new.validate()?;
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products AS p (label, category, price, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&new.label)
        .bind(new.category.as_str())
        .bind(new.price)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;

        product_from_row(&row, "create_product")
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;

        row.map(|row| product_from_row(&row, "get_product")).transpose()
    }

    #[instrument(skip(self, changes), fields(product_id = %id), err)]
    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, StoreError> {
        let changes = changes.validate()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1 FOR UPDATE"
        ))
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?
        .ok_or(StoreError::NotFound)?;

        let mut product = product_from_row(&row, "update_product")?;
        changes.apply_to(&mut product, Utc::now());

        sqlx::query(
            r#"
            UPDATE products
            SET label = $2, category = $3, price = $4, description = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .bind(&product.label)
        .bind(product.category.as_str())
        .bind(product.price)
        .bind(&product.description)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(
        skip(self, filter),
        fields(search = ?filter.search_term(), category = ?filter.category, result_count),
        err
    )]
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products p
            WHERE ($1::text IS NULL OR strpos(lower(p.label), lower($1)) > 0)
              AND ($2::text IS NULL OR p.category = $2)
            ORDER BY p.label COLLATE "C", p.id
            "#
        ))
        .bind(filter.search_term())
        .bind(filter.category.map(Category::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        let products = rows
            .iter()
            .map(|row| product_from_row(row, "list_products"))
            .collect::<Result<Vec<_>, _>>()?;
        Span::current().record("result_count", products.len());
        Ok(products)
    }
}

#[async_trait]
impl IdentityStore for PostgresStorefront {
    #[instrument(skip(self), err)]
    async fn create_customer(&self, username: &str) -> Result<Customer, StoreError> {
        let username = normalize_username(username)?;
        let row = sqlx::query("INSERT INTO customers (username) VALUES ($1) RETURNING id, username")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_customer", e))?;
        customer_from_row(&row).map_err(|e| map_sqlx_error("create_customer", e))
    }

    #[instrument(skip(self), fields(customer_id = %id), err)]
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query("SELECT id, username FROM customers WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_customer", e))?;
        row.map(|row| customer_from_row(&row))
            .transpose()
            .map_err(|e| map_sqlx_error("get_customer", e))
    }

    #[instrument(skip(self), err)]
    async fn ensure_customer(&self, username: &str) -> Result<Customer, StoreError> {
        let username = normalize_username(username)?;
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query(
            r#"
            INSERT INTO customers (username) VALUES ($1)
            ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username
            RETURNING id, username
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_customer", e))?;
        customer_from_row(&row).map_err(|e| map_sqlx_error("ensure_customer", e))
    }
}

#[async_trait]
impl OrderStore for PostgresStorefront {
    /// Commit an order.
    ///
    /// This method:
    /// 1. Starts a transaction
    /// 2. Loads every referenced product in one query
    /// 3. Reduces the cart to valid lines
    /// 4. Inserts the header and all lines
    /// 5. Commits
    ///
    /// Any failure before the commit drops the transaction, which rolls it back.
    #[instrument(
        skip(self, submission),
        fields(
            customer_id = %submission.customer.id,
            cart_len = submission.cart.len(),
            order_id,
            line_count
        ),
        err
    )]
    async fn place_order(&self, submission: OrderSubmission) -> Result<PlacedOrder, StoreError> {
        let span = Span::current();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let ids: Vec<i64> = requested_product_ids(&submission.cart)
            .into_iter()
            .map(ProductId::get)
            .collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("load_products", e))?;

        let products = index_by_id(
            rows.iter()
                .map(|row| product_from_row(row, "load_products"))
                .collect::<Result<Vec<_>, _>>()?,
        );

        let planned = match plan_lines(&submission.cart, &products) {
            Ok(planned) => planned,
            Err(e) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(e.into());
            }
        };

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders AS o (customer_id, client_name)
            VALUES ($1, $2)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(submission.customer.id.get())
        .bind(submission.display_name())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        let order = order_from_row(&row).map_err(|e| map_sqlx_error("insert_order", e))?;

        let (product_ids, quantities): (Vec<i64>, Vec<i32>) = planned
            .iter()
            .map(|p| (p.product_id.get(), p.quantity))
            .unzip();
        let rows = sqlx::query(
            r#"
            INSERT INTO order_lines (order_id, product_id, quantity)
            SELECT $1, u.product_id, u.quantity
            FROM UNNEST($2::bigint[], $3::int[]) WITH ORDINALITY AS u(product_id, quantity, ord)
            ORDER BY u.ord
            RETURNING id, order_id, product_id, quantity
            "#,
        )
        .bind(order.id.get())
        .bind(product_ids)
        .bind(quantities)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order_lines", e))?;

        let mut lines = rows
            .iter()
            .map(order_line_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("insert_order_lines", e))?;
        lines.sort_by_key(|l| l.id);

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        span.record("order_id", order.id.get());
        span.record("line_count", lines.len());
        Ok(PlacedOrder { order, lines })
    }

    #[instrument(skip(self), fields(result_count), err)]
    async fn list_orders(&self, scope: OrderScope) -> Result<Vec<OrderDetails>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        // Headers and lines must come from the same snapshot.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        let details = load_details(&mut tx, scope.customer(), None).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Span::current().record("result_count", details.len());
        Ok(details)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetails>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;

        let details = load_details(&mut tx, None, Some(id)).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(details.into_iter().next())
    }

    #[instrument(skip(self, changes), fields(order_id = %id), err)]
    async fn update_order(
        &self,
        id: OrderId,
        changes: OrderHeaderChanges,
    ) -> Result<Order, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}, c.username
            FROM orders o JOIN customers c ON c.id = o.customer_id
            WHERE o.id = $1
            FOR UPDATE OF o
            "#
        ))
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?
        .ok_or(StoreError::NotFound)?;

        let mut order = order_from_row(&row).map_err(|e| map_sqlx_error("update_order", e))?;
        let username: String = row
            .try_get("username")
            .map_err(|e| map_sqlx_error("update_order", e))?;
        changes.apply_to(&mut order, &username, Utc::now());

        sqlx::query("UPDATE orders SET client_name = $2, updated_at = $3 WHERE id = $1")
            .bind(id.get())
            .bind(&order.client_name)
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_order", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Headers (joined with customers) in one query, then every line of those
/// orders (joined with products) in a second.
async fn load_details(
    conn: &mut PgConnection,
    customer_id: Option<CustomerId>,
    order_id: Option<OrderId>,
) -> Result<Vec<OrderDetails>, StoreError> {
    let header_rows = sqlx::query(&format!(
        r#"
        SELECT {ORDER_COLUMNS}, c.username
        FROM orders o JOIN customers c ON c.id = o.customer_id
        WHERE ($1::bigint IS NULL OR o.customer_id = $1)
          AND ($2::bigint IS NULL OR o.id = $2)
        ORDER BY o.created_at DESC, o.id DESC
        "#
    ))
    .bind(customer_id.map(CustomerId::get))
    .bind(order_id.map(OrderId::get))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("load_order_headers", e))?;

    let mut headers = Vec::with_capacity(header_rows.len());
    for row in &header_rows {
        let order = order_from_row(row).map_err(|e| map_sqlx_error("load_order_headers", e))?;
        let username: String = row
            .try_get("username")
            .map_err(|e| map_sqlx_error("load_order_headers", e))?;
        let customer = Customer::new(order.customer_id, username);
        headers.push((order, customer));
    }
    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i64> = headers.iter().map(|(o, _)| o.id.get()).collect();
    let line_rows = sqlx::query(&format!(
        r#"
        SELECT l.id AS line_id, l.order_id, l.quantity, {PRODUCT_COLUMNS}
        FROM order_lines l JOIN products p ON p.id = l.product_id
        WHERE l.order_id = ANY($1)
        ORDER BY l.order_id, l.id
        "#
    ))
    .bind(order_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("load_order_lines", e))?;

    let mut lines = Vec::with_capacity(line_rows.len());
    for row in &line_rows {
        let product = product_from_row(row, "load_order_lines")?;
        let line = OrderLine {
            id: OrderLineId::new(
                row.try_get("line_id")
                    .map_err(|e| map_sqlx_error("load_order_lines", e))?,
            ),
            order_id: OrderId::new(
                row.try_get("order_id")
                    .map_err(|e| map_sqlx_error("load_order_lines", e))?,
            ),
            product_id: product.id,
            quantity: row
                .try_get("quantity")
                .map_err(|e| map_sqlx_error("load_order_lines", e))?,
        };
        lines.push(LineDetails { line, product });
    }

    Ok(OrderDetails::assemble(headers, lines))
}

struct ProductRow {
    id: i64,
    label: String,
    category: String,
    price: Decimal,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            label: row.try_get("label")?,
            category: row.try_get("category")?,
            price: row.try_get("price")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category = row
            .category
            .parse()
            .map_err(|e: DomainError| StoreError::Database(format!("corrupt product row: {e}")))?;
        Ok(Product {
            id: ProductId::new(row.id),
            label: row.label,
            category,
            price: row.price,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn product_from_row(row: &PgRow, operation: &str) -> Result<Product, StoreError> {
    ProductRow::from_row(row)
        .map_err(|e| map_sqlx_error(operation, e))?
        .try_into()
}

fn customer_from_row(row: &PgRow) -> Result<Customer, sqlx::Error> {
    Ok(Customer::new(
        CustomerId::new(row.try_get("id")?),
        row.try_get::<String, _>("username")?,
    ))
}

fn order_from_row(row: &PgRow) -> Result<Order, sqlx::Error> {
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        customer_id: CustomerId::new(row.try_get("customer_id")?),
        client_name: row.try_get("client_name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn order_line_from_row(row: &PgRow) -> Result<OrderLine, sqlx::Error> {
    Ok(OrderLine {
        id: OrderLineId::new(row.try_get("id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        quantity: row.try_get("quantity")?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::Integrity(msg),
                Some("23514") => StoreError::Domain(DomainError::validation(msg)),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}
