//! Order submission.
//!
//! The engine decides *who* is ordering, then hands the cart to the store,
//! which validates it against the catalog and commits atomically.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn, Span};

use freshfood_auth::Principal;
use freshfood_core::{CustomerId, OrderId};
use freshfood_orders::{parse_order_request, CartItem, OrderError, OrderSubmission};

use crate::store::{IdentityStore, OrderStore, StoreError};

/// What to do with unauthenticated submissions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GuestCheckout {
    /// Anonymous callers are denied.
    #[default]
    Disabled,
    /// Anonymous orders are attributed to this shared customer.
    Enabled { username: String },
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Client-correctable problem with the request or cart.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// No customer could be resolved for the caller.
    #[error("access denied")]
    AccessDenied,

    /// Store failure. Nothing was committed.
    #[error("order could not be saved: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for SubmitError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Order(e) => SubmitError::Order(e),
            other => SubmitError::Persistence(other),
        }
    }
}

/// Outcome of a committed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub line_count: usize,
}

pub struct OrderEngine<S: ?Sized> {
    store: Arc<S>,
    guest: GuestCheckout,
}

impl<S: ?Sized> Clone for OrderEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            guest: self.guest.clone(),
        }
    }
}

impl<S> OrderEngine<S>
where
    S: IdentityStore + OrderStore + ?Sized,
{
    pub fn new(store: Arc<S>, guest: GuestCheckout) -> Self {
        Self { store, guest }
    }

    /// Parse a raw request body and submit it.
    pub async fn submit_request(
        &self,
        principal: &Principal,
        body: &[u8],
    ) -> Result<OrderReceipt, SubmitError> {
        let request = parse_order_request(body).inspect_err(|e| {
            warn!(error = %e, "rejected unreadable order request");
        })?;
        self.submit(principal, request.client_name, request.cart_items)
            .await
    }

    /// Submit a cart on behalf of `principal`.
    ///
    /// Anonymous callers are refused before the cart is looked at unless guest
    /// checkout is enabled. An empty cart is rejected before any customer is
    /// resolved or created.
    #[instrument(
        skip(self, principal, client_name, cart),
        fields(
            authenticated = principal.is_authenticated(),
            cart_len = cart.len(),
            customer_id,
            order_id
        ),
        err
    )]
    pub async fn submit(
        &self,
        principal: &Principal,
        client_name: Option<String>,
        cart: Vec<CartItem>,
    ) -> Result<OrderReceipt, SubmitError> {
        let span = Span::current();

        if !principal.is_authenticated() && self.guest == GuestCheckout::Disabled {
            warn!("anonymous order submission denied");
            return Err(SubmitError::AccessDenied);
        }
        if cart.is_empty() {
            warn!("rejected empty cart");
            return Err(OrderError::EmptyCart.into());
        }

        let customer = match (principal.customer_id(), &self.guest) {
            (Some(id), _) => self.store.get_customer(id).await?.ok_or_else(|| {
                warn!(customer_id = %id, "token subject has no customer record");
                SubmitError::AccessDenied
            })?,
            (None, GuestCheckout::Enabled { username }) => {
                self.store.ensure_customer(username).await?
            }
            (None, GuestCheckout::Disabled) => return Err(SubmitError::AccessDenied),
        };
        span.record("customer_id", customer.id.get());

        let submission = OrderSubmission {
            customer,
            client_name,
            cart,
        };
        let placed = self.store.place_order(submission).await.inspect_err(|e| match e {
            StoreError::Order(reason) => warn!(reason = reason.code(), "rejected cart"),
            other => tracing::error!(error = %other, "order persistence failed"),
        })?;

        span.record("order_id", placed.order.id.get());
        info!(line_count = placed.lines.len(), "order placed");

        Ok(OrderReceipt {
            order_id: placed.order.id,
            customer_id: placed.order.customer_id,
            line_count: placed.lines.len(),
        })
    }
}
