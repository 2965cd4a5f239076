//! Order service providing the API transport handlers call.

use std::time::Duration;

use order_store::{OrderFilter, OrderStore};

use crate::creator::{OrderCreator, PlaceOrder, PlacedOrder};
use crate::deadline;
use crate::error::OrderError;
use crate::executor::{TransitionExecutor, TransitionFields};
use crate::id::{IdGenerator, TimestampIdGenerator};
use crate::lifecycle::Transition;
use crate::{Order, OrderId};

/// Deadline applied to each store call unless configured otherwise.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Service for placing, reading and transitioning orders.
///
/// Wraps an [`OrderCreator`] and a [`TransitionExecutor`] sharing one store
/// and one deadline.
#[derive(Clone)]
pub struct OrderService<S, G = TimestampIdGenerator> {
    store: S,
    creator: OrderCreator<S, G>,
    executor: TransitionExecutor<S>,
    timeout: Duration,
}

impl<S> OrderService<S, TimestampIdGenerator>
where
    S: OrderStore + Clone,
{
    /// Creates a new order service with the default store deadline.
    pub fn new(store: S) -> Self {
        Self::with_timeout(store, DEFAULT_STORE_TIMEOUT)
    }

    pub fn with_timeout(store: S, timeout: Duration) -> Self {
        Self::with_parts(store, TimestampIdGenerator, timeout)
    }
}

impl<S, G> OrderService<S, G>
where
    S: OrderStore + Clone,
    G: IdGenerator,
{
    pub fn with_parts(store: S, ids: G, timeout: Duration) -> Self {
        Self {
            creator: OrderCreator::new(store.clone(), ids, timeout),
            executor: TransitionExecutor::new(store.clone(), timeout),
            store,
            timeout,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Places a new order with its items.
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<PlacedOrder, OrderError> {
        self.creator.place(cmd).await
    }

    /// Loads an order together with its items.
    #[tracing::instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: &OrderId) -> Result<PlacedOrder, OrderError> {
        if order_id.is_empty() {
            return Err(OrderError::InvalidInput("order id is required".to_string()));
        }

        let order = deadline::within(self.timeout, "load order", self.store.get_order(order_id))
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.clone()))?;
        let items =
            deadline::within(self.timeout, "load items", self.store.get_items(order_id)).await?;

        Ok(PlacedOrder { order, items })
    }

    /// Lists one user's orders, newest first.
    ///
    /// The filter must name a positive user id.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, OrderError> {
        match filter.user_id {
            Some(user_id) if user_id.is_positive() => {}
            _ => {
                return Err(OrderError::InvalidInput(
                    "a positive user id is required".to_string(),
                ));
            }
        }

        deadline::within(self.timeout, "list orders", self.store.find(&filter)).await
    }

    /// Applies a transition by name.
    pub async fn transition(
        &self,
        order_id: &OrderId,
        name: &str,
        fields: TransitionFields,
    ) -> Result<(), OrderError> {
        self.executor.transition_named(order_id, name, fields).await
    }

    /// Records payment of a pending order.
    pub async fn mark_paid(
        &self,
        order_id: &OrderId,
        payment_method: impl Into<String>,
    ) -> Result<(), OrderError> {
        self.executor
            .transition(
                order_id,
                Transition::Pay,
                TransitionFields::paid_with(payment_method),
            )
            .await
    }

    /// Ships a paid order.
    pub async fn ship(&self, order_id: &OrderId) -> Result<(), OrderError> {
        self.executor
            .transition(order_id, Transition::Ship, TransitionFields::none())
            .await
    }

    /// Marks a shipped order delivered.
    pub async fn deliver(&self, order_id: &OrderId) -> Result<(), OrderError> {
        self.executor
            .transition(order_id, Transition::Deliver, TransitionFields::none())
            .await
    }

    /// Cancels a pending or paid order.
    pub async fn cancel(&self, order_id: &OrderId) -> Result<(), OrderError> {
        self.executor
            .transition(order_id, Transition::Cancel, TransitionFields::none())
            .await
    }

    /// Refunds a paid order.
    pub async fn refund(&self, order_id: &OrderId) -> Result<(), OrderError> {
        self.executor
            .transition(order_id, Transition::Refund, TransitionFields::none())
            .await
    }
}
