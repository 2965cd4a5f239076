use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{NewOrderItem, Order, OrderFilter, OrderId, OrderItem, OrderStatus, Result};

/// Fields written by a status transition.
///
/// `status` and `updated_at` are always written. The milestone timestamps and
/// `payment_method` are written only when set; a `None` leaves the stored value
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
}

impl StatusUpdate {
    /// Creates an update moving orders to `status` at `at`.
    pub fn to(status: OrderStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at: at,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            payment_method: None,
        }
    }

    pub fn paid_at(mut self, at: DateTime<Utc>) -> Self {
        self.paid_at = Some(at);
        self
    }

    pub fn shipped_at(mut self, at: DateTime<Utc>) -> Self {
        self.shipped_at = Some(at);
        self
    }

    pub fn delivered_at(mut self, at: DateTime<Utc>) -> Self {
        self.delivered_at = Some(at);
        self
    }

    pub fn payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    /// Writes the update onto a row.
    pub fn apply_to(&self, order: &mut Order) {
        order.status = self.status;
        order.updated_at = self.updated_at;
        if let Some(at) = self.paid_at {
            order.paid_at = Some(at);
        }
        if let Some(at) = self.shipped_at {
            order.shipped_at = Some(at);
        }
        if let Some(at) = self.delivered_at {
            order.delivered_at = Some(at);
        }
        if let Some(ref method) = self.payment_method {
            order.payment_method = Some(method.clone());
        }
    }
}

/// Persistence collaborator for orders and their line items.
///
/// Implementations must be thread-safe (Send + Sync) and must provide:
/// - all-or-nothing visibility for [`create_atomic`](OrderStore::create_atomic)
/// - true compare-and-set semantics for the conditional updates: the status
///   check and the write happen as one step inside the store.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists an order row together with all its item rows.
    ///
    /// Either every row becomes visible or none does. A duplicate order id
    /// fails with `DuplicateOrder`. Returns the items with their assigned ids.
    async fn create_atomic(&self, order: &Order, items: Vec<NewOrderItem>)
    -> Result<Vec<OrderItem>>;

    /// Applies `update` to the order only if its current status is one of
    /// `where_status_in`.
    ///
    /// Returns the number of rows changed (0 or 1).
    async fn conditional_update(
        &self,
        order_id: &OrderId,
        where_status_in: &[OrderStatus],
        update: &StatusUpdate,
    ) -> Result<u64>;

    /// Applies `update` to every order matching `filter`.
    ///
    /// The filter must carry a status predicate, otherwise `UnguardedUpdate`
    /// is returned. Paging fields are ignored. Returns the number of rows changed.
    async fn update_matching(&self, filter: &OrderFilter, update: &StatusUpdate) -> Result<u64>;

    /// Retrieves orders matching a filter, newest first.
    async fn find(&self, filter: &OrderFilter) -> Result<Vec<Order>>;

    /// Counts rows with the given order id (0 or 1).
    async fn count_by_order_id(&self, order_id: &OrderId) -> Result<u64>;

    /// Retrieves a single order.
    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>>;

    /// Retrieves an order's items in insertion order.
    async fn get_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>>;
}

/// Extension trait providing convenience methods for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Checks if an order exists.
    async fn order_exists(&self, order_id: &OrderId) -> Result<bool> {
        Ok(self.count_by_order_id(order_id).await? > 0)
    }

    /// Returns the current status of an order, if it exists.
    async fn current_status(&self, order_id: &OrderId) -> Result<Option<OrderStatus>> {
        Ok(self.get_order(order_id).await?.map(|order| order.status))
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}
