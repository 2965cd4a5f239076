//! Atomic order creation.

use std::time::Duration;

use chrono::Utc;
use order_store::{Address, NewOrderItem, Order, OrderItem, OrderStore};

use crate::deadline;
use crate::error::OrderError;
use crate::id::IdGenerator;
use crate::{Money, OrderStatus, ProductId, UserId};

/// A requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    /// Line cost as stated by the caller. Must equal `quantity × unit_price`
    /// when present; computed otherwise.
    pub cost: Option<Money>,
}

impl LineItem {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            cost: None,
        }
    }

    pub fn with_cost(mut self, cost: Money) -> Self {
        self.cost = Some(cost);
        self
    }

    fn into_new_item(self, index: usize) -> Result<NewOrderItem, OrderError> {
        if self.quantity == 0 {
            return Err(OrderError::InvalidInput(format!(
                "item {index}: quantity must be positive"
            )));
        }
        if self.unit_price.is_negative() {
            return Err(OrderError::InvalidInput(format!(
                "item {index}: unit price must not be negative"
            )));
        }

        let computed = self.unit_price.checked_multiply(self.quantity).ok_or_else(|| {
            OrderError::InvalidInput(format!("item {index}: cost overflows"))
        })?;
        if let Some(stated) = self.cost.filter(|stated| *stated != computed) {
            return Err(OrderError::InvalidInput(format!(
                "item {index}: cost {stated} does not match {} x {}",
                self.quantity, self.unit_price
            )));
        }

        Ok(NewOrderItem {
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price: self.unit_price,
            cost: computed,
        })
    }
}

/// Request to place a new order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub user_id: UserId,
    pub currency: String,
    pub address: Address,
    pub email: String,
    pub items: Vec<LineItem>,
}

/// A persisted order together with its items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Validates a `PlaceOrder` request and persists the order and its items as
/// one atomic unit.
#[derive(Clone)]
pub struct OrderCreator<S, G> {
    store: S,
    ids: G,
    deadline: Duration,
}

impl<S, G> OrderCreator<S, G>
where
    S: OrderStore,
    G: IdGenerator,
{
    pub fn new(store: S, ids: G, deadline: Duration) -> Self {
        Self {
            store,
            ids,
            deadline,
        }
    }

    /// Places an order.
    ///
    /// Validation failures return `InvalidInput` before any write. A failure
    /// of the atomic unit returns `CreationFailed` (or `Timeout`) and leaves no
    /// rows behind.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id))]
    pub async fn place(&self, cmd: PlaceOrder) -> Result<PlacedOrder, OrderError> {
        if !cmd.user_id.is_positive() {
            return Err(OrderError::InvalidInput(
                "user id must be positive".to_string(),
            ));
        }
        if cmd.currency.trim().is_empty() {
            return Err(OrderError::InvalidInput("currency is required".to_string()));
        }
        if cmd.items.is_empty() {
            return Err(OrderError::InvalidInput(
                "order must contain at least one item".to_string(),
            ));
        }

        let items = cmd
            .items
            .into_iter()
            .enumerate()
            .map(|(index, line)| line.into_new_item(index))
            .collect::<Result<Vec<_>, _>>()?;

        let total_amount = items
            .iter()
            .try_fold(Money::zero(), |total, item| total.checked_add(item.cost))
            .ok_or_else(|| OrderError::InvalidInput("order total overflows".to_string()))?;
        let item_count = u32::try_from(items.len())
            .map_err(|_| OrderError::InvalidInput("too many items".to_string()))?;

        let now = Utc::now();
        let order = Order {
            order_id: self.ids.next_id(cmd.user_id, now),
            user_id: cmd.user_id,
            currency: cmd.currency,
            total_amount,
            item_count,
            address: cmd.address,
            email: cmd.email,
            status: OrderStatus::Pending,
            payment_method: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
        };

        let items = deadline::within(
            self.deadline,
            "create order",
            self.store.create_atomic(&order, items),
        )
        .await
        .map_err(|e| match e {
            OrderError::StoreUnavailable(source) => OrderError::CreationFailed(source),
            other => other,
        })?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(
            order_id = %order.order_id,
            user_id = %order.user_id,
            item_count,
            total = %order.total_amount,
            "order placed"
        );

        Ok(PlacedOrder { order, items })
    }
}
