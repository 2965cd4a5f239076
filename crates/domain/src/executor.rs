//! Conditional status transitions.
//!
//! Every transition is a single compare-and-set in the store:
//! `status = target WHERE order_id = ? AND status IN (required prior)`.
//! No in-process lock is taken. Of two racing transitions from the same prior
//! status exactly one changes the row; the other sees zero rows affected and
//! is reported as `InvalidStateTransition`.

use std::time::Duration;

use chrono::Utc;
use order_store::{OrderStore, OrderStoreExt, StatusUpdate};

use crate::deadline;
use crate::error::OrderError;
use crate::lifecycle::{Milestone, Transition};
use crate::OrderId;

/// Extra fields a transition may write alongside the status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionFields {
    /// Required by `Pay`, rejected by every other transition.
    pub payment_method: Option<String>,
}

impl TransitionFields {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn paid_with(method: impl Into<String>) -> Self {
        Self {
            payment_method: Some(method.into()),
        }
    }
}

/// Applies lifecycle transitions through the store's conditional update.
#[derive(Clone)]
pub struct TransitionExecutor<S> {
    store: S,
    deadline: Duration,
}

impl<S: OrderStore> TransitionExecutor<S> {
    pub fn new(store: S, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    /// Applies a transition by name.
    pub async fn transition_named(
        &self,
        order_id: &OrderId,
        name: &str,
        fields: TransitionFields,
    ) -> Result<(), OrderError> {
        let transition: Transition = name.parse()?;
        self.transition(order_id, transition, fields).await
    }

    /// Applies `transition` to the order if its current status allows it.
    #[tracing::instrument(skip_all, fields(order_id = %order_id, transition = %transition))]
    pub async fn transition(
        &self,
        order_id: &OrderId,
        transition: Transition,
        extra: TransitionFields,
    ) -> Result<(), OrderError> {
        if order_id.is_empty() {
            return Err(OrderError::InvalidInput("order id is required".to_string()));
        }

        let now = Utc::now();
        let mut update = StatusUpdate::to(transition.target(), now);
        update = match transition.milestone() {
            Some(Milestone::Paid) => update.paid_at(now),
            Some(Milestone::Shipped) => update.shipped_at(now),
            Some(Milestone::Delivered) => update.delivered_at(now),
            None => update,
        };

        match (transition, extra.payment_method) {
            (Transition::Pay, Some(method)) if !method.trim().is_empty() => {
                update = update.payment_method(method);
            }
            (Transition::Pay, _) => {
                return Err(OrderError::InvalidInput(
                    "payment method is required".to_string(),
                ));
            }
            (_, Some(_)) => {
                return Err(OrderError::InvalidInput(format!(
                    "{transition} does not accept a payment method"
                )));
            }
            (_, None) => {}
        }

        let changed = deadline::within(
            self.deadline,
            "transition order",
            self.store
                .conditional_update(order_id, transition.required_prior(), &update),
        )
        .await?;

        if changed > 0 {
            metrics::counter!("order_transitions_total", "transition" => transition.name())
                .increment(1);
            tracing::info!(status = %transition.target(), "order transitioned");
            return Ok(());
        }

        Err(self.diagnose(order_id, transition).await?)
    }

    /// Explains why a conditional update changed nothing.
    async fn diagnose(
        &self,
        order_id: &OrderId,
        transition: Transition,
    ) -> Result<OrderError, OrderError> {
        let exists = deadline::within(
            self.deadline,
            "count order",
            self.store.order_exists(order_id),
        )
        .await?;
        if !exists {
            return Ok(OrderError::OrderNotFound(order_id.clone()));
        }

        let current = deadline::within(
            self.deadline,
            "load order status",
            self.store.current_status(order_id),
        )
        .await?;

        Ok(match current {
            Some(current) => {
                metrics::counter!(
                    "order_transition_conflicts_total",
                    "transition" => transition.name()
                )
                .increment(1);
                tracing::debug!(%current, "transition rejected by current status");
                OrderError::InvalidStateTransition {
                    order_id: order_id.clone(),
                    current,
                    transition,
                }
            }
            None => OrderError::OrderNotFound(order_id.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use order_store::{Address, InMemoryOrderStore, NewOrderItem, Order};

    use crate::{Money, OrderStatus, ProductId, UserId};

    async fn seed(store: &InMemoryOrderStore, id: &str, status: OrderStatus) -> OrderId {
        let now = Utc::now();
        let order = Order {
            order_id: OrderId::new(id),
            user_id: UserId::new(1),
            currency: "USD".to_string(),
            total_amount: Money::from_cents(1000),
            item_count: 1,
            address: Address::default(),
            email: "a@example.com".to_string(),
            status,
            payment_method: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
        };
        let item = NewOrderItem {
            product_id: ProductId::new(1),
            product_name: "widget".to_string(),
            quantity: 1,
            unit_price: Money::from_cents(1000),
            cost: Money::from_cents(1000),
        };
        store.create_atomic(&order, vec![item]).await.unwrap();
        order.order_id
    }

    fn executor(store: &InMemoryOrderStore) -> TransitionExecutor<InMemoryOrderStore> {
        TransitionExecutor::new(store.clone(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn pay_sets_method_and_timestamps() {
        let store = InMemoryOrderStore::new();
        let id = seed(&store, "o-1", OrderStatus::Pending).await;

        executor(&store)
            .transition(&id, Transition::Pay, TransitionFields::paid_with("alipay"))
            .await
            .unwrap();

        let order = store.get_order(&id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_method.as_deref(), Some("alipay"));
        assert_eq!(order.paid_at, Some(order.updated_at));
        assert!(order.updated_at >= order.created_at);
        assert_eq!(order.shipped_at, None);
    }

    #[tokio::test]
    async fn ship_and_deliver_stamp_their_milestones() {
        let store = InMemoryOrderStore::new();
        let id = seed(&store, "o-1", OrderStatus::Paid).await;
        let executor = executor(&store);

        executor
            .transition(&id, Transition::Ship, TransitionFields::none())
            .await
            .unwrap();
        executor
            .transition(&id, Transition::Deliver, TransitionFields::none())
            .await
            .unwrap();

        let order = store.get_order(&id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.shipped_at.is_some());
        assert_eq!(order.delivered_at, Some(order.updated_at));
    }

    #[tokio::test]
    async fn cancel_from_pending_and_paid() {
        let store = InMemoryOrderStore::new();
        let pending = seed(&store, "pending", OrderStatus::Pending).await;
        let paid = seed(&store, "paid", OrderStatus::Paid).await;
        let executor = executor(&store);

        for id in [&pending, &paid] {
            executor
                .transition(id, Transition::Cancel, TransitionFields::none())
                .await
                .unwrap();
            let order = store.get_order(id).await.unwrap().unwrap();
            assert_eq!(order.status, OrderStatus::Cancelled);
        }
    }

    #[tokio::test]
    async fn cancel_from_shipped_reports_current_status() {
        let store = InMemoryOrderStore::new();
        let id = seed(&store, "o-1", OrderStatus::Shipped).await;

        let result = executor(&store)
            .transition(&id, Transition::Cancel, TransitionFields::none())
            .await;

        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition {
                current: OrderStatus::Shipped,
                transition: Transition::Cancel,
                ..
            })
        ));
        let order = store.get_order(&id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let store = InMemoryOrderStore::new();
        let missing = OrderId::new("missing");

        let result = executor(&store)
            .transition(&missing, Transition::Ship, TransitionFields::none())
            .await;

        assert!(matches!(result, Err(OrderError::OrderNotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn empty_order_id_is_invalid() {
        let store = InMemoryOrderStore::new();
        let result = executor(&store)
            .transition(&OrderId::new(""), Transition::Ship, TransitionFields::none())
            .await;

        assert!(matches!(result, Err(OrderError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn pay_requires_payment_method() {
        let store = InMemoryOrderStore::new();
        let id = seed(&store, "o-1", OrderStatus::Pending).await;
        let executor = executor(&store);

        let missing = executor
            .transition(&id, Transition::Pay, TransitionFields::none())
            .await;
        let blank = executor
            .transition(&id, Transition::Pay, TransitionFields::paid_with(" "))
            .await;

        assert!(matches!(missing, Err(OrderError::InvalidInput(_))));
        assert!(matches!(blank, Err(OrderError::InvalidInput(_))));
        let order = store.get_order(&id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn payment_method_only_on_pay() {
        let store = InMemoryOrderStore::new();
        let id = seed(&store, "o-1", OrderStatus::Paid).await;

        let result = executor(&store)
            .transition(&id, Transition::Ship, TransitionFields::paid_with("card"))
            .await;

        assert!(matches!(result, Err(OrderError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn unknown_transition_name() {
        let store = InMemoryOrderStore::new();
        let id = seed(&store, "o-1", OrderStatus::Pending).await;

        let result = executor(&store)
            .transition_named(&id, "archive", TransitionFields::none())
            .await;

        assert!(matches!(result, Err(OrderError::InvalidTransition(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_pay_has_one_winner() {
        let store = InMemoryOrderStore::new();
        let id = seed(&store, "o-1", OrderStatus::Pending).await;
        let executor = executor(&store);

        let (first, second) = tokio::join!(
            executor.transition(&id, Transition::Pay, TransitionFields::paid_with("card")),
            executor.transition(&id, Transition::Pay, TransitionFields::paid_with("alipay")),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(
                    r,
                    Err(OrderError::InvalidStateTransition {
                        current: OrderStatus::Paid,
                        ..
                    })
                ))
                .count(),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_ship_and_cancel_have_one_winner() {
        let store = InMemoryOrderStore::new();
        let id = seed(&store, "o-1", OrderStatus::Paid).await;
        let executor = executor(&store);

        let (ship, cancel) = tokio::join!(
            executor.transition(&id, Transition::Ship, TransitionFields::none()),
            executor.transition(&id, Transition::Cancel, TransitionFields::none()),
        );

        assert!(ship.is_ok() ^ cancel.is_ok());
        let order = store.get_order(&id).await.unwrap().unwrap();
        let expected = if ship.is_ok() {
            OrderStatus::Shipped
        } else {
            OrderStatus::Cancelled
        };
        assert_eq!(order.status, expected);
    }
}
