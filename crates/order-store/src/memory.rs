use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    NewOrderItem, Order, OrderFilter, OrderId, OrderItem, OrderStatus, Result, StoreError,
    store::{OrderStore, StatusUpdate},
};

#[derive(Debug, Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    items: Vec<OrderItem>,
    next_item_id: i64,
}

/// In-memory order store implementation for testing.
///
/// Every mutation runs under a single write lock, so the conditional updates
/// are true compare-and-set operations. Faults can be injected to exercise
/// the error paths of callers.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<Tables>>,
    unavailable: Arc<AtomicBool>,
    latency_ms: Arc<AtomicU64>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the total number of item rows stored.
    pub async fn item_count(&self) -> usize {
        self.tables.read().await.items.len()
    }

    /// Clears all orders and items.
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        tables.orders.clear();
        tables.items.clear();
    }

    /// Makes every subsequent call fail with `Unavailable` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delays every subsequent call by `latency` before it touches any data.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn enter(&self) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_atomic(
        &self,
        order: &Order,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>> {
        self.enter().await?;

        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.order_id) {
            return Err(StoreError::DuplicateOrder(order.order_id.clone()));
        }

        let mut created = Vec::with_capacity(items.len());
        for item in items {
            tables.next_item_id += 1;
            created.push(OrderItem::from_new(
                tables.next_item_id,
                order.order_id.clone(),
                item,
            ));
        }

        tables.orders.insert(order.order_id.clone(), order.clone());
        tables.items.extend(created.iter().cloned());

        Ok(created)
    }

    async fn conditional_update(
        &self,
        order_id: &OrderId,
        where_status_in: &[OrderStatus],
        update: &StatusUpdate,
    ) -> Result<u64> {
        self.enter().await?;

        let mut tables = self.tables.write().await;
        match tables.orders.get_mut(order_id) {
            Some(order) if where_status_in.contains(&order.status) => {
                update.apply_to(order);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn update_matching(&self, filter: &OrderFilter, update: &StatusUpdate) -> Result<u64> {
        if !filter.is_status_guarded() {
            return Err(StoreError::UnguardedUpdate);
        }
        self.enter().await?;

        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for order in tables.orders.values_mut().filter(|o| filter.matches(o)) {
            update.apply_to(order);
            changed += 1;
        }
        Ok(changed)
    }

    async fn find(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        self.enter().await?;

        let tables = self.tables.read().await;
        let mut orders: Vec<_> = tables
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();

        // Newest first, ties broken by id
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_id.cmp(&a.order_id))
        });

        let offset = filter.offset.unwrap_or(0);
        let orders = orders.into_iter().skip(offset);
        let orders = match filter.limit {
            Some(limit) => orders.take(limit).collect(),
            None => orders.collect(),
        };

        Ok(orders)
    }

    async fn count_by_order_id(&self, order_id: &OrderId) -> Result<u64> {
        self.enter().await?;
        let tables = self.tables.read().await;
        Ok(u64::from(tables.orders.contains_key(order_id)))
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.enter().await?;
        let tables = self.tables.read().await;
        Ok(tables.orders.get(order_id).cloned())
    }

    async fn get_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>> {
        self.enter().await?;
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .iter()
            .filter(|item| &item.order_id == order_id)
            .cloned()
            .collect())
    }
}
