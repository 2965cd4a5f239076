use chrono::{DateTime, Utc};

use crate::{Order, OrderId, OrderStatus, UserId};

/// Predicate over order rows.
///
/// Used both to select orders and, for bulk updates, as the compare-and-set
/// guard. Time bounds are exclusive on both ends.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Filter by order id.
    pub order_id: Option<OrderId>,

    /// Filter by owning user.
    pub user_id: Option<UserId>,

    /// Filter by status (any of these).
    pub statuses: Option<Vec<OrderStatus>>,

    /// Orders created strictly after this instant.
    pub created_after: Option<DateTime<Utc>>,

    /// Orders created strictly before this instant.
    pub created_before: Option<DateTime<Utc>>,

    /// Maximum number of orders to return. Ignored by bulk updates.
    pub limit: Option<usize>,

    /// Number of orders to skip. Ignored by bulk updates.
    pub offset: Option<usize>,
}

impl OrderFilter {
    /// Creates a filter matching every order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter for all orders of one user.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    /// Creates a filter for orders in a single status.
    pub fn with_status(status: OrderStatus) -> Self {
        Self {
            statuses: Some(vec![status]),
            ..Default::default()
        }
    }

    pub fn order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Filters by multiple statuses (any of these).
    pub fn statuses(mut self, statuses: Vec<OrderStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    pub fn created_after(mut self, instant: DateTime<Utc>) -> Self {
        self.created_after = Some(instant);
        self
    }

    pub fn created_before(mut self, instant: DateTime<Utc>) -> Self {
        self.created_before = Some(instant);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if a status predicate is present and non-empty.
    pub fn is_status_guarded(&self) -> bool {
        self.statuses.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// Evaluates the predicate against a row. Paging is not considered.
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(ref id) = self.order_id
            && &order.order_id != id
        {
            return false;
        }
        if let Some(user_id) = self.user_id
            && order.user_id != user_id
        {
            return false;
        }
        if let Some(ref statuses) = self.statuses
            && !statuses.contains(&order.status)
        {
            return false;
        }
        if let Some(after) = self.created_after
            && order.created_at <= after
        {
            return false;
        }
        if let Some(before) = self.created_before
            && order.created_at >= before
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{Address, Money};

    fn order_at(status: OrderStatus, created_at: DateTime<Utc>) -> Order {
        Order {
            order_id: OrderId::new("o-1"),
            user_id: UserId::new(7),
            currency: "CNY".to_string(),
            total_amount: Money::from_cents(100),
            item_count: 1,
            address: Address::default(),
            email: "a@example.com".to_string(),
            status,
            payment_method: None,
            created_at,
            updated_at: created_at,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
        }
    }

    #[test]
    fn filter_builder_chain() {
        let now = Utc::now();
        let filter = OrderFilter::for_user(UserId::new(7))
            .statuses(vec![OrderStatus::Pending, OrderStatus::Paid])
            .created_before(now)
            .limit(10)
            .offset(5);

        assert_eq!(filter.user_id, Some(UserId::new(7)));
        assert_eq!(filter.created_before, Some(now));
        assert_eq!(filter.limit, Some(10));
        assert_eq!(filter.offset, Some(5));
        assert!(filter.is_status_guarded());
    }

    #[test]
    fn empty_status_list_is_not_a_guard() {
        assert!(!OrderFilter::new().is_status_guarded());
        assert!(!OrderFilter::new().statuses(vec![]).is_status_guarded());
    }

    #[test]
    fn time_bounds_are_exclusive() {
        let t = Utc::now();
        let order = order_at(OrderStatus::Pending, t);

        assert!(!OrderFilter::new().created_before(t).matches(&order));
        assert!(!OrderFilter::new().created_after(t).matches(&order));
        assert!(
            OrderFilter::new()
                .created_after(t - Duration::seconds(1))
                .created_before(t + Duration::seconds(1))
                .matches(&order)
        );
    }

    #[test]
    fn status_and_user_predicates() {
        let order = order_at(OrderStatus::Paid, Utc::now());

        assert!(OrderFilter::with_status(OrderStatus::Paid).matches(&order));
        assert!(!OrderFilter::with_status(OrderStatus::Pending).matches(&order));
        assert!(!OrderFilter::for_user(UserId::new(8)).matches(&order));
        assert!(
            OrderFilter::new()
                .order_id(OrderId::new("o-1"))
                .matches(&order)
        );
    }
}
