//! Order state machine.
//!
//! ```text
//! pending ──pay──► paid ──ship──► shipped ──deliver──► delivered
//!    │               │
//!    │               ├──refund──► refunded
//!    └───cancel──────┴──cancel──► cancelled
//! ```
//!
//! Pure functions only. The executor asks this module which statuses a
//! transition may start from and what it writes; the store does the rest.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::OrderStatus;
use crate::error::OrderError;

/// A named, validated change of an order's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Pay,
    Ship,
    Deliver,
    Cancel,
    Refund,
}

/// Timestamp column a transition stamps exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Milestone {
    Paid,
    Shipped,
    Delivered,
}

impl Transition {
    pub const ALL: [Transition; 5] = [
        Transition::Pay,
        Transition::Ship,
        Transition::Deliver,
        Transition::Cancel,
        Transition::Refund,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Transition::Pay => "pay",
            Transition::Ship => "ship",
            Transition::Deliver => "deliver",
            Transition::Cancel => "cancel",
            Transition::Refund => "refund",
        }
    }

    /// The status an order holds after this transition.
    pub fn target(&self) -> OrderStatus {
        match self {
            Transition::Pay => OrderStatus::Paid,
            Transition::Ship => OrderStatus::Shipped,
            Transition::Deliver => OrderStatus::Delivered,
            Transition::Cancel => OrderStatus::Cancelled,
            Transition::Refund => OrderStatus::Refunded,
        }
    }

    /// Statuses this transition may start from.
    ///
    /// A single status for every transition except `Cancel`, which is legal
    /// both before and after payment.
    pub fn required_prior(&self) -> &'static [OrderStatus] {
        match self {
            Transition::Pay => &[OrderStatus::Pending],
            Transition::Ship => &[OrderStatus::Paid],
            Transition::Deliver => &[OrderStatus::Shipped],
            Transition::Cancel => &[OrderStatus::Pending, OrderStatus::Paid],
            Transition::Refund => &[OrderStatus::Paid],
        }
    }

    pub fn milestone(&self) -> Option<Milestone> {
        match self {
            Transition::Pay => Some(Milestone::Paid),
            Transition::Ship => Some(Milestone::Shipped),
            Transition::Deliver => Some(Milestone::Delivered),
            Transition::Cancel | Transition::Refund => None,
        }
    }

    /// Returns true if this transition may start from `status`.
    pub fn allows_from(&self, status: OrderStatus) -> bool {
        self.required_prior().contains(&status)
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Transition {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Transition::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| OrderError::InvalidTransition(s.to_string()))
    }
}

/// Looks up the statuses a named transition may start from.
pub fn required_prior_for(name: &str) -> Result<&'static [OrderStatus], OrderError> {
    Ok(name.parse::<Transition>()?.required_prior())
}

/// Applies a transition to a status, returning the new status if legal.
///
/// Total over every (status, transition) pair.
pub fn apply(from: OrderStatus, transition: Transition) -> Option<OrderStatus> {
    transition
        .allows_from(from)
        .then(|| transition.target())
}

/// Returns the transition that moves `from` to `to`, if one exists.
pub fn transition_between(from: OrderStatus, to: OrderStatus) -> Option<Transition> {
    Transition::ALL
        .into_iter()
        .find(|t| t.target() == to && t.allows_from(from))
}
