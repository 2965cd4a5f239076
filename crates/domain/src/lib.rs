//! Domain layer for the order lifecycle engine.
//!
//! This crate provides:
//! - [`lifecycle`]: the order state machine and its transition rules
//! - [`OrderCreator`]: atomic creation of an order with its line items
//! - [`TransitionExecutor`]: conditional, race-free status transitions
//! - [`OrderService`]: the facade transport handlers call

pub mod creator;
mod deadline;
pub mod error;
pub mod executor;
pub mod id;
pub mod lifecycle;
pub mod service;

pub use common::{Money, OrderId, OrderStatus, ProductId, UserId};
pub use creator::{LineItem, OrderCreator, PlaceOrder, PlacedOrder};
pub use error::OrderError;
pub use executor::{TransitionExecutor, TransitionFields};
pub use id::{IdGenerator, TimestampIdGenerator};
pub use lifecycle::{Milestone, Transition};
pub use order_store::{Address, Order, OrderFilter, OrderItem};
pub use service::{DEFAULT_STORE_TIMEOUT, OrderService};
