//! Shared types for the order lifecycle engine.
//!
//! Identifiers, money and the closed order status set live here so the store,
//! the domain layer and the scheduler agree on a single representation.

mod money;
mod status;
mod types;

pub use money::{Money, ParseMoneyError};
pub use status::{OrderStatus, ParseStatusError};
pub use types::{OrderId, ProductId, UserId};
