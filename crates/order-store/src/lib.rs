pub mod error;
pub mod filter;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::{Money, OrderId, OrderStatus, ProductId, UserId};
pub use error::{Result, StoreError};
pub use filter::OrderFilter;
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use record::{Address, NewOrderItem, Order, OrderItem};
pub use store::{OrderStore, OrderStoreExt, StatusUpdate};
