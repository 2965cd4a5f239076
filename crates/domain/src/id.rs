//! Order id generation.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::{OrderId, UserId};

/// Produces identifiers for new orders.
///
/// Uniqueness is probabilistic; the store's primary key is the final arbiter
/// and a collision surfaces as a failed creation.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self, user_id: UserId, at: DateTime<Utc>) -> OrderId;
}

/// Creation timestamp to the microsecond, followed by the user id and four
/// random digits: `yyMMddHHmmss` `ffffff` `<user>` `rrrr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampIdGenerator;

impl IdGenerator for TimestampIdGenerator {
    fn next_id(&self, user_id: UserId, at: DateTime<Utc>) -> OrderId {
        let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
        OrderId::new(format!(
            "{}{}{:04}",
            at.format("%y%m%d%H%M%S%6f"),
            user_id,
            suffix
        ))
    }
}
