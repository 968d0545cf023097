pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use memory::MemoryEventStore;
pub use postgres::{create_pool, PgEventStore};
pub use redis::{create_redis_client, PredictionCache};
pub use store::EventStore;

#[cfg(test)]
pub use store::MockEventStore;
