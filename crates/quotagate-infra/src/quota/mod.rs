//! Quota store implementations - PostgreSQL, Redis and in-memory.

mod memory;

pub use memory::InMemoryWindowCounter;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub use postgres::TransactionalWindowCounter;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisWindowCounter};
