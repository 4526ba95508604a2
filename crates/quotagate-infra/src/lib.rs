//! # Quotagate Infrastructure
//!
//! Concrete implementations of the ports defined in `quotagate-core`.
//! This crate contains the quota stores and the database they persist to.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - Transactional window counter on PostgreSQL via SeaORM
//! - `redis` - Atomic window counter on Redis

#[cfg(feature = "postgres")]
pub mod database;
pub mod quota;

// Re-exports - In-Memory
pub use quota::InMemoryWindowCounter;

// Re-exports - PostgreSQL
#[cfg(feature = "postgres")]
pub use database::DatabaseConfig;
#[cfg(feature = "postgres")]
pub use quota::TransactionalWindowCounter;

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use quota::{RedisConfig, RedisWindowCounter};
