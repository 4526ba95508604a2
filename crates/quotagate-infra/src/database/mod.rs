//! Database connection management and entities.

mod connections;

pub mod entity;

pub use connections::{DatabaseConfig, connect};
