//! # Quotagate Shared
//!
//! Wire types shared between the gate and its clients.

pub mod dto;
pub mod response;

pub use response::{ErrorCode, ErrorResponse};
