//! Domain-level error types.

use std::time::Duration;

use thiserror::Error;

/// Domain errors - invalid policies and other business rule failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid policy for '{identifier}': {reason}")]
    InvalidPolicy {
        identifier: String,
        reason: &'static str,
    },
}

/// Quota store errors, one variant per step that can fail.
///
/// A store never converts one of these into an allow or a quota denial;
/// the gate surfaces them unchanged so infrastructure failure stays
/// distinguishable from throttling.
#[derive(Debug, Clone, Error)]
pub enum QuotaStoreError {
    #[error("Failed to begin transaction: {0}")]
    BeginTransaction(String),

    #[error("Failed to clean up expired admissions: {0}")]
    CleanUp(String),

    #[error("Failed to count admissions: {0}")]
    Count(String),

    #[error("Failed to record admission: {0}")]
    Record(String),

    #[error("Failed to commit transaction: {0}")]
    Commit(String),

    #[error("Counter store connection failed: {0}")]
    Connection(String),

    #[error("Failed to read counter: {0}")]
    ReadCounter(String),

    #[error("Failed to increment counter: {0}")]
    Increment(String),

    #[error("Failed to set counter expiration: {0}")]
    SetExpiration(String),

    #[error("Quota store did not answer within {0:?}")]
    Timeout(Duration),
}
