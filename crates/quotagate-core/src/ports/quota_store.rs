//! Quota store port.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::Policy;
use crate::error::QuotaStoreError;

/// Quota store - abstraction over the backends that track admissions.
///
/// Every implementation owns its own mutual-exclusion discipline: the check
/// against the limit and the recording of the admission happen as one
/// atomic step per identifier.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Check the identifier's usage against `policy` and record a new
    /// admission when it fits.
    async fn try_admit(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
        policy: &Policy,
    ) -> Result<Admission, QuotaStoreError>;

    /// Drop state that stopped counting before `cutoff`.
    ///
    /// Returns how many entries were removed. Stores that evict by TTL
    /// have nothing to do.
    async fn purge_expired(&self, _cutoff: DateTime<Utc>) -> Result<u64, QuotaStoreError> {
        Ok(0)
    }

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Result of a successful store round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed {
        remaining: u32,
    },
    Denied {
        /// Time until the current window ends, when the store knows it.
        retry_after: Option<Duration>,
    },
}
