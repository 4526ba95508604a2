use std::time::Duration;

use crate::error::QuotaStoreError;

/// Outcome of one admission decision.
#[derive(Debug, Clone)]
pub enum Decision {
    /// The request may proceed; the admission has been recorded.
    Allow { limit: u32, remaining: u32 },
    Deny(DenyReason),
}

/// Why a request was not admitted.
#[derive(Debug, Clone)]
pub enum DenyReason {
    /// The request carried no identifier.
    NoIdentifier,
    /// No policy is configured for the identifier.
    NoPolicy,
    /// The identifier used up its quota for the current window.
    RateLimitExceeded {
        limit: u32,
        retry_after: Option<Duration>,
    },
    /// The quota store failed; the request is denied (fail closed).
    StoreFailure(QuotaStoreError),
}
