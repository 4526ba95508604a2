//! Admission decision procedure.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{Decision, DenyReason, PolicyRegistry};
use crate::error::QuotaStoreError;
use crate::ports::{Admission, QuotaStore};

/// Decides whether a request for an identifier is admitted.
///
/// Holds no mutable state of its own; any number of callers may share one
/// gate. Policies are injected at construction and never change.
#[derive(Clone)]
pub struct AdmissionGate {
    policies: Arc<PolicyRegistry>,
    store: Arc<dyn QuotaStore>,
    budget: Duration,
}

impl AdmissionGate {
    /// Default time budget for one store round-trip.
    pub const DEFAULT_BUDGET: Duration = Duration::from_secs(2);

    pub fn new(policies: Arc<PolicyRegistry>, store: Arc<dyn QuotaStore>) -> Self {
        Self {
            policies,
            store,
            budget: Self::DEFAULT_BUDGET,
        }
    }

    /// Override the time budget after which a store call counts as failed.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    pub fn store(&self) -> &Arc<dyn QuotaStore> {
        &self.store
    }

    pub async fn decide(&self, identifier: &str, now: DateTime<Utc>) -> Decision {
        if identifier.is_empty() {
            return Decision::Deny(DenyReason::NoIdentifier);
        }

        let Some(policy) = self.policies.lookup(identifier) else {
            tracing::debug!(identifier = %identifier, "No rate limit configured");
            return Decision::Deny(DenyReason::NoPolicy);
        };

        let attempt = self.store.try_admit(identifier, now, policy);
        let outcome = match tokio::time::timeout(self.budget, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => Err(QuotaStoreError::Timeout(self.budget)),
        };

        match outcome {
            Ok(Admission::Allowed { remaining }) => Decision::Allow {
                limit: policy.limit(),
                remaining,
            },
            Ok(Admission::Denied { retry_after }) => {
                tracing::warn!(
                    identifier = %identifier,
                    limit = policy.limit(),
                    "Rate limit exceeded"
                );
                Decision::Deny(DenyReason::RateLimitExceeded {
                    limit: policy.limit(),
                    retry_after,
                })
            }
            Err(e) => {
                tracing::error!(
                    identifier = %identifier,
                    backend = self.store.backend(),
                    error = %e,
                    "Quota store failed, denying request"
                );
                Decision::Deny(DenyReason::StoreFailure(e))
            }
        }
    }
}
