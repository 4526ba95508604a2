//! Periodic removal of admission state that no window can count anymore.

use chrono::{DateTime, Utc};
use tokio_cron_scheduler::JobSchedulerError;

use quotagate_core::{AdmissionGate, QuotaStoreError};

use super::{Scheduler, SchedulerConfig};
use crate::state::AppState;

/// Purge everything older than the longest configured window.
///
/// The cutoff lies before every identifier's live window, so a sweep never
/// changes a live count and running it again removes nothing new.
pub async fn sweep_expired(
    gate: &AdmissionGate,
    now: DateTime<Utc>,
) -> Result<u64, QuotaStoreError> {
    let Some(longest) = gate.policies().longest_window() else {
        return Ok(0);
    };

    let cutoff = now - longest;
    let removed = gate.store().purge_expired(cutoff).await?;
    if removed > 0 {
        tracing::info!(removed, cutoff = %cutoff, "Expired admission state purged");
    }
    Ok(removed)
}

/// Register the sweep job and start the scheduler.
pub async fn start_sweeper(state: &AppState) -> Result<Scheduler, JobSchedulerError> {
    let scheduler = Scheduler::new(SchedulerConfig::from_env()).await?;
    scheduler
        .add_sweep(state.gate.clone(), state.clock.clone())
        .await?;
    scheduler.start().await?;
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use std::sync::Arc;
    use std::time::Duration;

    use quotagate_core::PolicyRegistry;
    use quotagate_core::ports::QuotaStore;
    use quotagate_infra::InMemoryWindowCounter;

    #[tokio::test]
    async fn test_sweep_keeps_live_windows() {
        let policies = PolicyRegistry::from_entries([
            ("user_a", 5, Duration::from_secs(10)),
            ("user_c", 5, Duration::from_secs(60)),
        ])
        .unwrap();
        let store: Arc<dyn QuotaStore> = Arc::new(InMemoryWindowCounter::new());
        let gate = AdmissionGate::new(Arc::new(policies), store);
        let t0 = Utc::now();

        gate.decide("user_a", t0).await;
        gate.decide("user_c", t0 + TimeDelta::seconds(50)).await;

        // user_a's window ended at t0+10; user_c's runs until t0+110
        let now = t0 + TimeDelta::seconds(100);
        assert_eq!(sweep_expired(&gate, now).await.unwrap(), 1);
        assert_eq!(sweep_expired(&gate, now).await.unwrap(), 0);

        let decision = gate.decide("user_c", now).await;
        assert!(matches!(
            decision,
            quotagate_core::Decision::Allow { remaining: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_sweep_without_policies_is_noop() {
        let store: Arc<dyn QuotaStore> = Arc::new(InMemoryWindowCounter::new());
        let gate = AdmissionGate::new(Arc::new(PolicyRegistry::default()), store);
        assert_eq!(sweep_expired(&gate, Utc::now()).await.unwrap(), 0);
    }
}
