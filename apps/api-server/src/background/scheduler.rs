//! Cron scheduler driving the expiry sweep.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

use quotagate_core::AdmissionGate;
use quotagate_core::ports::Clock;

use super::sweep::sweep_expired;

const DEFAULT_SWEEP_SCHEDULE: &str = "0 */5 * * * *";

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// When false, jobs are registered but never fire.
    pub enabled: bool,
    /// Cron expression (with seconds) for the expiry sweep.
    pub sweep_schedule: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_schedule: DEFAULT_SWEEP_SCHEDULE.to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.enabled),
            sweep_schedule: std::env::var("SWEEP_SCHEDULE").unwrap_or(defaults.sweep_schedule),
        }
    }
}

/// Owns the job scheduler that purges expired admission state.
pub struct Scheduler {
    inner: JobScheduler,
    config: SchedulerConfig,
}

impl Scheduler {
    pub async fn new(config: SchedulerConfig) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner, config })
    }

    /// Register the expiry sweep on the configured schedule.
    ///
    /// Each run reads `now` from `clock` and purges through the gate's store.
    /// A failing run is logged and the next tick tries again.
    pub async fn add_sweep(
        &self,
        gate: AdmissionGate,
        clock: Arc<dyn Clock>,
    ) -> Result<Uuid, JobSchedulerError> {
        let schedule = self.config.sweep_schedule.as_str();
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let gate = gate.clone();
            let clock = clock.clone();
            Box::pin(async move {
                if let Err(e) = sweep_expired(&gate, clock.now()).await {
                    tracing::error!(error = %e, "Expiry sweep failed");
                }
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(schedule = %schedule, job_id = %id, "Expiry sweep registered");
        Ok(id)
    }

    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        if !self.config.enabled {
            tracing::info!("Scheduler disabled; expired state is only swept per identifier");
            return Ok(());
        }

        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quotagate_core::PolicyRegistry;
    use quotagate_core::ports::{ManualClock, QuotaStore};
    use quotagate_infra::InMemoryWindowCounter;

    fn gate() -> AdmissionGate {
        let store: Arc<dyn QuotaStore> = Arc::new(InMemoryWindowCounter::new());
        AdmissionGate::new(Arc::new(PolicyRegistry::default()), store)
    }

    #[tokio::test]
    async fn test_sweep_registers_on_default_schedule() {
        let scheduler = Scheduler::new(SchedulerConfig::default()).await.unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));

        assert!(scheduler.add_sweep(gate(), clock).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_sweep_schedule_is_rejected() {
        let config = SchedulerConfig {
            enabled: false,
            sweep_schedule: "every five minutes".to_string(),
        };
        let scheduler = Scheduler::new(config).await.unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));

        assert!(scheduler.add_sweep(gate(), clock).await.is_err());
    }
}
