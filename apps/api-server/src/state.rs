//! Application state - shared across all handlers.

use std::sync::Arc;

use anyhow::Context;

use quotagate_core::ports::{Clock, QuotaStore, SystemClock};
use quotagate_core::{AdmissionGate, PolicyRegistry};
use quotagate_infra::InMemoryWindowCounter;

#[cfg(feature = "postgres")]
use quotagate_infra::{TransactionalWindowCounter, database};
#[cfg(feature = "redis")]
use quotagate_infra::RedisWindowCounter;

use crate::config::{AppConfig, StoreKind};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gate: AdmissionGate,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Build the application state with the configured quota store.
    pub async fn new(config: &AppConfig, policies: PolicyRegistry) -> anyhow::Result<Self> {
        let store = match connect_store(config).await {
            Ok(store) => store,
            Err(e) if config.fallback_to_memory => {
                tracing::error!(
                    store = %config.store,
                    error = %format!("{e:#}"),
                    "Quota store unavailable. Using in-memory fallback."
                );
                Arc::new(InMemoryWindowCounter::new())
            }
            Err(e) => return Err(e),
        };

        let gate = AdmissionGate::new(Arc::new(policies), store)
            .with_budget(config.decision_timeout);

        tracing::info!(
            backend = gate.store().backend(),
            policies = gate.policies().len(),
            "Application state initialized"
        );

        Ok(Self {
            gate,
            clock: Arc::new(SystemClock),
        })
    }
}

async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn QuotaStore>> {
    match config.store {
        StoreKind::Memory => {
            tracing::warn!("Using in-memory quota store; counters are per-process");
            Ok(Arc::new(InMemoryWindowCounter::new()))
        }
        #[cfg(feature = "postgres")]
        StoreKind::Postgres => {
            let db_config = config
                .database
                .as_ref()
                .context("DATABASE_URL is required for the postgres quota store")?;
            let db = database::connect(db_config)
                .await
                .context("Failed to connect to database")?;
            Ok(Arc::new(TransactionalWindowCounter::new(db)))
        }
        #[cfg(feature = "redis")]
        StoreKind::Redis => {
            let store = RedisWindowCounter::new(config.redis.clone())
                .await
                .context("Failed to connect to Redis")?;
            Ok(Arc::new(store))
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("quota store '{other}' is not compiled into this build"),
    }
}
