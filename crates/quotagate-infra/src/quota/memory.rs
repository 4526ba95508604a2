//! In-memory fixed window counter - used as fallback when no external store is available.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use quotagate_core::Policy;
use quotagate_core::QuotaStoreError;
use quotagate_core::ports::{Admission, QuotaStore};

struct WindowCounter {
    count: u64,
    expires_at: DateTime<Utc>,
}

impl WindowCounter {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Atomic window counter kept inside the process.
///
/// Every increment happens under one lock, so increments for an identifier
/// are totally ordered and the post-increment value is exact.
/// Note: Counters are per-process and lost on restart.
pub struct InMemoryWindowCounter {
    counters: Mutex<HashMap<String, WindowCounter>>,
}

impl InMemoryWindowCounter {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Number of counters currently held, live or not.
    pub async fn len(&self) -> usize {
        self.counters.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.counters.lock().await.is_empty()
    }
}

impl Default for InMemoryWindowCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuotaStore for InMemoryWindowCounter {
    async fn try_admit(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
        policy: &Policy,
    ) -> Result<Admission, QuotaStoreError> {
        let (count, expires_at) = {
            let mut counters = self.counters.lock().await;
            let counter = counters
                .entry(identifier.to_string())
                .or_insert_with(|| WindowCounter {
                    count: 0,
                    expires_at: now,
                });

            // An expired counter is logically absent: start a fresh window.
            if !counter.is_live(now) {
                counter.count = 0;
                counter.expires_at = now + policy.span();
            }

            counter.count += 1;
            (counter.count, counter.expires_at)
        };

        let limit = u64::from(policy.limit());
        if count > limit {
            let retry_after = (expires_at - now).to_std().unwrap_or(Duration::ZERO);
            return Ok(Admission::Denied {
                retry_after: Some(retry_after),
            });
        }

        Ok(Admission::Allowed {
            remaining: (limit - count) as u32,
        })
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, QuotaStoreError> {
        let mut counters = self.counters.lock().await;
        let before = counters.len();
        counters.retain(|_, counter| counter.is_live(cutoff));
        Ok((before - counters.len()) as u64)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
