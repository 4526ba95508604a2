//! PostgreSQL quota store: one row per admission, checked inside a transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectionTrait, DatabaseTransaction, DbConn, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Statement, TransactionTrait,
};

use quotagate_core::Policy;
use quotagate_core::QuotaStoreError;
use quotagate_core::ports::{Admission, QuotaStore};

use crate::database::entity::api_call::{self, Entity as ApiCall};

/// Serializes units of work for one identifier until commit or rollback.
const LOCK_IDENTIFIER_SQL: &str = "SELECT pg_advisory_xact_lock(hashtext($1))";

/// Transactional window counter backed by the `api_calls` table.
///
/// Each call runs as one transaction that first takes an advisory lock
/// scoped to the identifier. Conflicting calls for the same identifier
/// queue on that lock, across every process sharing the database, while
/// unrelated identifiers proceed in parallel.
pub struct TransactionalWindowCounter {
    db: DbConn,
}

impl TransactionalWindowCounter {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    /// Steps run inside the transaction.
    /// Returns the remaining quota when an admission was recorded.
    async fn admit_within(
        txn: &DatabaseTransaction,
        identifier: &str,
        now: DateTime<Utc>,
        policy: &Policy,
    ) -> Result<Option<u32>, QuotaStoreError> {
        let cutoff = now - policy.span();

        let lock = Statement::from_sql_and_values(
            txn.get_database_backend(),
            LOCK_IDENTIFIER_SQL,
            [identifier.into()],
        );
        txn.execute(lock)
            .await
            .map_err(|e| QuotaStoreError::BeginTransaction(e.to_string()))?;

        ApiCall::delete_many()
            .filter(api_call::Column::UserId.eq(identifier))
            .filter(api_call::Column::Timestamp.lt(cutoff))
            .exec(txn)
            .await
            .map_err(|e| QuotaStoreError::CleanUp(e.to_string()))?;

        let count = ApiCall::find()
            .filter(api_call::Column::UserId.eq(identifier))
            .filter(api_call::Column::Timestamp.gte(cutoff))
            .count(txn)
            .await
            .map_err(|e| QuotaStoreError::Count(e.to_string()))?;

        let limit = u64::from(policy.limit());
        if count >= limit {
            tracing::debug!(identifier = %identifier, count, limit, "Quota used up");
            return Ok(None);
        }

        let record = api_call::ActiveModel {
            id: NotSet,
            user_id: Set(identifier.to_owned()),
            timestamp: Set(now.into()),
        };
        ApiCall::insert(record)
            .exec_without_returning(txn)
            .await
            .map_err(|e| QuotaStoreError::Record(e.to_string()))?;

        Ok(Some((limit - count - 1) as u32))
    }

    /// When the oldest live admission leaves the window. Best effort.
    async fn retry_after(
        txn: &DatabaseTransaction,
        identifier: &str,
        now: DateTime<Utc>,
        policy: &Policy,
    ) -> Option<std::time::Duration> {
        let oldest = ApiCall::find()
            .filter(api_call::Column::UserId.eq(identifier))
            .filter(api_call::Column::Timestamp.gte(now - policy.span()))
            .order_by_asc(api_call::Column::Timestamp)
            .one(txn)
            .await;

        match oldest {
            Ok(Some(record)) => {
                let frees_at = record.timestamp.with_timezone(&Utc) + policy.span();
                (frees_at - now).to_std().ok()
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(identifier = %identifier, error = %e, "Could not compute retry delay");
                None
            }
        }
    }

    async fn rollback(txn: DatabaseTransaction, identifier: &str) {
        if let Err(e) = txn.rollback().await {
            tracing::warn!(identifier = %identifier, error = %e, "Transaction rollback failed");
        }
    }
}

#[async_trait]
impl QuotaStore for TransactionalWindowCounter {
    async fn try_admit(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
        policy: &Policy,
    ) -> Result<Admission, QuotaStoreError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| QuotaStoreError::BeginTransaction(e.to_string()))?;

        match Self::admit_within(&txn, identifier, now, policy).await {
            Ok(Some(remaining)) => {
                txn.commit()
                    .await
                    .map_err(|e| QuotaStoreError::Commit(e.to_string()))?;
                Ok(Admission::Allowed { remaining })
            }
            Ok(None) => {
                let retry_after = Self::retry_after(&txn, identifier, now, policy).await;
                Self::rollback(txn, identifier).await;
                Ok(Admission::Denied { retry_after })
            }
            Err(e) => {
                Self::rollback(txn, identifier).await;
                Err(e)
            }
        }
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, QuotaStoreError> {
        let result = ApiCall::delete_many()
            .filter(api_call::Column::Timestamp.lt(cutoff))
            .exec(&self.db)
            .await
            .map_err(|e| QuotaStoreError::CleanUp(e.to_string()))?;

        Ok(result.rows_affected)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
