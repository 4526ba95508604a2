//! Error handling - maps admission denials to HTTP responses.

use std::time::Duration;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use quotagate_core::{DenyReason, QuotaStoreError};
use quotagate_shared::{ErrorCode, ErrorResponse};

/// Application-level error type that converts to JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Identifier is required")]
    IdentifierRequired,

    #[error("No rate limit configured for this identifier")]
    PolicyMissing,

    #[error("Rate limit of {limit} requests exceeded")]
    RateLimited {
        limit: u32,
        retry_after: Option<Duration>,
    },

    #[error(transparent)]
    Store(#[from] QuotaStoreError),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::IdentifierRequired => ErrorCode::UserIdRequired,
            AppError::PolicyMissing => ErrorCode::NotConfigRateLimitForThisUser,
            AppError::RateLimited { .. } => ErrorCode::RateLimitExceeded,
            AppError::Store(e) => match e {
                QuotaStoreError::BeginTransaction(_) => ErrorCode::FailedToBeginTransaction,
                QuotaStoreError::CleanUp(_) => ErrorCode::FailedToCleanUpData,
                QuotaStoreError::Count(_) => ErrorCode::FailedToCountApiCall,
                QuotaStoreError::Record(_) => ErrorCode::FailedToRecordApiCall,
                QuotaStoreError::Commit(_) => ErrorCode::FailedToCommitTransaction,
                QuotaStoreError::Connection(_) => ErrorCode::RedisConnectionFailed,
                QuotaStoreError::ReadCounter(_) => ErrorCode::GetRateLimitCountingFailed,
                QuotaStoreError::Increment(_) => ErrorCode::IncreaseRateLimitFailed,
                QuotaStoreError::SetExpiration(_) => ErrorCode::SetRateLimitExpirationFailed,
                QuotaStoreError::Timeout(_) => ErrorCode::RateLimitStoreTimeout,
            },
        }
    }
}

impl From<DenyReason> for AppError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::NoIdentifier => AppError::IdentifierRequired,
            DenyReason::NoPolicy => AppError::PolicyMissing,
            DenyReason::RateLimitExceeded { limit, retry_after } => {
                AppError::RateLimited { limit, retry_after }
            }
            DenyReason::StoreFailure(e) => AppError::Store(e),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::IdentifierRequired => StatusCode::BAD_REQUEST,
            AppError::PolicyMissing => StatusCode::FORBIDDEN,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut error = ErrorResponse::new(status.as_u16(), self.code());
        let mut builder = HttpResponse::build(status);

        match self {
            AppError::RateLimited { limit, retry_after } => {
                builder
                    .insert_header(("X-RateLimit-Limit", limit.to_string()))
                    .insert_header(("X-RateLimit-Remaining", "0"));
                if let Some(wait) = retry_after {
                    // Round up so clients never retry inside the window.
                    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
                    builder.insert_header(("Retry-After", secs.to_string()));
                    error = error
                        .with_detail(format!("Rate limit exceeded. Try again in {secs} seconds."));
                }
            }
            // Store internals stay in the logs, not in the body.
            AppError::Store(_) => {}
            other => error = error.with_detail(other.to_string()),
        }

        builder.json(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code_per_reason() {
        let cases = [
            (
                AppError::from(DenyReason::NoIdentifier),
                StatusCode::BAD_REQUEST,
                ErrorCode::UserIdRequired,
            ),
            (
                AppError::from(DenyReason::NoPolicy),
                StatusCode::FORBIDDEN,
                ErrorCode::NotConfigRateLimitForThisUser,
            ),
            (
                AppError::from(DenyReason::RateLimitExceeded {
                    limit: 5,
                    retry_after: None,
                }),
                StatusCode::TOO_MANY_REQUESTS,
                ErrorCode::RateLimitExceeded,
            ),
            (
                AppError::from(DenyReason::StoreFailure(QuotaStoreError::Commit(
                    "serialization failure".to_string(),
                ))),
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::FailedToCommitTransaction,
            ),
            (
                AppError::from(DenyReason::StoreFailure(QuotaStoreError::Connection(
                    "refused".to_string(),
                ))),
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::RedisConnectionFailed,
            ),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.status_code(), status);
            assert_eq!(error.code(), code);
        }
    }

    #[test]
    fn test_rate_limited_response_headers() {
        let error = AppError::RateLimited {
            limit: 5,
            retry_after: Some(Duration::from_millis(6200)),
        };
        let response = error.error_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "7");
        assert_eq!(response.headers().get("X-RateLimit-Limit").unwrap(), "5");
        assert_eq!(response.headers().get("X-RateLimit-Remaining").unwrap(), "0");
    }
}
