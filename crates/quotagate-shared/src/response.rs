//! Standardized error responses emitted by the admission gate.

use serde::{Deserialize, Serialize};

/// Machine-readable error code carried in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UserIdRequired,
    NotConfigRateLimitForThisUser,
    RateLimitExceeded,

    // Transactional store
    FailedToBeginTransaction,
    FailedToCleanUpData,
    FailedToCountApiCall,
    FailedToRecordApiCall,
    FailedToCommitTransaction,

    // Counter store
    RedisConnectionFailed,
    GetRateLimitCountingFailed,
    IncreaseRateLimitFailed,
    SetRateLimitExpirationFailed,

    RateLimitStoreTimeout,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UserIdRequired => "USER_ID_REQUIRED",
            ErrorCode::NotConfigRateLimitForThisUser => "NOT_CONFIG_RATE_LIMIT_FOR_THIS_USER",
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::FailedToBeginTransaction => "FAILED_TO_BEGIN_TRANSACTION",
            ErrorCode::FailedToCleanUpData => "FAILED_TO_CLEAN_UP_DATA",
            ErrorCode::FailedToCountApiCall => "FAILED_TO_COUNT_API_CALL",
            ErrorCode::FailedToRecordApiCall => "FAILED_TO_RECORD_API_CALL",
            ErrorCode::FailedToCommitTransaction => "FAILED_TO_COMMIT_TRANSACTION",
            ErrorCode::RedisConnectionFailed => "REDIS_CONNECTION_FAILED",
            ErrorCode::GetRateLimitCountingFailed => "GET_RATE_LIMIT_COUNTING_FAILED",
            ErrorCode::IncreaseRateLimitFailed => "INCREASE_RATE_LIMIT_FAILED",
            ErrorCode::SetRateLimitExpirationFailed => "SET_RATE_LIMIT_EXPIRATION_FAILED",
            ErrorCode::RateLimitStoreTimeout => "RATE_LIMIT_STORE_TIMEOUT",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body: `{"error": "<CODE>", "status": <u16>, "detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// The error code.
    pub error: ErrorCode,

    /// The HTTP status code.
    pub status: u16,

    /// A human-readable explanation specific to this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: u16, error: ErrorCode) -> Self {
        Self {
            error,
            status,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_serialize_as_wire_strings() {
        let codes = [
            ErrorCode::NotConfigRateLimitForThisUser,
            ErrorCode::FailedToCleanUpData,
            ErrorCode::GetRateLimitCountingFailed,
            ErrorCode::RateLimitStoreTimeout,
        ];
        for code in codes {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, serde_json::Value::String(code.as_str().to_string()));
        }
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorResponse::new(429, ErrorCode::RateLimitExceeded);
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"RATE_LIMIT_EXCEEDED","status":429}"#);

        let parsed: ErrorResponse =
            serde_json::from_str(r#"{"error":"USER_ID_REQUIRED","status":400,"detail":"x"}"#)
                .unwrap();
        assert_eq!(parsed.error, ErrorCode::UserIdRequired);
        assert_eq!(parsed.detail.as_deref(), Some("x"));
    }
}
