//! Application configuration loaded from environment variables and the policy file.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use quotagate_core::{DomainError, PolicyRegistry};
#[cfg(feature = "postgres")]
use quotagate_infra::DatabaseConfig;
#[cfg(feature = "redis")]
use quotagate_infra::RedisConfig;

use crate::middleware::admission::DEFAULT_IDENTIFIER_PARAM;

/// Configuration errors. All of them stop the process before it serves traffic.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CONFIG_PATH environment variable is required")]
    MissingPolicyPath,

    #[error("Failed to read policy file {path}: {source}")]
    ReadPolicies {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse policy file: {0}")]
    ParsePolicies(#[from] serde_yaml::Error),

    #[error(transparent)]
    InvalidPolicy(#[from] DomainError),

    #[error("Unknown quota store '{0}' (expected postgres, redis or memory)")]
    UnknownStore(String),
}

/// Which quota store backs the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Redis,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "db" => Ok(StoreKind::Postgres),
            "redis" => Ok(StoreKind::Redis),
            "memory" | "in-memory" => Ok(StoreKind::Memory),
            other => Err(ConfigError::UnknownStore(other.to_string())),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Postgres => write!(f, "postgres"),
            StoreKind::Redis => write!(f, "redis"),
            StoreKind::Memory => write!(f, "memory"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub policy_path: PathBuf,
    pub identifier_param: String,
    pub store: StoreKind,
    /// Serve from in-memory counters when the configured store is unreachable at startup.
    pub fallback_to_memory: bool,
    pub decision_timeout: Duration,
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    #[cfg(feature = "redis")]
    pub redis: RedisConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let policy_path = env::var("CONFIG_PATH")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingPolicyPath)?;

        let store = env::var("QUOTA_STORE")
            .map(|s| s.parse())
            .unwrap_or(Ok(StoreKind::Postgres))?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            policy_path,
            identifier_param: env::var("IDENTIFIER_PARAM")
                .unwrap_or_else(|_| DEFAULT_IDENTIFIER_PARAM.to_string()),
            store,
            fallback_to_memory: env::var("QUOTA_STORE_FALLBACK_TO_MEMORY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            decision_timeout: Duration::from_millis(
                env::var("DECISION_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            #[cfg(feature = "postgres")]
            database: DatabaseConfig::from_env(),
            #[cfg(feature = "redis")]
            redis: RedisConfig::from_env(),
        })
    }
}

/// Policy file layout:
///
/// ```yaml
/// rate_limits:
///   user_a:
///     limit: 5
///     duration: 10
/// ```
#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    rate_limits: HashMap<String, PolicyEntry>,
}

#[derive(Debug, Deserialize)]
struct PolicyEntry {
    limit: u32,
    /// Window length in seconds.
    #[serde(alias = "window")]
    duration: u64,
}

/// Parse a YAML policy document into a registry.
pub fn parse_policies(yaml: &str) -> Result<PolicyRegistry, ConfigError> {
    let file: PolicyFile = serde_yaml::from_str(yaml)?;
    let entries = file
        .rate_limits
        .into_iter()
        .map(|(identifier, entry)| {
            (identifier, entry.limit, Duration::from_secs(entry.duration))
        });

    Ok(PolicyRegistry::from_entries(entries)?)
}

/// Read and parse the policy file.
pub fn load_policies(path: &Path) -> Result<PolicyRegistry, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadPolicies {
        path: path.to_path_buf(),
        source,
    })?;

    parse_policies(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policies() {
        let registry = parse_policies(
            r#"
rate_limits:
  user_a:
    limit: 5
    duration: 10
  user_c:
    limit: 100
    window: 3600
"#,
        )
        .unwrap();

        let user_a = registry.lookup("user_a").unwrap();
        assert_eq!(user_a.limit(), 5);
        assert_eq!(user_a.window(), Duration::from_secs(10));
        assert_eq!(
            registry.lookup("user_c").unwrap().window(),
            Duration::from_secs(3600)
        );
        assert!(registry.lookup("user_b").is_none());
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let err = parse_policies("rate_limits:\n  user_a:\n    limit: 0\n    duration: 10\n");
        assert!(matches!(err, Err(ConfigError::InvalidPolicy(_))));
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let err = parse_policies("rate_limits:\n  user_a:\n    limit: many\n");
        assert!(matches!(err, Err(ConfigError::ParsePolicies(_))));
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let err = load_policies(Path::new("/nonexistent/quotagate/policies.yaml"));
        assert!(matches!(err, Err(ConfigError::ReadPolicies { .. })));
    }

    #[test]
    fn test_store_kind_parsing() {
        assert_eq!("Redis".parse::<StoreKind>().unwrap(), StoreKind::Redis);
        assert_eq!("memory".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert!("mongo".parse::<StoreKind>().is_err());
    }
}
