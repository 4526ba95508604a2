use std::collections::HashMap;
use std::time::Duration;

use chrono::TimeDelta;

use crate::error::DomainError;

/// Quota for one identifier: at most `limit` admissions per `window`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    limit: u32,
    window: Duration,
    span: TimeDelta,
}

impl Policy {
    /// Build a policy, rejecting a zero limit or a zero window.
    pub fn new(identifier: &str, limit: u32, window: Duration) -> Result<Self, DomainError> {
        let invalid = |reason| DomainError::InvalidPolicy {
            identifier: identifier.to_string(),
            reason,
        };

        if limit == 0 {
            return Err(invalid("limit must be greater than zero"));
        }
        if window.is_zero() {
            return Err(invalid("window must be greater than zero"));
        }
        let span = TimeDelta::from_std(window).map_err(|_| invalid("window is too large"))?;

        Ok(Self {
            limit,
            window,
            span,
        })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// The window as a calendar span, for timestamp arithmetic.
    pub fn span(&self) -> TimeDelta {
        self.span
    }
}

/// Immutable mapping from identifier to policy.
///
/// Built once at startup and shared read-only by every decision, so no
/// lock is needed.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<String, Policy>,
}

impl PolicyRegistry {
    /// Build a registry from `(identifier, limit, window)` entries.
    ///
    /// Fails on the first invalid entry; a registry is never partially built.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = (S, u32, Duration)>,
        S: Into<String>,
    {
        let mut policies = HashMap::new();
        for (identifier, limit, window) in entries {
            let identifier = identifier.into();
            if identifier.is_empty() {
                return Err(DomainError::InvalidPolicy {
                    identifier,
                    reason: "identifier must not be empty",
                });
            }
            let policy = Policy::new(&identifier, limit, window)?;
            policies.insert(identifier, policy);
        }

        Ok(Self { policies })
    }

    pub fn lookup(&self, identifier: &str) -> Option<&Policy> {
        self.policies.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Longest configured window, used to bound housekeeping sweeps.
    pub fn longest_window(&self) -> Option<TimeDelta> {
        self.policies.values().map(Policy::span).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown() {
        let registry = PolicyRegistry::from_entries([
            ("user_a", 5, Duration::from_secs(10)),
            ("user_c", 2, Duration::from_secs(60)),
        ])
        .unwrap();

        let policy = registry.lookup("user_a").unwrap();
        assert_eq!(policy.limit(), 5);
        assert_eq!(policy.window(), Duration::from_secs(10));
        assert!(registry.lookup("user_b").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_rejects_zero_limit() {
        let err = PolicyRegistry::from_entries([("user_a", 0, Duration::from_secs(10))]);
        assert!(matches!(
            err,
            Err(DomainError::InvalidPolicy { ref identifier, .. }) if identifier == "user_a"
        ));
    }

    #[test]
    fn test_rejects_zero_window() {
        assert!(Policy::new("user_a", 5, Duration::ZERO).is_err());
    }

    #[test]
    fn test_rejects_empty_identifier() {
        let err = PolicyRegistry::from_entries([("", 5, Duration::from_secs(10))]);
        assert!(err.is_err());
    }

    #[test]
    fn test_longest_window() {
        let registry = PolicyRegistry::from_entries([
            ("user_a", 5, Duration::from_secs(10)),
            ("user_c", 2, Duration::from_secs(60)),
        ])
        .unwrap();
        assert_eq!(registry.longest_window(), Some(TimeDelta::seconds(60)));
        assert_eq!(PolicyRegistry::default().longest_window(), None);
    }
}
