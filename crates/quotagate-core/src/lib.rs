//! # Quotagate Core
//!
//! The domain layer of the quota gate.
//! Policies, admission decisions and the ports that quota stores implement.
//! No infrastructure dependencies live here.

pub mod admission;
pub mod domain;
pub mod error;
pub mod ports;

pub use admission::AdmissionGate;
pub use domain::{Decision, DenyReason, Policy, PolicyRegistry};
pub use error::{DomainError, QuotaStoreError};
