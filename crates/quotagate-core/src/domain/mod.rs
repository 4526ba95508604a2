//! Domain entities - policies and admission decisions.

mod decision;
mod policy;

pub use decision::{Decision, DenyReason};
pub use policy::{Policy, PolicyRegistry};
