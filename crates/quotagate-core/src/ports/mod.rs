//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod clock;
mod quota_store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use quota_store::{Admission, QuotaStore};
