//! Background jobs - housekeeping of expired admission state.

mod scheduler;
mod sweep;

pub use scheduler::{Scheduler, SchedulerConfig};
pub use sweep::start_sweeper;
