pub mod rollover;
pub mod scheduler;

pub use rollover::{RolloverJob, RolloverReport};
pub use scheduler::DailyScheduler;
