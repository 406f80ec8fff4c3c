mod eligibility;
mod scheduler;

pub use scheduler::{DrawScheduler, DrawSchedulerConfig};
