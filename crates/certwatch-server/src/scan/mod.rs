pub mod probe;
pub mod reconciler;
pub mod schedule;
pub mod scheduler;
