pub mod cache;
pub mod core;
pub mod handlers;
pub mod queue;

pub use core::{Scheduler, SchedulerConfig};
pub use handlers::SignalHandler;
pub use queue::BlockingQueue;
