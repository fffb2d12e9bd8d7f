mod emitter;
mod runner;

pub use emitter::{EVENT_QUEUE_CAPACITY, Emitter, EventSource, channel};
pub use runner::{Operation, run_driver};
