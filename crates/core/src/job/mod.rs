//! Job execution: run ids, lifecycle events and the event writer.

mod events;
mod handle;
mod runner;

pub use events::*;
pub use handle::*;
pub use runner::{JobReport, JobRunner};
