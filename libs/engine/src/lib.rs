//! Playback scheduler: pulls records from a `RecordSource`, paces them by
//! one of three strategies and fans each one out to a `Dispatch` sink as an
//! independent task, returning only once every dispatch has finished.

mod error;
mod jitter;
mod mode;
mod scheduler;
mod tracker;

pub use error::PlaybackError;
pub use jitter::{jittered, Jitter, RandomSource, Xorshift};
pub use mode::Mode;
pub use scheduler::{PlaybackReport, Scheduler};
pub use tracker::CompletionTracker;
