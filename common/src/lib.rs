pub mod metrics;
mod recording;
pub mod tracer;

pub use recording::{LoadError, Recording, RecordingMode, Sweep, SweepFilter};

pub type Real = f64;

/// Index of a sample within a sweep.
pub type Point = usize;
pub type SweepIndex = usize;
