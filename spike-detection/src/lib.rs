//! Detection of action potentials in electrophysiology recordings and
//! measurement of each spike's features.
//!
//! ```no_run
//! # use spike_detection::{DetectionConfig, SpikeAnalysis};
//! # fn run(recording: apdetect_common::Recording) -> Result<(), spike_detection::DetectionError> {
//! let mut analysis = SpikeAnalysis::new(recording)?;
//! let run = analysis.detect(&DetectionConfig::default())?;
//! println!("{} spikes", run.spikes.len());
//! # Ok(())
//! # }
//! ```
mod annotation;
mod clips;
mod detectors;
mod error;
mod features;
mod filter;
pub mod metrics;
mod parameters;
mod processing;
mod signals;
mod spike;
mod stats;

pub use annotation::{ErrorAnnotation, ErrorCategory, error_report};
pub use apdetect_common::Real;
pub use clips::{ClipSource, SpikeClip, SpikeClips, make_clips};
pub use error::{ConfigError, DetectionError, UnknownStatistic};
pub use filter::{FilteredSweep, SignalFilter};
pub use parameters::{ConfigOverrides, DetectionConfig, DetectionType, HalfHeightsWrapper, Preset};
pub use processing::{DetectionRun, SpikeAnalysis, detect_all};
pub use spike::{
    DerivativeExtremum, LinearFit, PointValue, SpikeContext, SpikeRecord, WidthMeasurement,
};
pub use stats::Statistic;
