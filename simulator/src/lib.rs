//! Synthetic electrophysiology recordings.
//!
//! A [Simulation] describes a baseline, a list of [Component] waveforms
//! (action-potential shaped depolarisations, after-hyperpolarisations,
//! ramps and steps) and an optional seeded [NoiseSource]. It is usually read
//! from JSON:
//! ```json
//! {
//!     "points-per-ms": 10,
//!     "duration-ms": 2000,
//!     "baseline": -70,
//!     "components": [
//!         { "component-type": "train", "first-ms": 1000, "interval-ms": 300,
//!           "count": 3, "sd-ms": 1, "peak-amplitude": 90 }
//!     ],
//!     "noise": { "sd": 0.2, "seed": 42 }
//! }
//! ```
//! Generation is deterministic: the same description always produces the
//! same samples.

mod components;
mod noise;
mod simulation;

pub use components::Component;
pub use noise::NoiseSource;
pub use simulation::{Simulation, SimulationError};
