use crate::{Point, Real, SweepIndex};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LoadError {
    #[error("Recording contains no sweeps")]
    NoSweeps,
    #[error("Sweep {0} contains no samples")]
    EmptySweep(SweepIndex),
    #[error("Sweep {sweep} has {time} time samples but {amplitude} amplitude samples")]
    LengthMismatch {
        sweep: SweepIndex,
        time: usize,
        amplitude: usize,
    },
    #[error("Sweep {sweep} has a command waveform of {command} samples, expected {amplitude}")]
    CommandMismatch {
        sweep: SweepIndex,
        command: usize,
        amplitude: usize,
    },
    #[error("Sampling rate must be finite and positive, got {0} points per ms")]
    InvalidSamplingRate(Real),
}

/// Determines which filtering path applies to a recording.
#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RecordingMode {
    #[default]
    CurrentClamp,
    VoltageClamp,
}

/// Restricts a read to a single sweep, or to every sweep.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepFilter {
    #[default]
    All,
    Sweep(SweepIndex),
}

impl SweepFilter {
    pub fn includes(&self, sweep: SweepIndex) -> bool {
        match self {
            SweepFilter::All => true,
            SweepFilter::Sweep(index) => *index == sweep,
        }
    }
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct Sweep {
    time: Vec<Real>,
    amplitude: Vec<Real>,
    command: Option<Vec<Real>>,
}

impl Sweep {
    /// `time` is in seconds, `amplitude` in the recording's physical units.
    pub fn new(time: Vec<Real>, amplitude: Vec<Real>) -> Self {
        Self {
            time,
            amplitude,
            command: None,
        }
    }

    pub fn with_command(self, command: Vec<Real>) -> Self {
        Self {
            command: Some(command),
            ..self
        }
    }

    pub fn time(&self) -> &[Real] {
        &self.time
    }

    pub fn amplitude(&self) -> &[Real] {
        &self.amplitude
    }

    pub fn command(&self) -> Option<&[Real]> {
        self.command.as_deref()
    }

    pub fn len(&self) -> usize {
        self.amplitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitude.is_empty()
    }

    fn validate(&self, sweep: SweepIndex) -> Result<(), LoadError> {
        if self.amplitude.is_empty() {
            return Err(LoadError::EmptySweep(sweep));
        }
        if self.time.len() != self.amplitude.len() {
            return Err(LoadError::LengthMismatch {
                sweep,
                time: self.time.len(),
                amplitude: self.amplitude.len(),
            });
        }
        if let Some(command) = &self.command {
            if command.len() != self.amplitude.len() {
                return Err(LoadError::CommandMismatch {
                    sweep,
                    command: command.len(),
                    amplitude: self.amplitude.len(),
                });
            }
        }
        Ok(())
    }
}

/// One or more sweeps sampled at a common rate.
///
/// A `Recording` can only be built through [Recording::new] or
/// [Recording::from_amplitudes], both of which validate the sweeps, so any
/// value of this type is safe to run detection on.
#[derive(Clone, Debug, PartialEq)]
pub struct Recording {
    name: Option<String>,
    sweeps: Vec<Sweep>,
    points_per_ms: Real,
    mode: RecordingMode,
}

impl Recording {
    pub fn new(
        sweeps: Vec<Sweep>,
        points_per_ms: Real,
        mode: RecordingMode,
    ) -> Result<Self, LoadError> {
        if !points_per_ms.is_finite() || points_per_ms <= 0.0 {
            return Err(LoadError::InvalidSamplingRate(points_per_ms));
        }
        if sweeps.is_empty() {
            return Err(LoadError::NoSweeps);
        }
        for (index, sweep) in sweeps.iter().enumerate() {
            sweep.validate(index)?;
        }
        Ok(Self {
            name: None,
            sweeps,
            points_per_ms,
            mode,
        })
    }

    /// Builds the time axis of every sweep from the sampling rate,
    /// sample `k` sitting at `k / points_per_ms` milliseconds.
    pub fn from_amplitudes(
        amplitudes: Vec<Vec<Real>>,
        points_per_ms: Real,
        mode: RecordingMode,
    ) -> Result<Self, LoadError> {
        let sweeps = amplitudes
            .into_iter()
            .map(|amplitude| {
                let time = (0..amplitude.len())
                    .map(|k| k as Real / points_per_ms / 1000.0)
                    .collect();
                Sweep::new(time, amplitude)
            })
            .collect();
        Self::new(sweeps, points_per_ms, mode)
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn sweeps(&self) -> &[Sweep] {
        &self.sweeps
    }

    pub fn sweep(&self, index: SweepIndex) -> Option<&Sweep> {
        self.sweeps.get(index)
    }

    pub fn num_sweeps(&self) -> usize {
        self.sweeps.len()
    }

    pub fn points_per_ms(&self) -> Real {
        self.points_per_ms
    }

    pub fn mode(&self) -> RecordingMode {
        self.mode
    }

    pub fn points_to_ms(&self, points: Point) -> Real {
        points as Real / self.points_per_ms
    }

    /// Truncates towards zero.
    pub fn ms_to_points(&self, ms: Real) -> Point {
        (ms * self.points_per_ms) as Point
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn time_axis_from_sampling_rate() {
        let recording =
            Recording::from_amplitudes(vec![vec![0.0; 25]], 10.0, RecordingMode::CurrentClamp)
                .unwrap();
        let sweep = recording.sweep(0).unwrap();
        assert_eq!(sweep.len(), 25);
        assert_approx_eq!(sweep.time()[10], 0.001, 1e-12);
        assert_approx_eq!(sweep.time()[24], 0.0024, 1e-12);
        assert_eq!(recording.ms_to_points(2.35), 23);
        assert_approx_eq!(recording.points_to_ms(23), 2.3, 1e-12);
    }

    #[test]
    fn no_sweeps() {
        assert_eq!(
            Recording::new(vec![], 10.0, RecordingMode::CurrentClamp),
            Err(LoadError::NoSweeps)
        );
    }

    #[test]
    fn invalid_sampling_rate() {
        let sweeps = vec![Sweep::new(vec![0.0], vec![0.0])];
        assert_eq!(
            Recording::new(sweeps.clone(), 0.0, RecordingMode::CurrentClamp),
            Err(LoadError::InvalidSamplingRate(0.0))
        );
        assert!(Recording::new(sweeps, Real::NAN, RecordingMode::CurrentClamp).is_err());
    }

    #[test]
    fn mismatched_lengths() {
        let sweeps = vec![
            Sweep::new(vec![0.0, 0.1], vec![1.0, 2.0]),
            Sweep::new(vec![0.0, 0.1, 0.2], vec![1.0, 2.0]),
        ];
        assert_eq!(
            Recording::new(sweeps, 10.0, RecordingMode::CurrentClamp),
            Err(LoadError::LengthMismatch {
                sweep: 1,
                time: 3,
                amplitude: 2
            })
        );
    }

    #[test]
    fn mismatched_command() {
        let sweeps = vec![Sweep::new(vec![0.0, 0.1], vec![1.0, 2.0]).with_command(vec![0.0])];
        assert_eq!(
            Recording::new(sweeps, 10.0, RecordingMode::VoltageClamp),
            Err(LoadError::CommandMismatch {
                sweep: 0,
                command: 1,
                amplitude: 2
            })
        );
    }

    #[test]
    fn empty_sweep() {
        let sweeps = vec![Sweep::new(vec![], vec![])];
        assert_eq!(
            Recording::new(sweeps, 10.0, RecordingMode::CurrentClamp),
            Err(LoadError::EmptySweep(0))
        );
    }

    #[test]
    fn sweep_filter() {
        assert!(SweepFilter::All.includes(3));
        assert!(SweepFilter::Sweep(3).includes(3));
        assert!(!SweepFilter::Sweep(2).includes(3));
    }
}
