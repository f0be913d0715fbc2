use crate::{Component, NoiseSource, noise::Noise};
use apdetect_common::{LoadError, Real, Recording, RecordingMode, Sweep};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid simulation description: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duration must be finite and positive, got {0} ms")]
    InvalidDuration(Real),
    #[error("Component {0} has an invalid shape")]
    InvalidComponent(usize),
    #[error("Invalid noise distribution: {0}")]
    Noise(#[from] rand_distr::NormalError),
    #[error("Invalid recording: {0}")]
    Load(#[from] LoadError),
}

fn default_sweeps() -> usize {
    1
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Simulation {
    #[serde(default)]
    pub name: Option<String>,
    pub points_per_ms: Real,
    pub duration_ms: Real,
    #[serde(default = "default_sweeps")]
    pub sweeps: usize,
    #[serde(default)]
    pub mode: RecordingMode,
    pub baseline: Real,
    /// Holding level of a constant command waveform, if any.
    #[serde(default)]
    pub command_level: Option<Real>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub noise: Option<NoiseSource>,
}

impl Simulation {
    pub fn new(points_per_ms: Real, duration_ms: Real, baseline: Real) -> Self {
        Self {
            name: None,
            points_per_ms,
            duration_ms,
            sweeps: default_sweeps(),
            mode: RecordingMode::default(),
            baseline,
            command_level: None,
            components: Vec::new(),
            noise: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_noise(self, noise: NoiseSource) -> Self {
        Self {
            noise: Some(noise),
            ..self
        }
    }

    pub fn with_sweeps(self, sweeps: usize) -> Self {
        Self { sweeps, ..self }
    }

    pub fn with_mode(self, mode: RecordingMode) -> Self {
        Self { mode, ..self }
    }

    pub fn with_command_level(self, command_level: Real) -> Self {
        Self {
            command_level: Some(command_level),
            ..self
        }
    }

    pub fn num_samples(&self) -> usize {
        (self.duration_ms * self.points_per_ms).round() as usize
    }

    fn sweep(&self, index: usize) -> Result<Sweep, SimulationError> {
        let mut noise = self
            .noise
            .as_ref()
            .map(|source| Noise::new(source, index))
            .transpose()?;

        let num_samples = self.num_samples();
        let time = (0..num_samples)
            .map(|k| k as Real / self.points_per_ms / 1000.0)
            .collect();
        let amplitude = (0..num_samples)
            .map(|k| {
                let time_ms = k as Real / self.points_per_ms;
                let value = self.baseline
                    + self
                        .components
                        .iter()
                        .map(|component| component.value_at(time_ms))
                        .sum::<Real>();
                match noise.as_mut() {
                    Some(noise) => noise.noisify(value),
                    None => value,
                }
            })
            .collect();

        let sweep = Sweep::new(time, amplitude);
        Ok(match self.command_level {
            Some(level) => sweep.with_command(vec![level; num_samples]),
            None => sweep,
        })
    }

    #[instrument(skip_all, fields(sweeps = self.sweeps, num_samples = self.num_samples()))]
    pub fn generate(&self) -> Result<Recording, SimulationError> {
        if !self.duration_ms.is_finite() || self.duration_ms <= 0.0 {
            return Err(SimulationError::InvalidDuration(self.duration_ms));
        }
        if let Some(index) = self.components.iter().position(|c| !c.is_valid()) {
            return Err(SimulationError::InvalidComponent(index));
        }
        if !self.points_per_ms.is_finite() || self.points_per_ms <= 0.0 {
            return Err(LoadError::InvalidSamplingRate(self.points_per_ms).into());
        }

        let sweeps = (0..self.sweeps)
            .map(|index| self.sweep(index))
            .collect::<Result<Vec<_>, _>>()?;

        let recording = Recording::new(sweeps, self.points_per_ms, self.mode)?;
        debug!("Generated {} sweeps", recording.num_sweeps());
        Ok(match &self.name {
            Some(name) => recording.with_name(name.clone()),
            None => recording,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const JSON: &str = r#"
    {
        "name": "three-spikes",
        "points-per-ms": 10,
        "duration-ms": 2000,
        "sweeps": 2,
        "baseline": -70,
        "command-level": -60,
        "components": [
            { "component-type": "train", "first-ms": 1000, "interval-ms": 300,
              "count": 3, "sd-ms": 1, "peak-amplitude": 90 },
            { "component-type": "flat", "start-ms": 0, "stop-ms": 10, "amplitude": 1 }
        ],
        "noise": { "sd": 0.5, "seed": 11 }
    }
    "#;

    #[test]
    fn parse_and_generate() {
        let simulation = Simulation::from_json(JSON).unwrap();
        assert_eq!(simulation.num_samples(), 20000);
        let recording = simulation.generate().unwrap();
        assert_eq!(recording.name(), Some("three-spikes"));
        assert_eq!(recording.num_sweeps(), 2);
        assert_eq!(recording.points_per_ms(), 10.0);

        let sweep = recording.sweep(0).unwrap();
        assert_eq!(sweep.len(), 20000);
        assert_eq!(sweep.command().map(|c| c.len()), Some(20000));
        assert_approx_eq!(sweep.time()[10000], 1.0, 1e-12);
        assert_approx_eq!(sweep.amplitude()[10000], 20.0, 3.0);
        assert_approx_eq!(sweep.amplitude()[13000], 20.0, 3.0);
        assert_approx_eq!(sweep.amplitude()[5000], -70.0, 3.0);
        assert_ne!(
            recording.sweep(0).unwrap().amplitude(),
            recording.sweep(1).unwrap().amplitude()
        );
    }

    #[test]
    fn generation_is_deterministic() {
        let simulation = Simulation::from_json(JSON).unwrap();
        assert_eq!(simulation.generate().unwrap(), simulation.generate().unwrap());
    }

    #[test]
    fn noiseless_baseline_is_exact() {
        let recording = Simulation::new(10.0, 100.0, -70.0)
            .with_component(Component::Gaussian {
                mean_ms: 50.0,
                sd_ms: 1.0,
                peak_amplitude: 90.0,
            })
            .generate()
            .unwrap();
        let amplitude = recording.sweep(0).unwrap().amplitude();
        assert_eq!(amplitude[0], -70.0);
        assert_eq!(amplitude[430], -70.0);
        assert_eq!(amplitude[500], 20.0);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let json = r#"{ "points-per-ms": 10, "duration-ms": 10, "baseline": 0, "colour": 1 }"#;
        assert!(matches!(
            Simulation::from_json(json),
            Err(SimulationError::Json(_))
        ));
    }

    #[test]
    fn invalid_duration() {
        assert!(matches!(
            Simulation::new(10.0, 0.0, 0.0).generate(),
            Err(SimulationError::InvalidDuration(_))
        ));
    }

    #[test]
    fn negative_noise_sd_is_rejected() {
        let json = r#"{ "points-per-ms": 10, "duration-ms": 10, "baseline": 0,
            "noise": { "sd": -0.5, "seed": 1 } }"#;
        assert!(matches!(
            Simulation::from_json(json).unwrap().generate(),
            Err(SimulationError::Noise(_))
        ));
    }

    #[test]
    fn no_sweeps() {
        assert!(matches!(
            Simulation::new(10.0, 10.0, 0.0).with_sweeps(0).generate(),
            Err(SimulationError::Load(LoadError::NoSweeps))
        ));
    }
}
