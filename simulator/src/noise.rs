use apdetect_common::{Real, SweepIndex};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal, NormalError};
use serde::Deserialize;

/// Zero-mean Gaussian noise, optionally low-pass smoothed.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct NoiseSource {
    sd: Real,
    #[serde(default)]
    smoothing_factor: Real,
    #[serde(default)]
    seed: u64,
}

impl NoiseSource {
    pub fn gaussian(sd: Real, seed: u64) -> Self {
        Self {
            sd,
            smoothing_factor: Real::default(),
            seed,
        }
    }

    pub fn with_smoothing_factor(self, smoothing_factor: Real) -> Self {
        Self {
            smoothing_factor,
            ..self
        }
    }

    fn smooth(&self, new_value: Real, old_value: Real) -> Real {
        new_value * (1.0 - self.smoothing_factor) + old_value * self.smoothing_factor
    }
}

pub(crate) struct Noise<'a> {
    source: &'a NoiseSource,
    distribution: Normal<Real>,
    rng: StdRng,
    prev: Real,
}

impl<'a> Noise<'a> {
    /// Each sweep draws from its own stream, derived from the source seed.
    /// The standard deviation must be finite and non-negative.
    pub(crate) fn new(source: &'a NoiseSource, sweep: SweepIndex) -> Result<Self, NormalError> {
        if !source.sd.is_finite() || source.sd < 0.0 {
            return Err(NormalError::BadVariance);
        }
        Ok(Self {
            source,
            distribution: Normal::new(0.0, source.sd)?,
            rng: StdRng::seed_from_u64(source.seed.wrapping_add(sweep as u64)),
            prev: Real::default(),
        })
    }

    pub(crate) fn noisify(&mut self, value: Real) -> Real {
        self.prev = self
            .source
            .smooth(self.distribution.sample(&mut self.rng), self.prev);
        value + self.prev
    }
}
