use apdetect_common::Real;
use serde::Deserialize;

/// Number of standard deviations beyond which a Gaussian is treated as zero.
const GAUSSIAN_CUTOFF: Real = 6.0;

/// A waveform added on top of the baseline. All times are in milliseconds
/// from the start of the sweep.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(
    rename_all = "kebab-case",
    rename_all_fields = "kebab-case",
    tag = "component-type"
)]
pub enum Component {
    Flat {
        start_ms: Real,
        stop_ms: Real,
        amplitude: Real,
    },
    Triangular {
        start_ms: Real,
        peak_ms: Real,
        stop_ms: Real,
        amplitude: Real,
    },
    Gaussian {
        mean_ms: Real,
        sd_ms: Real,
        peak_amplitude: Real,
    },
    Biexp {
        start_ms: Real,
        decay_ms: Real,
        rise_ms: Real,
        coef: Real,
    },
    /// `count` identical Gaussians spaced `interval_ms` apart.
    Train {
        first_ms: Real,
        interval_ms: Real,
        count: usize,
        sd_ms: Real,
        peak_amplitude: Real,
    },
}

fn gaussian(time: Real, mean: Real, sd: Real, peak_amplitude: Real) -> Real {
    if mean - GAUSSIAN_CUTOFF * sd > time || time > mean + GAUSSIAN_CUTOFF * sd {
        Real::default()
    } else {
        peak_amplitude * Real::exp(-Real::powi(0.5 * (time - mean) / sd, 2))
    }
}

impl Component {
    pub(crate) fn is_valid(&self) -> bool {
        match *self {
            Self::Flat {
                start_ms, stop_ms, ..
            } => start_ms <= stop_ms,
            Self::Triangular {
                start_ms,
                peak_ms,
                stop_ms,
                ..
            } => start_ms <= peak_ms && peak_ms <= stop_ms,
            Self::Gaussian { sd_ms, .. } => sd_ms > 0.0,
            Self::Biexp {
                decay_ms, rise_ms, ..
            } => decay_ms > 0.0 && rise_ms > 0.0,
            Self::Train {
                interval_ms, sd_ms, ..
            } => interval_ms > 0.0 && sd_ms > 0.0,
        }
    }

    pub fn value_at(&self, time: Real) -> Real {
        match *self {
            Self::Flat {
                start_ms,
                stop_ms,
                amplitude,
            } => {
                if start_ms <= time && time < stop_ms {
                    amplitude
                } else {
                    Real::default()
                }
            }
            Self::Triangular {
                start_ms,
                peak_ms,
                stop_ms,
                amplitude,
            } => {
                if start_ms <= time && time < peak_ms {
                    amplitude * (time - start_ms) / (peak_ms - start_ms)
                } else if peak_ms <= time && time < stop_ms {
                    amplitude * (stop_ms - time) / (stop_ms - peak_ms)
                } else {
                    Real::default()
                }
            }
            Self::Gaussian {
                mean_ms,
                sd_ms,
                peak_amplitude,
            } => gaussian(time, mean_ms, sd_ms, peak_amplitude),
            Self::Biexp {
                start_ms,
                decay_ms,
                rise_ms,
                coef,
            } => {
                if time < start_ms {
                    Real::default()
                } else {
                    let time = time - start_ms;
                    coef * (Real::exp(-time / decay_ms) - Real::exp(-time / rise_ms))
                }
            }
            Self::Train {
                first_ms,
                interval_ms,
                count,
                sd_ms,
                peak_amplitude,
            } => (0..count)
                .map(|i| first_ms + i as Real * interval_ms)
                .map(|mean| gaussian(time, mean, sd_ms, peak_amplitude))
                .sum(),
        }
    }
}
