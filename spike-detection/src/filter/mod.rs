//! Smoothing of raw sweeps and their derivatives.
//!
//! Filters are expressed as sliding [Window]s over `(time, value)` points.
//! The source is first padded by half a window on each side, so that
//! ```ignore
//! let smoothed: Vec<Real> = Padding::Nearest
//!     .pad(raw, 2)                                           // edge values repeated twice
//!     .window(SavitzkyGolayWindow::new(coefficients))        // a 5 point polynomial fit
//!     .map(|(_, value)| value)
//!     .collect();
//! ```
//! has the same length as `raw`, and the time of each output is the index of
//! the sample at the centre of its window.

mod median;
mod savitzky_golay;

use crate::{DetectionConfig, Real, error::ConfigError, signals::nan_mean};
use apdetect_common::RecordingMode;
use itertools::Itertools;
use std::iter::repeat_n;
use tracing::warn;

pub(crate) use median::MedianWindow;
pub(crate) use savitzky_golay::{SavitzkyGolayWindow, savitzky_golay_coefficients};

/// Median width forced on voltage-clamp recordings.
const VOLTAGE_CLAMP_MEDIAN: usize = 5;

pub(crate) trait Window: Clone {
    fn push(&mut self, value: Real) -> bool;
    fn output(&self) -> Option<Real>;
    fn apply_time_shift(&self, time: Real) -> Real;
}

#[derive(Clone)]
pub(crate) struct WindowIter<I, W>
where
    I: Iterator<Item = (Real, Real)>,
    W: Window,
{
    window_function: W,
    source: I,
}

impl<I, W> Iterator for WindowIter<I, W>
where
    I: Iterator<Item = (Real, Real)>,
    W: Window,
{
    type Item = (Real, Real);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (time, value) = self.source.next()?;
            if self.window_function.push(value) {
                return Some((
                    self.window_function.apply_time_shift(time),
                    self.window_function.output()?,
                ));
            }
        }
    }
}

pub(crate) trait WindowFilter<I, W>
where
    I: Iterator<Item = (Real, Real)>,
    W: Window,
{
    fn window(self, window: W) -> WindowIter<I, W>;
}

impl<I, W> WindowFilter<I, W> for I
where
    I: Iterator<Item = (Real, Real)>,
    W: Window,
{
    fn window(self, window_function: W) -> WindowIter<I, W> {
        WindowIter {
            source: self,
            window_function,
        }
    }
}

/// How samples beyond either end of a sweep are filled in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Padding {
    Zero,
    Nearest,
}

impl Padding {
    /// Extends `values` by `half` samples at each end, enumerating the
    /// result so that the first unpadded sample has time zero.
    pub(crate) fn pad(self, values: &[Real], half: usize) -> impl Iterator<Item = (Real, Real)> {
        let (first, last) = match self {
            Padding::Zero => (0.0, 0.0),
            Padding::Nearest => (
                values.first().copied().unwrap_or_default(),
                values.last().copied().unwrap_or_default(),
            ),
        };
        repeat_n(first, half)
            .chain(values.iter().copied())
            .chain(repeat_n(last, half))
            .enumerate()
            .map(move |(i, value)| (i as Real - half as Real, value))
    }
}

/// The smoothing applied to amplitudes and derivatives.
#[derive(Clone, Debug, PartialEq)]
pub enum SignalFilter {
    Identity,
    /// Zero padded sliding median of odd width.
    Median(usize),
    /// Least-squares polynomial smoothing with nearest-value padding.
    SavitzkyGolay(Vec<Real>),
}

impl SignalFilter {
    /// Chooses the filter for a recording: voltage-clamp recordings always
    /// use a width 5 median, otherwise a non-zero median width takes
    /// precedence over Savitzky-Golay smoothing.
    pub fn new(config: &DetectionConfig, mode: RecordingMode) -> Result<Self, ConfigError> {
        if mode == RecordingMode::VoltageClamp {
            return Ok(Self::Median(VOLTAGE_CLAMP_MEDIAN));
        }
        if config.median_filter > 0 {
            let mut width = config.median_filter;
            if width % 2 == 0 {
                warn!("Median filter width must be odd, using {}", width + 1);
                width += 1;
            }
            Ok(Self::Median(width))
        } else if config.savitzky_golay_points > 0 {
            let coefficients = savitzky_golay_coefficients(
                config.savitzky_golay_points,
                config.savitzky_golay_order,
            )
            .ok_or_else(|| {
                ConfigError::invalid(
                    "savitzky-golay-order",
                    "polynomial fit is singular for this window",
                )
            })?;
            Ok(Self::SavitzkyGolay(coefficients))
        } else {
            Ok(Self::Identity)
        }
    }

    pub fn apply(&self, values: &[Real]) -> Vec<Real> {
        match self {
            SignalFilter::Identity => values.to_vec(),
            SignalFilter::Median(width) => Padding::Zero
                .pad(values, width / 2)
                .window(MedianWindow::new(*width))
                .map(|(_, value)| value)
                .collect(),
            SignalFilter::SavitzkyGolay(coefficients) => Padding::Nearest
                .pad(values, coefficients.len() / 2)
                .window(SavitzkyGolayWindow::new(coefficients))
                .map(|(_, value)| value)
                .collect(),
        }
    }

    /// First difference of `filtered`, smoothed with the same filter and
    /// scaled to units per ms. The derivative at sample 0 is taken to be 0.
    pub fn derivative(&self, filtered: &[Real], points_per_ms: Real) -> Vec<Real> {
        let differences: Vec<Real> = filtered
            .iter()
            .tuple_windows()
            .map(|(previous, next)| next - previous)
            .collect();
        std::iter::once(0.0)
            .chain(
                self.apply(&differences)
                    .into_iter()
                    .map(|value| value * points_per_ms),
            )
            .take(filtered.len())
            .collect()
    }
}

/// The filtered signals of one sweep, each the same length as the raw sweep.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilteredSweep {
    pub amplitude: Vec<Real>,
    /// The derivative in units per ms for current-clamp recordings,
    /// the baseline subtracted amplitude for voltage-clamp recordings.
    pub derivative: Vec<Real>,
}

impl FilteredSweep {
    pub fn new(
        raw: &[Real],
        filter: &SignalFilter,
        mode: RecordingMode,
        points_per_ms: Real,
    ) -> Self {
        let amplitude = filter.apply(raw);
        let derivative = match mode {
            RecordingMode::CurrentClamp => filter.derivative(&amplitude, points_per_ms),
            RecordingMode::VoltageClamp => {
                let baseline = nan_mean(&amplitude).unwrap_or_default();
                amplitude.iter().map(|value| value - baseline).collect()
            }
        };
        Self {
            amplitude,
            derivative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn padding() {
        let values = [1.0, 2.0, 3.0];
        let nearest: Vec<_> = Padding::Nearest.pad(&values, 2).collect();
        assert_eq!(
            nearest,
            vec![
                (-2.0, 1.0),
                (-1.0, 1.0),
                (0.0, 1.0),
                (1.0, 2.0),
                (2.0, 3.0),
                (3.0, 3.0),
                (4.0, 3.0)
            ]
        );
        let zero: Vec<_> = Padding::Zero.pad(&values, 1).map(|(_, v)| v).collect();
        assert_eq!(zero, vec![0.0, 1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn median_filter_preserves_length_and_time() {
        let values = [1.0, 5.0, 2.0, 8.0, 3.0];
        let output: Vec<_> = Padding::Zero
            .pad(&values, 1)
            .window(MedianWindow::new(3))
            .collect();
        assert_eq!(
            output,
            vec![(0.0, 1.0), (1.0, 2.0), (2.0, 5.0), (3.0, 3.0), (4.0, 3.0)]
        );
    }

    #[test]
    fn even_median_width_is_incremented() {
        let config = DetectionConfig {
            median_filter: 4,
            ..Default::default()
        };
        assert_eq!(
            SignalFilter::new(&config, RecordingMode::CurrentClamp).unwrap(),
            SignalFilter::Median(5)
        );
    }

    #[test]
    fn filter_selection() {
        let config = DetectionConfig {
            median_filter: 0,
            savitzky_golay_points: 0,
            ..Default::default()
        };
        assert_eq!(
            SignalFilter::new(&config, RecordingMode::CurrentClamp).unwrap(),
            SignalFilter::Identity
        );
        assert_eq!(
            SignalFilter::new(&config, RecordingMode::VoltageClamp).unwrap(),
            SignalFilter::Median(5)
        );
        assert!(matches!(
            SignalFilter::new(&DetectionConfig::default(), RecordingMode::CurrentClamp).unwrap(),
            SignalFilter::SavitzkyGolay(c) if c.len() == 5
        ));
    }

    #[test]
    fn identity_derivative() {
        let derivative = SignalFilter::Identity.derivative(&[0.0, 1.0, 3.0, 6.0], 10.0);
        assert_eq!(derivative, vec![0.0, 10.0, 20.0, 30.0]);
    }

    #[test]
    fn derivative_of_single_sample() {
        let derivative = SignalFilter::Median(3).derivative(&[4.0], 10.0);
        assert_eq!(derivative, vec![0.0]);
    }

    #[test]
    fn savitzky_golay_smooths_line_exactly() {
        let filter = SignalFilter::SavitzkyGolay(savitzky_golay_coefficients(5, 2).unwrap());
        let line: Vec<Real> = (0..20).map(|i| 2.0 * i as Real - 3.0).collect();
        let smoothed = filter.apply(&line);
        assert_eq!(smoothed.len(), line.len());
        for (s, l) in smoothed.iter().zip(&line).skip(2).take(16) {
            assert_approx_eq!(s, l, 1e-9);
        }
        // Nearest padding flattens the first sample's neighbourhood.
        assert!(smoothed[0] > line[0]);
    }

    #[test]
    fn voltage_clamp_subtracts_mean() {
        let raw = [1.0, 1.0, 4.0, 1.0, 1.0, 7.0, 7.0, 7.0];
        let filter = SignalFilter::Median(5);
        let sweep = FilteredSweep::new(&raw, &filter, RecordingMode::VoltageClamp, 10.0);
        assert_eq!(sweep.amplitude.len(), raw.len());
        let mean = sweep.amplitude.iter().sum::<Real>() / raw.len() as Real;
        for (a, d) in sweep.amplitude.iter().zip(&sweep.derivative) {
            assert_approx_eq!(a - mean, d, 1e-12);
        }
    }

    #[test]
    fn current_clamp_shapes_match() {
        let raw: Vec<Real> = (0..50).map(|i| (i as Real / 5.0).sin()).collect();
        let filter = SignalFilter::new(&DetectionConfig::default(), RecordingMode::CurrentClamp)
            .unwrap();
        let sweep = FilteredSweep::new(&raw, &filter, RecordingMode::CurrentClamp, 10.0);
        assert_eq!(sweep.amplitude.len(), raw.len());
        assert_eq!(sweep.derivative.len(), raw.len());
        assert_eq!(sweep.derivative[0], 0.0);
    }
}
