use crate::Real;
use apdetect_common::Point;

/// Number of samples spanned by `ms` milliseconds, rounding halves to even.
pub(crate) fn window_points(ms: Real, points_per_ms: Real) -> usize {
    (ms * points_per_ms).round_ties_even().max(0.0) as usize
}

/// Rounds to four decimal places, halves to even.
pub(crate) fn round4(value: Real) -> Real {
    (value * 1e4).round_ties_even() / 1e4
}

/// The samples of `values` in `[start, end)`, clipped to the bounds of `values`.
pub(crate) fn span(values: &[Real], start: usize, end: usize) -> &[Real] {
    let end = end.min(values.len());
    values.get(start.min(end)..end).unwrap_or_default()
}

/// Position of the first maximum.
pub(crate) fn first_argmax(values: &[Real]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, Real)>, (i, &v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Position of the first minimum.
pub(crate) fn first_argmin(values: &[Real]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, Real)>, (i, &v)| match best {
            Some((_, b)) if v >= b => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

pub(crate) fn mean(values: &[Real]) -> Option<Real> {
    (!values.is_empty()).then(|| values.iter().sum::<Real>() / values.len() as Real)
}

/// Standard deviation with `n` degrees of freedom.
pub(crate) fn population_sd(values: &[Real]) -> Option<Real> {
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<Real>() / values.len() as Real;
    Some(variance.sqrt())
}

/// Mean of the samples which are not NaN.
pub(crate) fn nan_mean(values: &[Real]) -> Option<Real> {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as Real)
}

/// Borrowed view of one sweep's raw and filtered signals.
#[derive(Clone, Copy)]
pub(crate) struct SweepSignals<'a> {
    pub(crate) time: &'a [Real],
    pub(crate) raw: &'a [Real],
    pub(crate) filtered: &'a [Real],
    pub(crate) derivative: &'a [Real],
    pub(crate) command: Option<&'a [Real]>,
    pub(crate) points_per_ms: Real,
}

impl SweepSignals<'_> {
    pub(crate) fn points(&self, ms: Real) -> usize {
        window_points(ms, self.points_per_ms)
    }

    pub(crate) fn to_ms(&self, points: usize) -> Real {
        points as Real / self.points_per_ms
    }

    pub(crate) fn to_seconds(&self, point: Point) -> Real {
        point as Real / self.points_per_ms / 1000.0
    }
}
