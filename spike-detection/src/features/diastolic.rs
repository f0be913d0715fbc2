use crate::{
    Real,
    annotation::{ErrorCategory, SearchFailure},
    signals::{SweepSignals, first_argmin, mean, span},
    spike::{LinearFit, PointValue},
};
use apdetect_common::Point;

/// Locates the end of the diastolic minimum preceding `onset`.
///
/// The minimum of the filtered amplitude is found in the `mdp_points` before
/// the onset and averaged over `avg_points` either side of it. Walking back
/// from the onset, the first sample below that average gives the point; its
/// value is the average.
pub(super) fn diastolic_minimum(
    signals: &SweepSignals,
    onset: Point,
    mdp_points: usize,
    avg_points: usize,
) -> Result<PointValue, SearchFailure> {
    let start = onset.saturating_sub(mdp_points);
    let minimum = first_argmin(span(signals.filtered, start, onset))
        .map(|k| start + k)
        .ok_or_else(|| {
            SearchFailure::new(
                ErrorCategory::PreMin,
                format!("no samples within {mdp_points} points before onset"),
            )
        })?;
    let average = mean(span(
        signals.filtered,
        minimum.saturating_sub(avg_points),
        minimum + avg_points,
    ))
    .ok_or_else(|| {
        SearchFailure::new(
            ErrorCategory::PreMin,
            format!("empty averaging window around minimum at point {minimum}"),
        )
    })?;
    span(signals.filtered, minimum, onset)
        .iter()
        .rev()
        .position(|&value| value < average)
        .map(|k| PointValue {
            point: onset - k,
            value: average,
        })
        .ok_or_else(|| {
            SearchFailure::new(
                ErrorCategory::PreMin,
                format!("no sample below the local average {average:.3} before onset"),
            )
        })
}

/// Least squares slope of `ys` against `xs`, `None` if `xs` has no spread.
fn slope(xs: &[Real], ys: &[Real]) -> Option<Real> {
    let x_mean = mean(xs)?;
    let y_mean = mean(ys)?;
    let (sxy, sxx) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            (sxy + (x - x_mean) * (y - y_mean), sxx + (x - x_mean).powi(2))
        });
    (sxx > 0.0).then(|| sxy / sxx)
}

/// Fits a line to the filtered amplitude between 10% and 50% of the way
/// from the diastolic minimum to the onset.
pub(super) fn early_diastolic_fit(
    signals: &SweepSignals,
    pre_min: Point,
    onset: Point,
) -> (LinearFit, Option<SearchFailure>) {
    let interval = onset.saturating_sub(pre_min);
    let p0 = pre_min + interval / 10;
    let p1 = pre_min + interval / 2;
    let value_at = |point: Point| signals.filtered.get(point).copied().unwrap_or(Real::NAN);

    let xs = span(signals.time, p0, p1);
    let ys = span(signals.filtered, p0, p1);
    let (rate, failure) = if xs.is_empty() {
        (
            None,
            Some(SearchFailure::new(
                ErrorCategory::FitEdd,
                format!("empty fit interval [{p0}, {p1})"),
            )),
        )
    } else {
        match slope(xs, ys) {
            Some(rate) => (Some(rate), None),
            None => (
                None,
                Some(SearchFailure::new(
                    ErrorCategory::FitEdd2,
                    format!("fit over [{p0}, {p1}) is rank deficient"),
                )),
            ),
        }
    };
    (
        LinearFit {
            start: PointValue {
                point: p0,
                value: value_at(p0),
            },
            stop: PointValue {
                point: p1,
                value: value_at(p1),
            },
            early_diastolic_duration_ms: signals.to_ms(p1 - p0),
            early_diastolic_duration_rate: rate,
        },
        failure,
    )
}
