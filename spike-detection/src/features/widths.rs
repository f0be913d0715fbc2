use crate::{
    Real,
    annotation::{ErrorCategory, SearchFailure},
    signals::{SweepSignals, span},
    spike::{PointValue, WidthMeasurement},
};
use apdetect_common::Point;

/// Measures the width of a spike at `half_height` percent of its height
/// above the onset value.
///
/// The falling point is the first sample after the peak that drops below the
/// target, searched over `window` samples. The rising point is the first
/// sample after the onset that exceeds the falling point's value. The width
/// runs from the onset to the falling point.
pub(super) fn measure_width(
    signals: &SweepSignals,
    onset: PointValue,
    peak: PointValue,
    half_height: u32,
    window: usize,
) -> (WidthMeasurement, Option<SearchFailure>) {
    let target = onset.value + (peak.value - onset.value) * Real::from(half_height) * 0.01;
    let mut measurement = WidthMeasurement {
        half_height,
        rising: None,
        falling: None,
        width_points: None,
        width_ms: None,
    };
    let failure = |which: &str| {
        SearchFailure::new(
            ErrorCategory::SpikeWidth,
            format!(
                "no {which} point for half height {half_height}% searching for {target:.3} within {window} points of the peak at point {}",
                peak.point
            ),
        )
    };

    let Some(falling) = first_where(signals.filtered, peak.point, peak.point + window, |v| {
        v < target
    }) else {
        return (measurement, Some(failure("falling")));
    };
    measurement.falling = Some(falling);

    let Some(rising) = first_where(signals.filtered, onset.point, peak.point, |v| {
        v > falling.value
    }) else {
        return (measurement, Some(failure("rising")));
    };
    measurement.rising = Some(rising);

    let width_points = falling.point - onset.point;
    measurement.width_points = Some(width_points);
    measurement.width_ms = Some(signals.to_ms(width_points));
    (measurement, None)
}

fn first_where(
    values: &[Real],
    start: Point,
    end: Point,
    predicate: impl Fn(Real) -> bool,
) -> Option<PointValue> {
    span(values, start, end)
        .iter()
        .position(|&value| predicate(value))
        .and_then(|k| {
            values.get(start + k).map(|&value| PointValue {
                point: start + k,
                value,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn triangle() -> Vec<Real> {
        // Onset at 10, peak of 30 at 20, back to 0 by 30.
        (0..50)
            .map(|i| match i {
                0..=10 => 0.0,
                11..=20 => 3.0 * (i - 10) as Real,
                21..=30 => 3.0 * (30 - i) as Real,
                _ => 0.0,
            })
            .collect()
    }

    fn signals(filtered: &[Real]) -> SweepSignals<'_> {
        SweepSignals {
            time: filtered,
            raw: filtered,
            filtered,
            derivative: filtered,
            command: None,
            points_per_ms: 2.0,
        }
    }

    #[test]
    fn width_at_half_height() {
        let filtered = triangle();
        let signals = signals(&filtered);
        let onset = PointValue { point: 10, value: 0.0 };
        let peak = PointValue { point: 20, value: 30.0 };
        let (width, failure) = measure_width(&signals, onset, peak, 50, 20);
        assert!(failure.is_none());
        // First below 15 after the peak is 12 at sample 26.
        assert_eq!(width.falling, Some(PointValue { point: 26, value: 12.0 }));
        // First above 12 after the onset is 15 at sample 15.
        assert_eq!(width.rising, Some(PointValue { point: 15, value: 15.0 }));
        assert_eq!(width.width_points, Some(16));
        assert_approx_eq!(width.width_ms.unwrap(), 8.0);
    }

    #[test]
    fn higher_fractions_are_narrower() {
        let filtered = triangle();
        let signals = signals(&filtered);
        let onset = PointValue { point: 10, value: 0.0 };
        let peak = PointValue { point: 20, value: 30.0 };
        let widths: Vec<_> = [10, 50, 90]
            .into_iter()
            .map(|h| measure_width(&signals, onset, peak, h, 20).0.width_points.unwrap())
            .collect();
        assert!(widths.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn falling_point_outside_window() {
        let filtered = triangle();
        let signals = signals(&filtered);
        let onset = PointValue { point: 10, value: 0.0 };
        let peak = PointValue { point: 20, value: 30.0 };
        let (width, failure) = measure_width(&signals, onset, peak, 10, 5);
        assert_eq!(width.width_ms, None);
        assert_eq!(width.falling, None);
        assert_eq!(failure.unwrap().category, ErrorCategory::SpikeWidth);
    }
}
