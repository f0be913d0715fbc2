use super::{Candidate, OnsetDetector, collapse_refractory, crossing::crossings};
use crate::{
    DetectionConfig, Real,
    annotation::{ErrorCategory, SearchFailure},
    signals::{SweepSignals, span},
};
use apdetect_common::Point;
use itertools::Itertools;
use tracing::trace;

/// Finds onsets where the derivative rises through a threshold, then moves
/// each back to where the derivative was a fraction of its local maximum.
pub(crate) struct DvdtOnsetDetector {
    threshold: Real,
    mv_threshold: Real,
    peak_window_ms: Real,
    pre_window_ms: Real,
    percent_of_max: Real,
    min_gap: Real,
}

impl DvdtOnsetDetector {
    pub(crate) fn new(config: &DetectionConfig, threshold: Real, min_gap: Real) -> Self {
        Self {
            threshold,
            mv_threshold: config.mv_threshold,
            peak_window_ms: config.peak_window_ms,
            pre_window_ms: config.dvdt_pre_window_ms,
            percent_of_max: config.dvdt_percent_of_max,
            min_gap,
        }
    }

    fn exceeds_mv_threshold(&self, signals: &SweepSignals, onset: Point) -> bool {
        let window = signals.points(self.peak_window_ms).max(1);
        span(signals.raw, onset, onset + window)
            .iter()
            .copied()
            .max_by(Real::total_cmp)
            .is_some_and(|peak| peak > self.mv_threshold)
    }

    fn refine(&self, signals: &SweepSignals, onset: Point) -> Candidate {
        let window = signals.points(self.pre_window_ms);
        let peak = span(signals.derivative, onset, onset + window)
            .iter()
            .copied()
            .max_by(Real::total_cmp);
        let Some(peak) = peak else {
            return Candidate {
                point: onset,
                failure: Some(SearchFailure::new(
                    ErrorCategory::DvdtPercent,
                    format!("empty derivative window after crossing at point {onset}"),
                )),
            };
        };
        let target = self.percent_of_max * peak;
        let start = onset.saturating_sub(window);
        match span(signals.derivative, start, onset)
            .iter()
            .rev()
            .find_position(|&&value| value < target)
        {
            Some((k, _)) => Candidate::new(onset - 1 - k),
            None => Candidate {
                point: onset,
                failure: Some(SearchFailure::new(
                    ErrorCategory::DvdtPercent,
                    format!(
                        "no derivative below {target:.3} within {} ms before crossing at point {onset}",
                        self.pre_window_ms
                    ),
                )),
            },
        }
    }
}

impl OnsetDetector for DvdtOnsetDetector {
    fn candidates(&self, signals: &SweepSignals) -> Vec<Candidate> {
        let crossings = crossings(signals.derivative, self.threshold);
        let num_crossings = crossings.len();
        let gated = crossings
            .into_iter()
            .filter(|&onset| self.exceeds_mv_threshold(signals, onset))
            .map(Candidate::new)
            .collect_vec();
        trace!(
            "{num_crossings} derivative crossings, {} exceed the amplitude threshold",
            gated.len()
        );
        collapse_refractory(gated, self.min_gap)
            .into_iter()
            .map(|candidate| self.refine(signals, candidate.point))
            .collect()
    }
}
