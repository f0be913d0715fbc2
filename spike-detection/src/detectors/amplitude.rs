use super::{
    Candidate, OnsetDetector, backup::backup_onset, collapse_refractory, crossing::crossings,
};
use crate::{
    DetectionConfig, Real,
    filter::SignalFilter,
    signals::{SweepSignals, mean, span},
};
use apdetect_common::Point;
use tracing::trace;

/// Samples either side of a crossing compared by the upward deflection gate.
const DEFLECTION_POINTS: usize = 10;
/// Crossings closer than this to the previously accepted one are ignored.
const MIN_INTERVAL_MS: Real = 75.0;
const BACKUP_MEDIAN: usize = 5;
const BACKUP_BIN_MS: Real = 1.0;

/// Finds onsets where the filtered amplitude rises through a threshold.
pub(crate) struct AmplitudeOnsetDetector {
    threshold: Real,
    min_gap: Real,
    backup: bool,
}

impl AmplitudeOnsetDetector {
    pub(crate) fn new(config: &DetectionConfig, min_gap: Real) -> Self {
        Self {
            threshold: config.mv_threshold,
            min_gap,
            backup: config.do_backup_spike_vm,
        }
    }

    fn is_upward(raw: &[Real], onset: Point) -> bool {
        let Some(start) = onset.checked_sub(DEFLECTION_POINTS) else {
            return false;
        };
        let before = mean(span(raw, start, onset));
        let after = mean(span(raw, onset + 1, onset + 1 + DEFLECTION_POINTS));
        matches!((before, after), (Some(before), Some(after)) if after > before)
    }
}

impl OnsetDetector for AmplitudeOnsetDetector {
    fn candidates(&self, signals: &SweepSignals) -> Vec<Candidate> {
        let min_interval = (MIN_INTERVAL_MS * signals.points_per_ms) as usize;
        let crossings = crossings(signals.filtered, self.threshold);
        let num_crossings = crossings.len();

        let mut accepted = Vec::<Candidate>::new();
        for onset in crossings {
            if !Self::is_upward(signals.raw, onset) {
                continue;
            }
            if accepted
                .last()
                .is_some_and(|last| onset - last.point < min_interval)
            {
                continue;
            }
            accepted.push(Candidate::new(onset));
        }
        trace!(
            "{num_crossings} amplitude crossings, {} deflect upward",
            accepted.len()
        );

        let accepted = collapse_refractory(accepted, self.min_gap);
        if !self.backup {
            return accepted;
        }
        let smoothed = SignalFilter::Median(BACKUP_MEDIAN).apply(signals.raw);
        let bin = signals.points(BACKUP_BIN_MS).max(1);
        accepted
            .into_iter()
            .map(|candidate| Candidate::new(backup_onset(&smoothed, candidate.point, bin)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(raw: &[Real], points_per_ms: Real) -> SweepSignals<'_> {
        SweepSignals {
            time: raw,
            raw,
            filtered: raw,
            derivative: raw,
            command: None,
            points_per_ms,
        }
    }

    fn step_train(starts: &[usize], len: usize) -> Vec<Real> {
        let mut raw = vec![-70.0; len];
        for &start in starts {
            for value in raw.iter_mut().skip(start).take(20) {
                *value = 10.0;
            }
        }
        raw
    }

    fn onsets(backup: bool, raw: &[Real], points_per_ms: Real) -> Vec<Point> {
        AmplitudeOnsetDetector::new(
            &DetectionConfig {
                dvdt_threshold: None,
                do_backup_spike_vm: backup,
                ..Default::default()
            },
            50.0,
        )
        .candidates(&signals(raw, points_per_ms))
        .into_iter()
        .map(|c| c.point)
        .collect()
    }

    #[test]
    fn crossings_without_backup() {
        let raw = step_train(&[100, 300], 500);
        assert_eq!(onsets(false, &raw, 1.0), vec![100, 300]);
    }

    #[test]
    fn crossings_within_minimum_interval_are_ignored() {
        let raw = step_train(&[100, 150], 500);
        assert_eq!(onsets(false, &raw, 1.0), vec![100]);
    }

    #[test]
    fn isolated_sample_is_not_an_upward_deflection() {
        let mut raw = step_train(&[100], 500);
        raw[300] = 0.0;
        assert_eq!(onsets(false, &raw, 1.0), vec![100]);
    }

    #[test]
    fn backup_moves_onset_earlier_on_flat_baseline() {
        let raw = step_train(&[1000], 3000);
        assert_eq!(onsets(true, &raw, 10.0), vec![850]);
    }
}
