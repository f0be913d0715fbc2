//! Onset detection. Each strategy streams a sweep's samples through a
//! [Detector] to find threshold crossings, then gates and refines them into
//! a time ordered list of [Candidate] onsets.
mod amplitude;
mod backup;
mod crossing;
mod dvdt;
mod refractory;

use crate::{DetectionConfig, Real, annotation::SearchFailure, signals::SweepSignals};
use apdetect_common::Point;
use tracing::debug;

pub(crate) use amplitude::AmplitudeOnsetDetector;
pub(crate) use dvdt::DvdtOnsetDetector;
pub(crate) use refractory::collapse_refractory;

pub(crate) trait Detector: Clone {
    fn signal(&mut self, time: Point, value: Real) -> Option<Point>;
}

#[derive(Clone)]
pub(crate) struct EventIter<I, D>
where
    I: Iterator<Item = (Point, Real)>,
    D: Detector,
{
    source: I,
    detector: D,
}

impl<I, D> Iterator for EventIter<I, D>
where
    I: Iterator<Item = (Point, Real)>,
    D: Detector,
{
    type Item = Point;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (time, value) = self.source.next()?;
            if let Some(event) = self.detector.signal(time, value) {
                return Some(event);
            }
        }
    }
}

pub(crate) trait EventFilter<I, D>
where
    I: Iterator<Item = (Point, Real)>,
    D: Detector,
{
    fn events(self, detector: D) -> EventIter<I, D>;
}

impl<I, D> EventFilter<I, D> for I
where
    I: Iterator<Item = (Point, Real)>,
    D: Detector,
{
    fn events(self, detector: D) -> EventIter<I, D> {
        EventIter {
            source: self,
            detector,
        }
    }
}

/// A spike onset, with the failure of its refinement search if there was one.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    pub(crate) point: Point,
    pub(crate) failure: Option<SearchFailure>,
}

impl Candidate {
    pub(crate) fn new(point: Point) -> Self {
        Self {
            point,
            failure: None,
        }
    }
}

pub(crate) trait OnsetDetector {
    fn candidates(&self, signals: &SweepSignals) -> Vec<Candidate>;
}

/// Runs the strategy selected by `config` over one sweep. The result is
/// sorted and no two onsets are closer than the refractory period.
pub(crate) fn detect_onsets(config: &DetectionConfig, signals: &SweepSignals) -> Vec<Candidate> {
    let min_gap = config.refractory_ms * signals.points_per_ms;
    let mut candidates = match config.dvdt_threshold {
        Some(threshold) => DvdtOnsetDetector::new(config, threshold, min_gap).candidates(signals),
        None => AmplitudeOnsetDetector::new(config, min_gap).candidates(signals),
    };
    candidates.sort_by_key(|candidate| candidate.point);

    let num_refined = candidates.len();
    let candidates = collapse_refractory(candidates, min_gap);
    if candidates.len() < num_refined {
        debug!(
            "{} refined onsets fell within the refractory period",
            num_refined - candidates.len()
        );
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals<'a>(raw: &'a [Real], derivative: &'a [Real]) -> SweepSignals<'a> {
        SweepSignals {
            time: raw,
            raw,
            filtered: raw,
            derivative,
            command: None,
            points_per_ms: 1.0,
        }
    }

    #[test]
    fn onsets_are_sorted_and_refractory_clean() {
        let mut raw = vec![-70.0; 400];
        let mut derivative = vec![0.0; 400];
        for start in [50, 60, 200] {
            for k in 0..5 {
                raw[start + k] = 20.0;
                derivative[start + k] = 50.0;
            }
        }
        let config = DetectionConfig {
            dvdt_threshold: Some(10.0),
            refractory_ms: 100.0,
            peak_window_ms: 10.0,
            dvdt_pre_window_ms: 5.0,
            ..Default::default()
        };
        let onsets: Vec<_> = detect_onsets(&config, &signals(&raw, &derivative))
            .into_iter()
            .map(|c| c.point)
            .collect();
        assert_eq!(onsets.len(), 2);
        assert!(onsets[1] - onsets[0] >= 100);
        assert!(onsets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn refinements_onto_one_sample_are_merged() {
        let raw = vec![20.0; 40];
        let mut derivative = vec![0.0; 40];
        derivative[10] = 40.0;
        derivative[11] = 5.0;
        derivative[12] = 40.0;
        let config = DetectionConfig {
            dvdt_threshold: Some(10.0),
            refractory_ms: 0.0,
            peak_window_ms: 10.0,
            dvdt_pre_window_ms: 5.0,
            ..Default::default()
        };
        // Both crossings, at 10 and 12, refine back to sample 9.
        let onsets: Vec<_> = detect_onsets(&config, &signals(&raw, &derivative))
            .into_iter()
            .map(|c| c.point)
            .collect();
        assert_eq!(onsets, vec![9]);
    }
}
