use super::{Detector, EventFilter};
use crate::Real;
use apdetect_common::Point;

/// Registers the first sample of every run of samples strictly above the
/// threshold. The detector re-arms once a sample falls back to or below it.
#[derive(Debug, Clone)]
pub(crate) struct CrossingDetector {
    threshold: Real,
    armed: bool,
}

impl CrossingDetector {
    pub(crate) fn new(threshold: Real) -> Self {
        Self {
            threshold,
            armed: true,
        }
    }
}

impl Detector for CrossingDetector {
    fn signal(&mut self, time: Point, value: Real) -> Option<Point> {
        if value > self.threshold {
            if self.armed {
                self.armed = false;
                return Some(time);
            }
        } else {
            self.armed = true;
        }
        None
    }
}

pub(crate) fn crossings(values: &[Real], threshold: Real) -> Vec<Point> {
    values
        .iter()
        .copied()
        .enumerate()
        .events(CrossingDetector::new(threshold))
        .collect()
}
