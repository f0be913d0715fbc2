use super::{Real, Window};
use itertools::Itertools;
use std::collections::VecDeque;

#[derive(Default, Clone)]
pub(crate) struct MedianWindow {
    size: usize,
    values: VecDeque<Real>,
}

impl MedianWindow {
    pub(crate) fn new(size: usize) -> Self {
        MedianWindow {
            size,
            values: VecDeque::with_capacity(size + 1),
        }
    }
}

impl Window for MedianWindow {
    fn push(&mut self, value: Real) -> bool {
        self.values.push_back(value);
        if self.values.len() > self.size {
            self.values.pop_front();
        }
        self.values.len() == self.size
    }

    fn output(&self) -> Option<Real> {
        (self.values.len() == self.size).then_some(())?;
        self.values
            .iter()
            .copied()
            .sorted_by(Real::total_cmp)
            .nth(self.size / 2)
    }

    fn apply_time_shift(&self, time: Real) -> Real {
        time - (self.size / 2) as Real
    }
}
