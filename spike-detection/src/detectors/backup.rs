use crate::{
    Real,
    signals::{mean, population_sd, span},
};
use apdetect_common::Point;

const SD_FRACTION: Real = 0.7;
const MAX_STEPS: usize = 20;
const MOVE_FORWARD_STEPS: usize = 4;

/// Steps an amplitude-threshold onset back towards the foot of the spike.
///
/// Starting from the bin centred on `onset`, the search repeatedly compares
/// the mean of the current bin with the mean and spread of the bin one step
/// earlier, and stops once the earlier bin is no longer clearly lower. The
/// onset is then placed a few bins forward of where the search stopped.
/// `smoothed` is the median filtered raw amplitude.
pub(crate) fn backup_onset(smoothed: &[Real], onset: Point, bin: usize) -> Point {
    let half = bin / 2;
    let mut at = onset;
    let mut this_mean = onset
        .checked_sub(half)
        .and_then(|start| mean(span(smoothed, start, onset + half)));
    let mut steps = 0;

    while let Some(current) = this_mean {
        if steps == MAX_STEPS {
            break;
        }
        let Some(next) = at
            .checked_sub(1 + bin + half)
            .and_then(|start| smoothed.get(start..start + 2 * half))
            .filter(|window| !window.is_empty())
        else {
            break;
        };
        let (Some(next_mean), Some(next_sd)) = (mean(next), population_sd(next)) else {
            break;
        };
        if current - next_mean < next_sd * SD_FRACTION {
            break;
        }
        this_mean = Some(next_mean);
        at -= bin;
        steps += 1;
    }

    let onset = onset as i64;
    let steps = steps as i64 - 1;
    let bin = bin as i64;
    let moved = if steps < MOVE_FORWARD_STEPS as i64 {
        onset - steps * bin
    } else {
        onset - (steps - MOVE_FORWARD_STEPS as i64) * bin
    };
    let last = smoothed.len().saturating_sub(1) as i64;
    moved.clamp(0, last.max(0)) as Point
}
