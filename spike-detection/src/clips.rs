use crate::{Real, signals::window_points};
use apdetect_common::Point;
use clap::ValueEnum;
use serde::Serialize;
use strum::{Display, EnumString};

/// Which amplitude clips are cut from.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum ClipSource {
    #[default]
    Raw,
    Filtered,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeClip {
    /// Identifies the spike the clip was cut around: its global spike number
    /// when clips are taken from an analysis, its position in the onset list
    /// for [make_clips].
    pub spike: usize,
    pub onset: Point,
    pub values: Vec<Real>,
}

/// Equal length clips sharing a time axis in ms relative to the onset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpikeClips {
    pub time_axis: Vec<Real>,
    pub clips: Vec<SpikeClip>,
}

impl SpikeClips {
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Sample-wise mean of the clips.
    pub fn mean(&self) -> Option<Vec<Real>> {
        let first = self.clips.first()?;
        let mut sum = vec![0.0; first.values.len()];
        for clip in &self.clips {
            for (total, value) in sum.iter_mut().zip(&clip.values) {
                *total += value;
            }
        }
        let count = self.clips.len() as Real;
        Some(sum.into_iter().map(|total| total / count).collect())
    }
}

/// Cuts fixed width windows centred on onsets.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClipBuilder {
    half: usize,
    points_per_ms: Real,
}

impl ClipBuilder {
    pub(crate) fn new(width_ms: Real, points_per_ms: Real) -> Self {
        let width = window_points(width_ms, points_per_ms);
        let width = width + width % 2;
        Self {
            half: width / 2,
            points_per_ms,
        }
    }

    pub(crate) fn time_axis(&self) -> Vec<Real> {
        (0..2 * self.half)
            .map(|k| (k as Real - self.half as Real) / self.points_per_ms)
            .collect()
    }

    /// `None` if the clip would extend beyond either end of `signal`.
    pub(crate) fn clip(&self, signal: &[Real], onset: Point) -> Option<Vec<Real>> {
        let start = onset.checked_sub(self.half)?;
        signal.get(start..onset + self.half).map(<[Real]>::to_vec)
    }
}

/// Cuts a clip of `width_ms` around each onset in `signal`. Clips which
/// would cross either end of the signal are left out.
pub fn make_clips(
    onsets: &[Point],
    width_ms: Real,
    signal: &[Real],
    points_per_ms: Real,
) -> SpikeClips {
    let builder = ClipBuilder::new(width_ms, points_per_ms);
    SpikeClips {
        time_axis: builder.time_axis(),
        clips: onsets
            .iter()
            .enumerate()
            .filter_map(|(spike, &onset)| {
                builder.clip(signal, onset).map(|values| SpikeClip {
                    spike,
                    onset,
                    values,
                })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn odd_width_is_rounded_up() {
        let signal: Vec<Real> = (0..100).map(|i| i as Real).collect();
        let clips = make_clips(&[50], 0.5, &signal, 10.0);
        assert_eq!(clips.time_axis.len(), 6);
        assert_approx_eq!(clips.time_axis[0], -0.3);
        assert_approx_eq!(clips.time_axis[3], 0.0);
        assert_eq!(clips.clips[0].values, vec![47.0, 48.0, 49.0, 50.0, 51.0, 52.0]);
    }

    #[test]
    fn boundary_clips_are_dropped() {
        let signal = vec![0.0; 100];
        let clips = make_clips(&[2, 50, 97], 1.0, &signal, 10.0);
        assert_eq!(clips.len(), 1);
        assert_eq!(clips.clips[0].spike, 1);
        assert_eq!(clips.clips[0].onset, 50);
    }

    #[test]
    fn clips_are_idempotent() {
        let signal: Vec<Real> = (0..200).map(|i| (i as Real / 7.0).sin()).collect();
        let first = make_clips(&[40, 90, 150], 4.0, &signal, 10.0);
        let second = make_clips(&[40, 90, 150], 4.0, &signal, 10.0);
        assert_eq!(first, second);
    }

    #[test]
    fn mean_clip() {
        let signal: Vec<Real> = (0..100).map(|i| i as Real).collect();
        let clips = make_clips(&[20, 40], 0.4, &signal, 10.0);
        assert_eq!(clips.mean(), Some(vec![28.0, 29.0, 30.0, 31.0]));
        assert_eq!(SpikeClips::default().mean(), None);
    }
}
