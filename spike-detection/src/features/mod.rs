//! Per-spike measurements taken from the filtered signals once the onsets
//! of a sweep are known.
mod diastolic;
mod widths;

use crate::{
    DetectionConfig, Real,
    annotation::{ErrorAnnotation, ErrorCategory, SearchFailure},
    detectors::Candidate,
    signals::{SweepSignals, first_argmax, first_argmin, span},
    spike::{DerivativeExtremum, PointValue, SpikeContext, SpikeRecord},
};
use apdetect_common::{Point, SweepIndex};
use diastolic::{diastolic_minimum, early_diastolic_fit};
use tracing::{Span, debug, info, instrument, trace};
use widths::measure_width;

/// Span after the peak searched for the steepest repolarisation.
const POST_SPIKE_WINDOW_MS: Real = 10.0;

pub(crate) struct SpikeFeatureExtractor<'a> {
    config: &'a DetectionConfig,
    context: &'a SpikeContext,
}

/// The onset and diastolic minimum of the previous spike in the sweep.
#[derive(Clone, Copy)]
struct Previous {
    onset: Point,
    pre_min: Option<Point>,
}

impl<'a> SpikeFeatureExtractor<'a> {
    pub(crate) fn new(config: &'a DetectionConfig, context: &'a SpikeContext) -> Self {
        Self { config, context }
    }

    fn peak_window(&self, signals: &SweepSignals) -> usize {
        signals.points(self.config.peak_window_ms).max(1)
    }

    fn peak(&self, signals: &SweepSignals, onset: Point) -> Option<PointValue> {
        let window = span(signals.filtered, onset, onset + self.peak_window(signals));
        first_argmax(window).and_then(|k| {
            window.get(k).map(|&value| PointValue {
                point: onset + k,
                value,
            })
        })
    }

    fn clears_peak_floor(&self, signals: &SweepSignals, onset: Point) -> bool {
        match self.config.only_peaks_above_mv {
            Some(floor) => self.peak(signals, onset).is_some_and(|peak| peak.value > floor),
            None => true,
        }
    }

    /// Measures every candidate of one sweep, numbering the resulting spikes
    /// from `first_spike_number`.
    #[instrument(skip_all, level = "debug", fields(
        sweep = sweep,
        num_candidates = candidates.len(),
        num_spikes,
    ))]
    pub(crate) fn extract(
        &self,
        sweep: SweepIndex,
        first_spike_number: usize,
        candidates: Vec<Candidate>,
        signals: &SweepSignals,
    ) -> Vec<SpikeRecord> {
        let num_candidates = candidates.len();
        let candidates: Vec<_> = candidates
            .into_iter()
            .filter(|candidate| self.clears_peak_floor(signals, candidate.point))
            .collect();
        if candidates.len() < num_candidates {
            trace!(
                "{} onsets dropped below the peak floor",
                num_candidates - candidates.len()
            );
        }

        let mut records = Vec::<SpikeRecord>::with_capacity(candidates.len());
        let mut previous: Option<Previous> = None;
        for candidate in candidates {
            let index = records.len();
            let Some(record) = self.measure(
                sweep,
                index,
                first_spike_number + index,
                candidate,
                previous,
                signals,
            ) else {
                continue;
            };
            previous = Some(Previous {
                onset: record.threshold_point,
                pre_min: record.pre_min.map(|pre_min| pre_min.point),
            });
            records.push(record);
        }

        let num_errors: usize = records.iter().map(|record| record.errors.len()).sum();
        Span::current().record("num_spikes", records.len());
        if self.config.verbose {
            info!(sweep, num_spikes = records.len(), num_errors, "Sweep analysed");
        } else {
            debug!(sweep, num_spikes = records.len(), num_errors, "Sweep analysed");
        }
        records
    }

    fn measure(
        &self,
        sweep: SweepIndex,
        sweep_spike_number: usize,
        spike_number: usize,
        candidate: Candidate,
        previous: Option<Previous>,
        signals: &SweepSignals,
    ) -> Option<SpikeRecord> {
        let onset = candidate.point;
        let threshold = PointValue {
            point: onset,
            value: *signals.filtered.get(onset)?,
        };
        let peak = self.peak(signals, onset)?;
        let mut failures: Vec<SearchFailure> = candidate.failure.into_iter().collect();

        let pre_min = match previous {
            Some(_) => {
                let mdp = (self.config.mdp_ms * signals.points_per_ms) as usize;
                let avg = (self.config.avg_window_ms * signals.points_per_ms / 2.0) as usize;
                keep_failure(diastolic_minimum(signals, onset, mdp, avg), &mut failures)
            }
            None => None,
        };

        let pre_linear_fit = pre_min.map(|pre_min| {
            let (fit, failure) = early_diastolic_fit(signals, pre_min.point, onset);
            failures.extend(failure);
            fit
        });

        let pre_spike_dvdt_max = keep_failure(
            derivative_extremum(signals, onset, peak.point + 1, first_argmax).ok_or_else(|| {
                SearchFailure::new(
                    ErrorCategory::PreSpikeDvdt,
                    format!("empty window between onset {onset} and peak {}", peak.point),
                )
            }),
            &mut failures,
        );
        let post_window = signals.points(POST_SPIKE_WINDOW_MS);
        let post_spike_dvdt_min = keep_failure(
            derivative_extremum(signals, peak.point, peak.point + post_window, first_argmin)
                .ok_or_else(|| {
                    SearchFailure::new(
                        ErrorCategory::PostSpikeDvdt,
                        format!("empty window of {post_window} points after peak {}", peak.point),
                    )
                }),
            &mut failures,
        );

        let isi_points = previous.map(|previous| onset.saturating_sub(previous.onset));
        let isi_ms = isi_points.map(|isi| signals.to_ms(isi));
        let spike_freq_hz = isi_ms.and_then(|isi| (isi > 0.0).then(|| 1000.0 / isi));
        let diastolic_duration_ms =
            pre_min.map(|pre_min| signals.to_ms(onset.saturating_sub(pre_min.point)));
        let cycle_length_points = previous
            .and_then(|previous| previous.pre_min)
            .zip(pre_min)
            .map(|(previous, current)| current.point.saturating_sub(previous));
        let cycle_length_ms = cycle_length_points.map(|points| signals.to_ms(points));

        let half_width_window = signals.points(self.config.half_width_window_ms);
        let widths = self
            .config
            .half_heights
            .iter()
            .map(|&half_height| {
                let (width, failure) =
                    measure_width(signals, threshold, peak, half_height, half_width_window);
                failures.extend(failure);
                width
            })
            .collect();

        let threshold_sec = signals.to_seconds(onset);
        let errors = failures
            .into_iter()
            .map(|failure| ErrorAnnotation::new(sweep, sweep_spike_number, threshold_sec, failure))
            .collect();

        Some(SpikeRecord {
            sweep,
            sweep_spike_number,
            spike_number,
            threshold_point: onset,
            threshold_sec,
            threshold_val: threshold.value,
            threshold_val_dvdt: signals.derivative.get(onset).copied().unwrap_or(Real::NAN),
            dac_command: signals
                .command
                .and_then(|command| command.get(onset).copied()),
            peak_point: peak.point,
            peak_sec: signals.to_seconds(peak.point),
            peak_val: peak.value,
            peak_height: peak.value - threshold.value,
            pre_min,
            pre_linear_fit,
            pre_spike_dvdt_max,
            post_spike_dvdt_min,
            isi_points,
            isi_ms,
            spike_freq_hz,
            diastolic_duration_ms,
            cycle_length_points,
            cycle_length_ms,
            widths,
            errors,
            context: self.context.clone(),
        })
    }
}

fn keep_failure<T>(
    result: Result<T, SearchFailure>,
    failures: &mut Vec<SearchFailure>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(failure) => {
            failures.push(failure);
            None
        }
    }
}

/// Applies `locate` to the derivative over `[start, end)`.
fn derivative_extremum(
    signals: &SweepSignals,
    start: Point,
    end: Point,
    locate: fn(&[Real]) -> Option<usize>,
) -> Option<DerivativeExtremum> {
    let point = locate(span(signals.derivative, start, end))? + start;
    Some(DerivativeExtremum {
        point,
        value: *signals.filtered.get(point)?,
        dvdt: *signals.derivative.get(point)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn spike_train(starts: &[usize], len: usize) -> (Vec<Real>, Vec<Real>) {
        // Linear rise over 10 samples to +20 then linear fall to a -80 trough
        // recovering to -70.
        let mut filtered = vec![-70.0; len];
        for &start in starts {
            for k in 0..10 {
                filtered[start + k] = -70.0 + 9.0 * k as Real;
            }
            for k in 0..10 {
                filtered[start + 10 + k] = 20.0 - 10.0 * k as Real;
            }
            for k in 0..20 {
                filtered[start + 20 + k] = -80.0 + 0.5 * k as Real;
            }
        }
        let derivative = std::iter::once(0.0)
            .chain(filtered.windows(2).map(|w| w[1] - w[0]))
            .collect();
        (filtered, derivative)
    }

    fn signals<'a>(filtered: &'a [Real], derivative: &'a [Real]) -> SweepSignals<'a> {
        SweepSignals {
            time: filtered,
            raw: filtered,
            filtered,
            derivative,
            command: None,
            points_per_ms: 1.0,
        }
    }

    fn config() -> DetectionConfig {
        DetectionConfig {
            peak_window_ms: 30.0,
            mdp_ms: 90.0,
            avg_window_ms: 2.0,
            half_width_window_ms: 30.0,
            half_heights: vec![20, 50, 80],
            ..Default::default()
        }
    }

    fn extract(
        config: &DetectionConfig,
        onsets: &[usize],
        signals: &SweepSignals,
    ) -> Vec<SpikeRecord> {
        let context = SpikeContext::new(config, Some("test"));
        SpikeFeatureExtractor::new(config, &context).extract(
            2,
            7,
            onsets.iter().copied().map(Candidate::new).collect(),
            signals,
        )
    }

    #[test]
    fn peak_and_numbering() {
        let (filtered, derivative) = spike_train(&[50, 150], 250);
        let records = extract(&config(), &[50, 150], &signals(&filtered, &derivative));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].sweep, 2);
        assert_eq!(records[1].sweep_spike_number, 1);
        assert_eq!(records[1].spike_number, 8);
        assert_eq!(records[0].peak_point, 60);
        assert_approx_eq!(records[0].peak_val, 20.0);
        assert_approx_eq!(records[0].peak_height, 90.0);
        assert_eq!(records[0].context.file.as_deref(), Some("test"));
    }

    #[test]
    fn first_spike_has_no_interval_features() {
        let (filtered, derivative) = spike_train(&[50, 150], 250);
        let records = extract(&config(), &[50, 150], &signals(&filtered, &derivative));
        let first = &records[0];
        assert_eq!(first.pre_min, None);
        assert_eq!(first.isi_ms, None);
        assert_eq!(first.spike_freq_hz, None);
        assert_eq!(first.cycle_length_ms, None);
        assert!(first.errors.is_empty());

        let second = &records[1];
        assert_eq!(second.isi_points, Some(100));
        assert_approx_eq!(second.spike_freq_hz.unwrap(), 10.0);
        assert!(second.pre_min.is_some());
        assert!(second.pre_linear_fit.is_some());
        // Only one diastolic minimum exists so far.
        assert_eq!(second.cycle_length_ms, None);
    }

    #[test]
    fn cycle_length_needs_both_minima() {
        let (filtered, derivative) = spike_train(&[50, 150, 250], 350);
        let records = extract(&config(), &[50, 150, 250], &signals(&filtered, &derivative));
        assert_eq!(records[2].cycle_length_points, Some(100));
        assert_approx_eq!(records[2].cycle_length_ms.unwrap(), 100.0);
    }

    #[test]
    fn derivative_extrema() {
        let (filtered, derivative) = spike_train(&[50], 150);
        let records = extract(&config(), &[50], &signals(&filtered, &derivative));
        let pre = records[0].pre_spike_dvdt_max.unwrap();
        assert_eq!(pre.point, 51);
        assert_approx_eq!(pre.dvdt, 9.0);
        let post = records[0].post_spike_dvdt_min.unwrap();
        assert_eq!(post.point, 61);
        assert_approx_eq!(post.dvdt, -10.0);
    }

    #[test]
    fn widths_shrink_with_height() {
        let (filtered, derivative) = spike_train(&[50], 150);
        let records = extract(&config(), &[50], &signals(&filtered, &derivative));
        let widths: Vec<_> = records[0]
            .widths
            .iter()
            .map(|w| w.width_ms.unwrap())
            .collect();
        assert_eq!(widths.len(), 3);
        assert!(widths.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn peak_floor_drops_silently() {
        let (filtered, derivative) = spike_train(&[50, 150], 250);
        let config = DetectionConfig {
            only_peaks_above_mv: Some(25.0),
            ..config()
        };
        let records = extract(&config, &[50, 150], &signals(&filtered, &derivative));
        assert!(records.is_empty());
    }

    #[test]
    fn refinement_failure_becomes_annotation() {
        let (filtered, derivative) = spike_train(&[50], 150);
        let config = config();
        let context = SpikeContext::new(&config, None);
        let records = SpikeFeatureExtractor::new(&config, &context).extract(
            0,
            0,
            vec![Candidate {
                point: 50,
                failure: Some(SearchFailure::new(ErrorCategory::DvdtPercent, "refine")),
            }],
            &signals(&filtered, &derivative),
        );
        assert_eq!(records[0].errors.len(), 1);
        assert_eq!(records[0].errors[0].category, ErrorCategory::DvdtPercent);
        assert_approx_eq!(records[0].errors[0].seconds, 0.05);
    }
}
