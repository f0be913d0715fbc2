use crate::{
    DetectionConfig, Real,
    annotation::{ErrorAnnotation, error_report},
    clips::{ClipBuilder, ClipSource, SpikeClip, SpikeClips},
    detectors::detect_onsets,
    error::{DetectionError, UnknownStatistic},
    features::SpikeFeatureExtractor,
    filter::{FilteredSweep, SignalFilter},
    parameters::DetectionType,
    signals::SweepSignals,
    spike::{SpikeContext, SpikeRecord},
    stats,
};
use apdetect_common::{
    Recording, SweepFilter,
    metrics::{
        failures::{self, FailureKind},
        names::{FAILURES, RECORDINGS_ANALYSED, SEARCH_FAILURES, SPIKES_DETECTED},
        search_failures,
    },
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{Span, info, instrument, warn};

/// The outcome of one detection run over a recording.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionRun {
    pub config: DetectionConfig,
    pub detection_type: DetectionType,
    pub date_analysed: DateTime<Utc>,
    pub version: &'static str,
    pub spikes: Vec<SpikeRecord>,
    pub errors: Vec<ErrorAnnotation>,
}

/// A recording together with its filtered signals and the results of the
/// most recent detection run.
///
/// Detection takes `&mut self`, so no reader can hold on to the records of
/// a run while they are being replaced.
#[derive(Debug, Clone)]
pub struct SpikeAnalysis {
    recording: Recording,
    filtered: Vec<FilteredSweep>,
    run: Option<DetectionRun>,
}

fn filter_sweeps(recording: &Recording, filter: &SignalFilter) -> Vec<FilteredSweep> {
    recording
        .sweeps()
        .iter()
        .map(|sweep| {
            FilteredSweep::new(
                sweep.amplitude(),
                filter,
                recording.mode(),
                recording.points_per_ms(),
            )
        })
        .collect()
}

impl SpikeAnalysis {
    /// Filters the recording with the default configuration. No spikes are
    /// detected until [SpikeAnalysis::detect] is called.
    pub fn new(recording: Recording) -> Result<Self, DetectionError> {
        let filter = SignalFilter::new(&DetectionConfig::default(), recording.mode())?;
        let filtered = filter_sweeps(&recording, &filter);
        Ok(Self {
            recording,
            filtered,
            run: None,
        })
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// The filtered signals of each sweep, matching the raw sweeps in shape.
    pub fn filtered(&self) -> &[FilteredSweep] {
        &self.filtered
    }

    pub fn run(&self) -> Option<&DetectionRun> {
        self.run.as_ref()
    }

    pub fn spikes(&self) -> &[SpikeRecord] {
        self.run.as_ref().map(|run| run.spikes.as_slice()).unwrap_or_default()
    }

    pub fn errors(&self) -> &[ErrorAnnotation] {
        self.run.as_ref().map(|run| run.errors.as_slice()).unwrap_or_default()
    }

    pub fn num_spikes(&self) -> usize {
        self.spikes().len()
    }

    /// Refilters the recording with `config` and detects and measures every
    /// spike, replacing the results of any previous run. An invalid
    /// configuration leaves the previous results in place.
    #[instrument(skip_all, fields(
        recording = self.recording.name().unwrap_or_default(),
        num_sweeps = self.recording.num_sweeps(),
        detection_type = %config.detection_type(),
        num_spikes,
    ))]
    pub fn detect(&mut self, config: &DetectionConfig) -> Result<&DetectionRun, DetectionError> {
        let filter = config
            .validate()
            .and_then(|_| SignalFilter::new(config, self.recording.mode()))
            .inspect_err(|e| {
                warn!("Configuration rejected: {e}");
                counter!(FAILURES, &[failures::get_label(FailureKind::InvalidConfig)])
                    .increment(1);
            })?;
        let filtered = filter_sweeps(&self.recording, &filter);

        let context = SpikeContext::new(config, self.recording.name());
        let extractor = SpikeFeatureExtractor::new(config, &context);
        let points_per_ms = self.recording.points_per_ms();
        let mut spikes = Vec::<SpikeRecord>::new();
        for (index, (sweep, smoothed)) in self.recording.sweeps().iter().zip(&filtered).enumerate()
        {
            let signals = SweepSignals {
                time: sweep.time(),
                raw: sweep.amplitude(),
                filtered: &smoothed.amplitude,
                derivative: &smoothed.derivative,
                command: sweep.command(),
                points_per_ms,
            };
            let candidates = detect_onsets(config, &signals);
            let first_spike_number = spikes.len();
            spikes.extend(extractor.extract(index, first_spike_number, candidates, &signals));
        }
        let errors = error_report(&spikes);

        counter!(RECORDINGS_ANALYSED).increment(1);
        counter!(SPIKES_DETECTED).increment(spikes.len() as u64);
        for error in &errors {
            counter!(
                SEARCH_FAILURES,
                &[search_failures::get_label(error.category.into())]
            )
            .increment(1);
        }
        Span::current().record("num_spikes", spikes.len());
        info!(
            "Detected {} spikes with {} search failures",
            spikes.len(),
            errors.len()
        );

        self.filtered = filtered;
        Ok(self.run.insert(DetectionRun {
            config: config.clone(),
            detection_type: config.detection_type(),
            date_analysed: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
            spikes,
            errors,
        }))
    }

    fn half_heights(&self) -> &[u32] {
        self.run
            .as_ref()
            .map(|run| run.config.half_heights.as_slice())
            .unwrap_or_default()
    }

    /// Values of the named statistic, one per spike in `sweep`. Values which
    /// could not be measured are NaN.
    pub fn stat(&self, name: &str, sweep: SweepFilter) -> Result<Vec<Real>, UnknownStatistic> {
        stats::stat(self.spikes(), self.half_heights(), name, sweep)
    }

    pub fn stat_pair(
        &self,
        first: &str,
        second: &str,
        sweep: SweepFilter,
    ) -> Result<(Vec<Real>, Vec<Real>), UnknownStatistic> {
        Ok((self.stat(first, sweep)?, self.stat(second, sweep)?))
    }

    /// Mean of the named statistic over `sweep`, `None` if there are fewer
    /// than two spikes.
    pub fn stat_mean(
        &self,
        name: &str,
        sweep: SweepFilter,
    ) -> Result<Option<Real>, UnknownStatistic> {
        Ok(stats::stat_mean(&self.stat(name, sweep)?))
    }

    /// Clips of `width_ms` around the onsets of the spikes in `sweep`,
    /// optionally restricted to onsets within `time_range` seconds.
    pub fn clips(
        &self,
        width_ms: Real,
        sweep: SweepFilter,
        time_range: Option<(Real, Real)>,
        source: ClipSource,
    ) -> SpikeClips {
        let builder = ClipBuilder::new(width_ms, self.recording.points_per_ms());
        let clips = self
            .spikes()
            .iter()
            .filter(|spike| sweep.includes(spike.sweep))
            .filter(|spike| {
                time_range
                    .is_none_or(|(start, end)| (start..=end).contains(&spike.threshold_sec))
            })
            .filter_map(|spike| {
                let signal = match source {
                    ClipSource::Raw => self.recording.sweep(spike.sweep)?.amplitude(),
                    ClipSource::Filtered => self.filtered.get(spike.sweep)?.amplitude.as_slice(),
                };
                builder.clip(signal, spike.threshold_point).map(|values| SpikeClip {
                    spike: spike.spike_number,
                    onset: spike.threshold_point,
                    values,
                })
            })
            .collect();
        SpikeClips {
            time_axis: builder.time_axis(),
            clips,
        }
    }
}

/// Runs detection over independent recordings in parallel, returning the
/// number of spikes found in each.
pub fn detect_all(
    analyses: &mut [SpikeAnalysis],
    config: &DetectionConfig,
) -> Vec<Result<usize, DetectionError>> {
    analyses
        .par_iter_mut()
        .map(|analysis| analysis.detect(config).map(|run| run.spikes.len()))
        .collect()
}
