use crate::{Real, error::UnknownStatistic, signals::nan_mean, spike::SpikeRecord};
use apdetect_common::SweepFilter;
use std::str::FromStr;
use strum::{EnumIter, EnumString, IntoStaticStr};

/// A scalar field of [SpikeRecord], named as the field is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Statistic {
    Sweep,
    SweepSpikeNumber,
    SpikeNumber,
    ThresholdPoint,
    ThresholdSec,
    ThresholdVal,
    ThresholdValDvdt,
    DacCommand,
    PeakPoint,
    PeakSec,
    PeakVal,
    PeakHeight,
    PreMinPoint,
    PreMinVal,
    #[strum(serialize = "pre_linear_fit_point_0")]
    PreLinearFitPoint0,
    #[strum(serialize = "pre_linear_fit_val_0")]
    PreLinearFitVal0,
    #[strum(serialize = "pre_linear_fit_point_1")]
    PreLinearFitPoint1,
    #[strum(serialize = "pre_linear_fit_val_1")]
    PreLinearFitVal1,
    EarlyDiastolicDurationMs,
    EarlyDiastolicDurationRate,
    PreSpikeDvdtMaxPoint,
    PreSpikeDvdtMaxVal,
    PreSpikeDvdtMaxDvdt,
    PostSpikeDvdtMinPoint,
    PostSpikeDvdtMinVal,
    PostSpikeDvdtMinDvdt,
    IsiPoints,
    IsiMs,
    SpikeFreqHz,
    DiastolicDurationMs,
    CycleLengthPoints,
    CycleLengthMs,
}

impl Statistic {
    pub fn of(self, record: &SpikeRecord) -> Option<Real> {
        let fit = record.pre_linear_fit.as_ref();
        let pre = record.pre_spike_dvdt_max.as_ref();
        let post = record.post_spike_dvdt_min.as_ref();
        match self {
            Statistic::Sweep => Some(record.sweep as Real),
            Statistic::SweepSpikeNumber => Some(record.sweep_spike_number as Real),
            Statistic::SpikeNumber => Some(record.spike_number as Real),
            Statistic::ThresholdPoint => Some(record.threshold_point as Real),
            Statistic::ThresholdSec => Some(record.threshold_sec),
            Statistic::ThresholdVal => Some(record.threshold_val),
            Statistic::ThresholdValDvdt => Some(record.threshold_val_dvdt),
            Statistic::DacCommand => record.dac_command,
            Statistic::PeakPoint => Some(record.peak_point as Real),
            Statistic::PeakSec => Some(record.peak_sec),
            Statistic::PeakVal => Some(record.peak_val),
            Statistic::PeakHeight => Some(record.peak_height),
            Statistic::PreMinPoint => record.pre_min.map(|p| p.point as Real),
            Statistic::PreMinVal => record.pre_min.map(|p| p.value),
            Statistic::PreLinearFitPoint0 => fit.map(|f| f.start.point as Real),
            Statistic::PreLinearFitVal0 => fit.map(|f| f.start.value),
            Statistic::PreLinearFitPoint1 => fit.map(|f| f.stop.point as Real),
            Statistic::PreLinearFitVal1 => fit.map(|f| f.stop.value),
            Statistic::EarlyDiastolicDurationMs => fit.map(|f| f.early_diastolic_duration_ms),
            Statistic::EarlyDiastolicDurationRate => {
                fit.and_then(|f| f.early_diastolic_duration_rate)
            }
            Statistic::PreSpikeDvdtMaxPoint => pre.map(|e| e.point as Real),
            Statistic::PreSpikeDvdtMaxVal => pre.map(|e| e.value),
            Statistic::PreSpikeDvdtMaxDvdt => pre.map(|e| e.dvdt),
            Statistic::PostSpikeDvdtMinPoint => post.map(|e| e.point as Real),
            Statistic::PostSpikeDvdtMinVal => post.map(|e| e.value),
            Statistic::PostSpikeDvdtMinDvdt => post.map(|e| e.dvdt),
            Statistic::IsiPoints => record.isi_points.map(|isi| isi as Real),
            Statistic::IsiMs => record.isi_ms,
            Statistic::SpikeFreqHz => record.spike_freq_hz,
            Statistic::DiastolicDurationMs => record.diastolic_duration_ms,
            Statistic::CycleLengthPoints => record.cycle_length_points.map(|c| c as Real),
            Statistic::CycleLengthMs => record.cycle_length_ms,
        }
    }
}

/// A statistic name resolved against the configured half heights.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Accessor {
    Field(Statistic),
    /// Width in ms at the given percentage of spike height.
    Width(u32),
}

impl Accessor {
    fn parse(name: &str, half_heights: &[u32]) -> Result<Self, UnknownStatistic> {
        if let Some(height) = name.strip_prefix("widths_") {
            return u32::from_str(height)
                .ok()
                .filter(|height| half_heights.contains(height))
                .map(Accessor::Width)
                .ok_or_else(|| UnknownStatistic(name.to_owned()));
        }
        Statistic::from_str(name)
            .map(Accessor::Field)
            .map_err(|_| UnknownStatistic(name.to_owned()))
    }

    fn of(self, record: &SpikeRecord) -> Real {
        match self {
            Accessor::Field(statistic) => statistic.of(record),
            Accessor::Width(height) => record.width(height).and_then(|w| w.width_ms),
        }
        .unwrap_or(Real::NAN)
    }
}

/// Values of the named statistic for every record in `sweep`, in record
/// order. Missing values are NaN.
pub(crate) fn stat(
    records: &[SpikeRecord],
    half_heights: &[u32],
    name: &str,
    sweep: SweepFilter,
) -> Result<Vec<Real>, UnknownStatistic> {
    let accessor = Accessor::parse(name, half_heights)?;
    Ok(records
        .iter()
        .filter(|record| sweep.includes(record.sweep))
        .map(|record| accessor.of(record))
        .collect())
}

/// Mean of the statistic ignoring NaN values, `None` unless there are at
/// least two values.
pub(crate) fn stat_mean(values: &[Real]) -> Option<Real> {
    if values.len() > 1 {
        nan_mean(values)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn names_are_snake_case() {
        assert_eq!(Statistic::from_str("threshold_sec"), Ok(Statistic::ThresholdSec));
        assert_eq!(Statistic::from_str("isi_ms"), Ok(Statistic::IsiMs));
        assert_eq!(
            Statistic::from_str("pre_spike_dvdt_max_val"),
            Ok(Statistic::PreSpikeDvdtMaxVal)
        );
        assert_eq!(
            Statistic::from_str("pre_linear_fit_point_0"),
            Ok(Statistic::PreLinearFitPoint0)
        );
        let name: &'static str = Statistic::SpikeFreqHz.into();
        assert_eq!(name, "spike_freq_hz");
    }

    #[test]
    fn every_name_round_trips() {
        for statistic in Statistic::iter() {
            let name: &'static str = statistic.into();
            assert_eq!(Statistic::from_str(name), Ok(statistic));
        }
    }

    #[test]
    fn widths_need_a_configured_height() {
        let heights = [20, 50];
        assert_eq!(
            Accessor::parse("widths_50", &heights),
            Ok(Accessor::Width(50))
        );
        assert!(Accessor::parse("widths_30", &heights).is_err());
        assert!(Accessor::parse("widths_", &heights).is_err());
        assert_eq!(
            Accessor::parse("nonsense", &heights),
            Err(UnknownStatistic("nonsense".to_owned()))
        );
    }

    #[test]
    fn mean_of_values() {
        assert_eq!(stat_mean(&[]), None);
        assert_eq!(stat_mean(&[4.0]), None);
        assert_eq!(stat_mean(&[Real::NAN]), None);
        assert_eq!(stat_mean(&[Real::NAN, Real::NAN]), None);
        assert_eq!(stat_mean(&[1.0, Real::NAN, 3.0]), Some(2.0));
    }
}
