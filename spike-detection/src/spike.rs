use crate::{DetectionConfig, Real, annotation::ErrorAnnotation, parameters::DetectionType};
use apdetect_common::{Point, SweepIndex};
use serde::Serialize;

#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointValue {
    pub point: Point,
    pub value: Real,
}

/// An extremum of the derivative, with the filtered amplitude at that point.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivativeExtremum {
    pub point: Point,
    pub value: Real,
    pub dvdt: Real,
}

/// The line fitted to the early part of the diastolic depolarisation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub start: PointValue,
    pub stop: PointValue,
    pub early_diastolic_duration_ms: Real,
    /// Slope of the fit in amplitude units per second.
    pub early_diastolic_duration_rate: Option<Real>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidthMeasurement {
    /// Percentage of the spike height at which the width is measured.
    pub half_height: u32,
    pub rising: Option<PointValue>,
    pub falling: Option<PointValue>,
    pub width_points: Option<usize>,
    pub width_ms: Option<Real>,
}

/// Echo of the settings and labels a spike was detected with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeContext {
    pub file: Option<String>,
    pub detection_type: DetectionType,
    pub cell_type: String,
    pub sex: String,
    pub condition: String,
    pub dvdt_threshold: Option<Real>,
    pub mv_threshold: Real,
    pub median_filter: usize,
    pub half_width_window_ms: Real,
    pub refractory_ms: Real,
}

impl SpikeContext {
    pub(crate) fn new(config: &DetectionConfig, file: Option<&str>) -> Self {
        Self {
            file: file.map(ToOwned::to_owned),
            detection_type: config.detection_type(),
            cell_type: config.cell_type.clone(),
            sex: config.sex.clone(),
            condition: config.condition.clone(),
            dvdt_threshold: config.dvdt_threshold,
            mv_threshold: config.mv_threshold,
            median_filter: config.median_filter,
            half_width_window_ms: config.half_width_window_ms,
            refractory_ms: config.refractory_ms,
        }
    }
}

/// Everything measured for one detected spike. Optional fields are `None`
/// when they do not apply, for instance interval features of the first spike
/// in a sweep, or when the search for them failed, in which case `errors`
/// says why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeRecord {
    pub sweep: SweepIndex,
    pub sweep_spike_number: usize,
    pub spike_number: usize,

    pub threshold_point: Point,
    pub threshold_sec: Real,
    pub threshold_val: Real,
    pub threshold_val_dvdt: Real,
    pub dac_command: Option<Real>,

    pub peak_point: Point,
    pub peak_sec: Real,
    pub peak_val: Real,
    pub peak_height: Real,

    pub pre_min: Option<PointValue>,
    pub pre_linear_fit: Option<LinearFit>,
    pub pre_spike_dvdt_max: Option<DerivativeExtremum>,
    pub post_spike_dvdt_min: Option<DerivativeExtremum>,

    pub isi_points: Option<usize>,
    pub isi_ms: Option<Real>,
    pub spike_freq_hz: Option<Real>,
    pub diastolic_duration_ms: Option<Real>,
    pub cycle_length_points: Option<usize>,
    pub cycle_length_ms: Option<Real>,

    pub widths: Vec<WidthMeasurement>,
    pub errors: Vec<ErrorAnnotation>,
    #[serde(flatten)]
    pub context: SpikeContext,
}

impl SpikeRecord {
    pub fn width(&self, half_height: u32) -> Option<&WidthMeasurement> {
        self.widths.iter().find(|w| w.half_height == half_height)
    }
}
