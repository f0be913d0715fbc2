use crate::{Real, spike::SpikeRecord};
use apdetect_common::SweepIndex;
use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The feature search which failed for a spike.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr, Serialize,
)]
pub enum ErrorCategory {
    #[strum(serialize = "dvdtPercent")]
    #[serde(rename = "dvdtPercent")]
    DvdtPercent,
    #[strum(serialize = "preMin")]
    #[serde(rename = "preMin")]
    PreMin,
    #[strum(serialize = "fitEDD")]
    #[serde(rename = "fitEDD")]
    FitEdd,
    #[strum(serialize = "fitEDD2")]
    #[serde(rename = "fitEDD2")]
    FitEdd2,
    #[strum(serialize = "preSpikeDvDt")]
    #[serde(rename = "preSpikeDvDt")]
    PreSpikeDvdt,
    #[strum(serialize = "postSpikeDvDt")]
    #[serde(rename = "postSpikeDvDt")]
    PostSpikeDvdt,
    #[strum(serialize = "spikeWidth")]
    #[serde(rename = "spikeWidth")]
    SpikeWidth,
}

/// A failed search, before it is attributed to a particular spike.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SearchFailure {
    pub(crate) category: ErrorCategory,
    pub(crate) details: String,
}

impl SearchFailure {
    pub(crate) fn new(category: ErrorCategory, details: impl Into<String>) -> Self {
        Self {
            category,
            details: details.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorAnnotation {
    pub sweep: SweepIndex,
    /// Index of the spike within its sweep.
    pub spike: usize,
    /// Time of the spike onset in seconds, to four decimal places.
    pub seconds: Real,
    pub category: ErrorCategory,
    pub details: String,
}

impl ErrorAnnotation {
    pub(crate) fn new(
        sweep: SweepIndex,
        spike: usize,
        seconds: Real,
        failure: SearchFailure,
    ) -> Self {
        Self {
            sweep,
            spike,
            seconds: crate::signals::round4(seconds),
            category: failure.category,
            details: failure.details,
        }
    }
}

/// Flattens the annotations of every spike, in spike order.
pub fn error_report(spikes: &[SpikeRecord]) -> Vec<ErrorAnnotation> {
    spikes
        .iter()
        .flat_map(|spike| spike.errors.iter().cloned())
        .collect()
}
