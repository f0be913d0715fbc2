use crate::{Real, error::ConfigError};
use anyhow::{Error, anyhow};
use clap::{Args, ValueEnum};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

/// Named starting points for [DetectionConfig], each overriding a few fields
/// of the default.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, ValueEnum,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Preset {
    /// Sino-atrial node cells, the default.
    #[default]
    SaNode,
    Ventricular,
    Neuron,
    /// Calcium imaging intensity traces.
    Calcium,
}

/// Which strategy found the spike onsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DetectionType {
    Dvdt,
    Mv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DetectionConfig {
    /// Derivative threshold in units per ms. `None` selects amplitude-only detection.
    pub dvdt_threshold: Option<Real>,
    pub mv_threshold: Real,
    /// Width of the median filter in samples, `0` disables it.
    pub median_filter: usize,
    /// Window length of the Savitzky-Golay filter in samples, `0` disables it.
    pub savitzky_golay_points: usize,
    pub savitzky_golay_order: usize,
    /// Percentages of the spike height at which widths are measured.
    pub half_heights: Vec<u32>,
    pub mdp_ms: Real,
    pub refractory_ms: Real,
    pub peak_window_ms: Real,
    pub dvdt_pre_window_ms: Real,
    pub avg_window_ms: Real,
    pub dvdt_percent_of_max: Real,
    pub half_width_window_ms: Real,
    pub do_backup_spike_vm: bool,
    pub spike_clip_width_ms: Real,
    pub only_peaks_above_mv: Option<Real>,
    pub cell_type: String,
    pub sex: String,
    pub condition: String,
    pub verbose: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            dvdt_threshold: Some(100.0),
            mv_threshold: -20.0,
            median_filter: 0,
            savitzky_golay_points: 5,
            savitzky_golay_order: 2,
            half_heights: vec![10, 20, 50, 80, 90],
            mdp_ms: 250.0,
            refractory_ms: 170.0,
            peak_window_ms: 100.0,
            dvdt_pre_window_ms: 10.0,
            avg_window_ms: 5.0,
            dvdt_percent_of_max: 0.1,
            half_width_window_ms: 200.0,
            do_backup_spike_vm: true,
            spike_clip_width_ms: 500.0,
            only_peaks_above_mv: Some(-20.0),
            cell_type: String::new(),
            sex: String::new(),
            condition: String::new(),
            verbose: false,
        }
    }
}

impl From<Preset> for DetectionConfig {
    fn from(preset: Preset) -> Self {
        let default = Self::default();
        match preset {
            Preset::SaNode => default,
            Preset::Ventricular => Self {
                refractory_ms: 200.0,
                half_width_window_ms: 300.0,
                spike_clip_width_ms: 200.0,
                ..default
            },
            Preset::Neuron => Self {
                refractory_ms: 7.0,
                peak_window_ms: 5.0,
                half_width_window_ms: 4.0,
                spike_clip_width_ms: 20.0,
                ..default
            },
            Preset::Calcium => Self {
                dvdt_threshold: Some(0.01),
                mv_threshold: 0.5,
                refractory_ms: 200.0,
                half_width_window_ms: 200.0,
                ..default
            },
        }
    }
}

fn non_negative(field: &'static str, value: Real) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("expected a finite non-negative duration, got {value}"),
        ))
    }
}

fn positive(field: &'static str, value: Real) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("expected a finite positive duration, got {value}"),
        ))
    }
}

fn finite(field: &'static str, value: Real) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} is not finite")))
    }
}

impl DetectionConfig {
    /// Reads a configuration from JSON. Keys missing from the document take
    /// their default value, unknown keys are rejected.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn detection_type(&self) -> DetectionType {
        match self.dvdt_threshold {
            Some(_) => DetectionType::Dvdt,
            None => DetectionType::Mv,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threshold) = self.dvdt_threshold {
            finite("dvdt-threshold", threshold)?;
        }
        finite("mv-threshold", self.mv_threshold)?;
        if let Some(floor) = self.only_peaks_above_mv {
            finite("only-peaks-above-mv", floor)?;
        }

        non_negative("mdp-ms", self.mdp_ms)?;
        non_negative("refractory-ms", self.refractory_ms)?;
        non_negative("dvdt-pre-window-ms", self.dvdt_pre_window_ms)?;
        non_negative("avg-window-ms", self.avg_window_ms)?;
        positive("peak-window-ms", self.peak_window_ms)?;
        positive("half-width-window-ms", self.half_width_window_ms)?;
        positive("spike-clip-width-ms", self.spike_clip_width_ms)?;

        if !(0.0..=1.0).contains(&self.dvdt_percent_of_max) {
            return Err(ConfigError::invalid(
                "dvdt-percent-of-max",
                format!("expected a fraction in [0, 1], got {}", self.dvdt_percent_of_max),
            ));
        }

        if self.half_heights.is_empty() {
            return Err(ConfigError::invalid("half-heights", "at least one is required"));
        }
        if let Some(height) = self.half_heights.iter().find(|h| !(1..=99).contains(*h)) {
            return Err(ConfigError::invalid(
                "half-heights",
                format!("{height} is not a percentage between 1 and 99"),
            ));
        }
        if !self.half_heights.iter().all_unique() {
            return Err(ConfigError::invalid("half-heights", "duplicate entries"));
        }

        if self.savitzky_golay_points > 0 {
            if self.savitzky_golay_points % 2 == 0 {
                return Err(ConfigError::invalid(
                    "savitzky-golay-points",
                    format!("window length {} must be odd", self.savitzky_golay_points),
                ));
            }
            if self.savitzky_golay_order >= self.savitzky_golay_points {
                return Err(ConfigError::invalid(
                    "savitzky-golay-order",
                    format!(
                        "order {} must be less than the window length {}",
                        self.savitzky_golay_order, self.savitzky_golay_points
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct HalfHeightsWrapper(pub(crate) Vec<u32>);

impl FromStr for HalfHeightsWrapper {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let heights = s
            .split(',')
            .map(|h| u32::from_str(h.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        if heights.is_empty() {
            Err(anyhow!(
                "Expected a comma separated list of percentages such as '10,50,90', got '{s}'"
            ))
        } else {
            Ok(HalfHeightsWrapper(heights))
        }
    }
}

/// Command line overrides applied on top of a preset or configuration file.
#[derive(Default, Debug, Clone, Args)]
pub struct ConfigOverrides {
    /// Derivative threshold in units per ms.
    #[clap(long, conflicts_with = "amplitude_only")]
    pub dvdt_threshold: Option<Real>,

    /// Detect spikes from the amplitude alone.
    #[clap(long)]
    pub amplitude_only: bool,

    #[clap(long)]
    pub mv_threshold: Option<Real>,

    #[clap(long)]
    pub refractory_ms: Option<Real>,

    #[clap(long)]
    pub mdp_ms: Option<Real>,

    #[clap(long)]
    pub median_filter: Option<usize>,

    #[clap(long)]
    pub only_peaks_above_mv: Option<Real>,

    /// Comma separated percentages of spike height, for instance '10,50,90'.
    #[clap(long)]
    pub half_heights: Option<HalfHeightsWrapper>,

    #[clap(long)]
    pub spike_clip_width_ms: Option<Real>,
}

impl ConfigOverrides {
    pub fn apply(&self, mut config: DetectionConfig) -> DetectionConfig {
        if self.amplitude_only {
            config.dvdt_threshold = None;
        } else if let Some(threshold) = self.dvdt_threshold {
            config.dvdt_threshold = Some(threshold);
        }
        if let Some(threshold) = self.mv_threshold {
            config.mv_threshold = threshold;
        }
        if let Some(refractory_ms) = self.refractory_ms {
            config.refractory_ms = refractory_ms;
        }
        if let Some(mdp_ms) = self.mdp_ms {
            config.mdp_ms = mdp_ms;
        }
        if let Some(median_filter) = self.median_filter {
            config.median_filter = median_filter;
        }
        if let Some(floor) = self.only_peaks_above_mv {
            config.only_peaks_above_mv = Some(floor);
        }
        if let Some(HalfHeightsWrapper(heights)) = &self.half_heights {
            config.half_heights = heights.clone();
        }
        if let Some(width) = self.spike_clip_width_ms {
            config.spike_clip_width_ms = width;
        }
        config
    }
}
