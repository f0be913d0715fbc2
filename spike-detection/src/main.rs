use anyhow::{Context, Result};
use apdetect_common::{
    SweepFilter, init_tracer,
    metrics::{
        component_info_metric,
        failures::{self, FailureKind},
        names::FAILURES,
    },
    tracer::TracerOptions,
};
use apdetect_simulator::Simulation;
use clap::Parser;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;
use spike_detection::{
    ClipSource, ConfigOverrides, DetectionConfig, DetectionType, ErrorAnnotation, Preset, Real,
    SpikeAnalysis, SpikeRecord,
};
use std::{
    fs, io,
    net::SocketAddr,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// JSON description of the synthetic recording to analyse.
    simulation: PathBuf,

    #[clap(long, value_enum, default_value_t = Preset::SaNode)]
    preset: Preset,

    /// JSON detection configuration, used in place of the preset.
    #[clap(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Amplitude the summary clips are cut from.
    #[clap(long, value_enum, default_value_t = ClipSource::Raw)]
    clip_source: ClipSource,

    /// If set, metrics are served in the Prometheus format on this address.
    #[clap(long, env = "APDETECT_OBSERVABILITY_ADDRESS")]
    observability_address: Option<SocketAddr>,

    #[clap(long)]
    ansi: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    detection_type: DetectionType,
    spikes: &'a [SpikeRecord],
    errors: &'a [ErrorAnnotation],
    clips: usize,
    mean_clip: Option<Vec<Real>>,
}

fn load_config(args: &Cli) -> Result<DetectionConfig> {
    let config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            DetectionConfig::from_json(&json)?
        }
        None => DetectionConfig::from(args.preset),
    };
    Ok(args.overrides.apply(config))
}

fn load_simulation(path: &Path) -> Result<Simulation> {
    let json =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let simulation = Simulation::from_json(&json).inspect_err(|e| {
        warn!("Simulation rejected: {e}");
        counter!(FAILURES, &[failures::get_label(FailureKind::InvalidSimulation)]).increment(1);
    })?;
    Ok(simulation)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let _tracer = init_tracer!(TracerOptions { ansi: args.ansi })?;

    if let Some(address) = args.observability_address {
        PrometheusBuilder::new()
            .with_http_listener(address)
            .install()?;
    }
    spike_detection::metrics::describe_metrics();
    component_info_metric("spike-detection");

    let config = load_config(&args).inspect_err(|_| {
        counter!(FAILURES, &[failures::get_label(FailureKind::InvalidConfig)]).increment(1);
    })?;
    let recording = load_simulation(&args.simulation)?
        .generate()
        .inspect_err(|_| {
            counter!(FAILURES, &[failures::get_label(FailureKind::InvalidRecording)])
                .increment(1);
        })?;
    info!(
        "Analysing {} sweeps at {} points per ms",
        recording.num_sweeps(),
        recording.points_per_ms()
    );

    let mut analysis = SpikeAnalysis::new(recording)?;
    analysis.detect(&config)?;
    let clips = analysis.clips(
        config.spike_clip_width_ms,
        SweepFilter::All,
        None,
        args.clip_source,
    );

    let report = Report {
        detection_type: config.detection_type(),
        spikes: analysis.spikes(),
        errors: analysis.errors(),
        clips: clips.len(),
        mean_clip: clips.mean(),
    };
    serde_json::to_writer_pretty(io::stdout().lock(), &report)?;
    println!();
    Ok(())
}
