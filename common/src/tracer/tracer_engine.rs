use tracing::{debug, subscriber::SetGlobalDefaultError};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

#[derive(Default, Clone, Debug)]
pub struct TracerOptions {
    /// Colour the log output with ANSI escape codes.
    pub ansi: bool,
}

/// This object initialises the log subscriber, given a TracerOptions struct.
/// Logs are written to stderr so that stdout remains free for results.
pub struct TracerEngine {
    component: String,
}

impl TracerEngine {
    /// Initialises the stderr tracer for the crate
    /// #Arguments
    /// * `options` - The caller-specified instance of TracerOptions.
    /// * `component` - The name of the binary initialising the tracer.
    /// #Returns
    /// An instance of TracerEngine
    pub fn new(options: TracerOptions, component: &str) -> Result<Self, SetGlobalDefaultError> {
        let stderr_tracer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(options.ansi);

        // This filter is applied to the stderr tracer
        let log_filter = EnvFilter::from_default_env();

        let subscriber =
            tracing_subscriber::Registry::default().with(stderr_tracer.with_filter(log_filter));

        tracing::subscriber::set_global_default(subscriber)?;
        debug!("Tracer initialised for {component}");

        Ok(Self {
            component: component.to_owned(),
        })
    }

    pub fn component(&self) -> &str {
        &self.component
    }
}
