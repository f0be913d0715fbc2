use metrics::{describe_gauge, gauge};

pub fn component_info_metric(name: &'static str) {
    static NAME: &str = names::COMPONENT_INFO;

    describe_gauge!(NAME, "Basic information about the component");

    let version = env!("CARGO_PKG_VERSION");
    gauge!(NAME, "component" => name, "version" => version).set(1);
}

pub mod names {
    use const_format::concatcp;

    pub const METRIC_NAME_PREFIX: &str = "apdetect_";

    pub const COMPONENT_INFO: &str = concatcp!(METRIC_NAME_PREFIX, "component_info");
    pub const FAILURES: &str = concatcp!(METRIC_NAME_PREFIX, "failures");
    pub const RECORDINGS_ANALYSED: &str = concatcp!(METRIC_NAME_PREFIX, "recordings_analysed");
    pub const SPIKES_DETECTED: &str = concatcp!(METRIC_NAME_PREFIX, "spikes_detected");
    pub const SEARCH_FAILURES: &str = concatcp!(METRIC_NAME_PREFIX, "search_failures");
}

pub mod search_failures {
    // Label building function
    pub fn get_label(error_category: &'static str) -> (&'static str, &'static str) {
        ("error_category", error_category)
    }
}

pub mod failures {
    #[derive(Debug, Clone, Eq, Hash, PartialEq)]
    pub enum FailureKind {
        InvalidConfig,
        InvalidRecording,
        InvalidSimulation,
    }

    // Label building function
    pub fn get_label(failure_kind: FailureKind) -> (&'static str, &'static str) {
        (
            "failure_kind",
            match failure_kind {
                FailureKind::InvalidConfig => "invalid_config",
                FailureKind::InvalidRecording => "invalid_recording",
                FailureKind::InvalidSimulation => "invalid_simulation",
            },
        )
    }
}
