use apdetect_common::metrics::names::{
    FAILURES, RECORDINGS_ANALYSED, SEARCH_FAILURES, SPIKES_DETECTED,
};

pub fn describe_metrics() {
    metrics::describe_counter!(
        RECORDINGS_ANALYSED,
        metrics::Unit::Count,
        "Number of recordings analysed"
    );
    metrics::describe_counter!(
        SPIKES_DETECTED,
        metrics::Unit::Count,
        "Number of spikes detected"
    );
    metrics::describe_counter!(
        SEARCH_FAILURES,
        metrics::Unit::Count,
        "Number of failed feature searches, by category"
    );
    metrics::describe_counter!(
        FAILURES,
        metrics::Unit::Count,
        "Number of failures encountered"
    );
}
