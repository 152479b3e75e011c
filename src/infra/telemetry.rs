use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "headwind_response_cache_hit_total",
            Unit::Count,
            "Total number of response-cache hits."
        );
        describe_counter!(
            "headwind_response_cache_miss_total",
            Unit::Count,
            "Total number of response-cache misses."
        );
        describe_counter!(
            "headwind_response_cache_bypass_total",
            Unit::Count,
            "Total number of queries that bypassed the response cache (mutations or cache disabled)."
        );
        describe_counter!(
            "headwind_response_cache_unstorable_total",
            Unit::Count,
            "Total number of responses not cached because they do not survive a JSON round trip."
        );
        describe_counter!(
            "headwind_object_cache_evict_total",
            Unit::Count,
            "Total number of object-cache evictions due to capacity."
        );
        describe_counter!(
            "headwind_cdn_purge_total",
            Unit::Count,
            "Total number of CDN purges issued, labelled by outcome."
        );
        describe_counter!(
            "headwind_cdn_purge_debounced_total",
            Unit::Count,
            "Total number of CDN purge triggers collapsed into an earlier purge."
        );
        describe_histogram!(
            "headwind_revalidation_delivery_ms",
            Unit::Milliseconds,
            "Revalidation webhook delivery latency in milliseconds."
        );
        describe_gauge!(
            "headwind_event_log_len",
            Unit::Count,
            "Current number of pipeline events held in the event log."
        );
        describe_counter!(
            "headwind_event_dropped_total",
            Unit::Count,
            "Total number of pipeline events dropped due to log overflow."
        );
    });
}
