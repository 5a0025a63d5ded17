use std::sync::Once;

use metrics::{Unit, describe_counter};
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
        .with_default_directive(logging.level().into())
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
            "vitrine_cache_hit_total",
            Unit::Count,
            "Total number of cache hits."
        );
        describe_counter!(
            "vitrine_cache_miss_total",
            Unit::Count,
            "Total number of cache misses."
        );
        describe_counter!(
            "vitrine_cache_evict_total",
            Unit::Count,
            "Total number of cache evictions due to capacity."
        );
        describe_counter!(
            "vitrine_cache_degraded_total",
            Unit::Count,
            "Total number of reads served by direct computation because the cache backend was unavailable."
        );
        describe_counter!(
            "vitrine_cache_invalidated_total",
            Unit::Count,
            "Total number of cache entries removed by prefix invalidation."
        );
        describe_counter!(
            "vitrine_rate_limit_allowed_total",
            Unit::Count,
            "Total number of requests admitted by the rate limiter."
        );
        describe_counter!(
            "vitrine_rate_limit_denied_total",
            Unit::Count,
            "Total number of requests denied by the rate limiter."
        );
        describe_counter!(
            "vitrine_rate_limit_fail_open_total",
            Unit::Count,
            "Total number of requests admitted because the rate-limit backend was unavailable."
        );
        describe_counter!(
            "vitrine_view_increment_failed_total",
            Unit::Count,
            "Total number of view-count increments that failed and were dropped."
        );
        describe_counter!(
            "vitrine_derivative_generated_total",
            Unit::Count,
            "Total number of image derivatives generated."
        );
        describe_counter!(
            "vitrine_derivative_failed_total",
            Unit::Count,
            "Total number of image derivative generations that failed."
        );
    });
}
