use crate::config::{Environment, LogLevel};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::Layered, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Subscriber stack below the formatting layer.
pub(crate) type FilteredRegistry = Layered<EnvFilter, Registry>;

/// Install logging without an exporter.
///
/// `RUST_LOG` takes precedence over `log_level`. Production writes JSON lines,
/// development writes pretty ANSI output. Spans still reach OpenTelemetry if a
/// global tracer provider is installed later.
pub fn setup_logging(log_level: LogLevel, environment: Environment) {
    install(log_level, environment, tracing_opentelemetry::layer());
}

/// Filter, then `otel`, then the environment's formatter.
pub(crate) fn install<L>(log_level: LogLevel, environment: Environment, otel: L)
where
    L: Layer<FilteredRegistry> + Send + Sync + 'static,
{
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    let registry = tracing_subscriber::registry().with(filter).with(otel);

    match environment {
        Environment::Production => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
        Environment::Development => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
            .init(),
    }
}
