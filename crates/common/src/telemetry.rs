use crate::logging;
use crate::{Environment, LogLevel};
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::attribute::{SERVICE_NAME, SERVICE_VERSION};
use std::time::Duration;

const METRIC_EXPORT_INTERVAL: Duration = Duration::from_secs(15);

const SERVICE_NAMESPACE: &str = "object-detection";

/// OTLP trace and metric export for the lifetime of the process.
///
/// ```ignore
/// let _telemetry = TelemetryGuard::init(
///     "detection-gateway",
///     "http://otel-collector:4317",
///     LogLevel::Info,
///     Environment::Production,
/// )?;
/// ```
///
/// Dropping the guard flushes pending spans and detection metrics.
pub struct TelemetryGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl TelemetryGuard {
    /// Install the exporters and the global subscriber. Replaces
    /// [`crate::setup_logging`]; call one or the other.
    pub fn init(
        service_name: &str,
        endpoint: &str,
        log_level: LogLevel,
        environment: Environment,
    ) -> anyhow::Result<Self> {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let resource = service_resource(service_name, environment);

        let tracer_provider = SdkTracerProvider::builder()
            .with_resource(resource.clone())
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
            .with_batch_exporter(
                SpanExporter::builder()
                    .with_tonic()
                    .with_endpoint(endpoint)
                    .build()?,
            )
            .build();
        global::set_tracer_provider(tracer_provider.clone());

        let reader = PeriodicReader::builder(
            MetricExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()?,
        )
        .with_interval(METRIC_EXPORT_INTERVAL)
        .build();
        let meter_provider = SdkMeterProvider::builder()
            .with_resource(resource)
            .with_reader(reader)
            .build();
        global::set_meter_provider(meter_provider.clone());

        let tracer = global::tracer(service_name.to_string());
        logging::install(
            log_level,
            environment,
            tracing_opentelemetry::layer().with_tracer(tracer),
        );

        tracing::info!(endpoint, service = service_name, "OpenTelemetry export enabled");

        Ok(Self {
            tracer_provider,
            meter_provider,
        })
    }
}

fn service_resource(service_name: &str, environment: Environment) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, service_name.to_string()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.namespace", SERVICE_NAMESPACE),
            KeyValue::new("deployment.environment.name", environment.as_str()),
        ])
        .build()
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        // The subscriber may already be gone at shutdown
        if let Err(e) = self.meter_provider.shutdown() {
            eprintln!("detection metrics flush failed: {e:?}");
        }
        if let Err(e) = self.tracer_provider.shutdown() {
            eprintln!("trace flush failed: {e:?}");
        }
    }
}

/// Open an info-level span named `$name` and enter it for the current scope.
#[macro_export]
macro_rules! span {
    ($name:literal) => {
        tracing::info_span!($name).entered()
    };
}
