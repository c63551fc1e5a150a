use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};

/// Detection pipeline instruments. No-ops until a meter provider is installed.
#[derive(Clone)]
pub struct PipelineMetrics {
    duration: Histogram<f64>,
    requests: Counter<u64>,
    detections: Counter<u64>,
}

impl PipelineMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];

        Self {
            duration: meter
                .f64_histogram("detection_duration_seconds")
                .with_description("Time to serve a detection request (decode to response)")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            requests: meter
                .u64_counter("detection_requests_total")
                .with_description("Detection requests by outcome")
                .build(),
            detections: meter
                .u64_counter("detections_total")
                .with_description("Total detections returned")
                .build(),
        }
    }

    pub fn record_success(&self, seconds: f64, detections: usize) {
        self.duration.record(seconds, &[]);
        self.requests
            .add(1, &[KeyValue::new("outcome", "success")]);
        self.detections.add(detections as u64, &[]);
    }

    pub fn record_failure(&self, kind: &'static str) {
        self.requests.add(1, &[KeyValue::new("outcome", kind)]);
    }
}
