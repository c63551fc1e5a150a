use crate::codec::{decode_image, frame_to_jpeg, is_image_content_type};
use crate::errors::PipelineError;
use crate::metrics::PipelineMetrics;
use crate::state::{AppState, EngineHandle};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use catalog::Language;
use inference::RawDetection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// One uploaded image plus the raw form parameters that came with it.
#[derive(Debug, Clone, Default)]
pub struct DetectionRequest {
    pub image: Vec<u8>,
    pub content_type: Option<String>,
    /// Unparsed `confidence` field; `None` uses the configured default
    pub confidence: Option<String>,
    /// Unparsed `language` code; `None` uses the source language
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    #[serde(rename = "label")]
    pub label_translated: String,
    #[serde(rename = "label_en")]
    pub label_original: String,
    pub confidence: f32,
    #[serde(rename = "bbox")]
    pub bounding_box: [f32; 4],
    #[serde(rename = "class_id")]
    pub class_index: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectionResponse {
    pub success: bool,
    pub detections: Vec<Detection>,
    /// Base64 JPEG
    pub annotated_image: String,
    pub model_used: String,
    pub translate_file: String,
    pub language: String,
    pub confidence_threshold: f32,
    pub total_detections: usize,
    pub timestamp: String,
}

/// What the blocking half of the pipeline hands back.
struct EngineRun {
    detections: Vec<(RawDetection, String)>,
    jpeg: Vec<u8>,
}

pub struct RequestPipeline {
    state: Arc<AppState>,
    metrics: PipelineMetrics,
}

impl RequestPipeline {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            metrics: PipelineMetrics::new("gateway"),
        }
    }

    pub async fn run(&self, request: DetectionRequest) -> Result<DetectionResponse, PipelineError> {
        let started = Instant::now();
        let span = tracing::info_span!("detection_request", bytes = request.image.len());

        let result = self.execute(request).instrument(span).await;

        match &result {
            Ok(response) => self
                .metrics
                .record_success(started.elapsed().as_secs_f64(), response.total_detections),
            Err(e) => self.metrics.record_failure(e.kind()),
        }

        result
    }

    async fn execute(&self, request: DetectionRequest) -> Result<DetectionResponse, PipelineError> {
        let ready = self.state.ready().ok_or(PipelineError::EngineUnavailable)?;

        let languages = self.state.languages();
        let requested = request
            .language
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .unwrap_or(languages.code(Language::Source));
        let language = languages
            .parse(requested)
            .ok_or_else(|| PipelineError::InvalidLanguage {
                requested: requested.to_string(),
                supported: languages.supported().join(", "),
            })?;

        let threshold =
            parse_threshold(request.confidence.as_deref(), self.state.default_confidence())?;

        if !is_image_content_type(request.content_type.as_deref()) {
            return Err(PipelineError::InvalidImage(format!(
                "content type '{}' is not an image",
                request.content_type.as_deref().unwrap_or_default()
            )));
        }

        let engine = Arc::clone(&ready.engine);
        let image = request.image;
        let span = tracing::Span::current();
        let run = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            run_engine(&engine, &image, threshold)
        })
        .await
        .map_err(|e| {
            PipelineError::InferenceError(anyhow::anyhow!("inference task failed: {e}"))
        })??;

        let mut detections: Vec<Detection> = run
            .detections
            .into_iter()
            .map(|(raw, name)| Detection {
                label_translated: ready.translations.translate(&name, language).to_string(),
                label_original: name,
                confidence: raw.confidence,
                bounding_box: raw.bbox,
                class_index: raw.class_index,
            })
            .collect();

        // Stable: equal confidences keep engine order
        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        tracing::info!(
            detections = detections.len(),
            language = languages.code(language),
            threshold,
            "Detection request served"
        );

        Ok(DetectionResponse {
            success: true,
            total_detections: detections.len(),
            detections,
            annotated_image: STANDARD.encode(&run.jpeg),
            model_used: ready.config.model_identifier.clone(),
            translate_file: ready.config.translation_table_identifier.clone(),
            language: languages.code(language).to_string(),
            confidence_threshold: threshold,
            timestamp: chrono::Local::now().to_rfc3339(),
        })
    }
}

/// Decode, detect, label, annotate and encode. Runs off the async executor.
fn run_engine(
    handle: &EngineHandle,
    bytes: &[u8],
    threshold: f32,
) -> Result<EngineRun, PipelineError> {
    let image = {
        let _s = common::span!("decode");
        decode_image(bytes).map_err(PipelineError::InvalidImage)?
    };

    let mut engine = handle.lock();
    let groups = engine
        .detect(&image, threshold)
        .map_err(PipelineError::InferenceError)?;

    let Some(first) = groups.first() else {
        return Err(PipelineError::InferenceError(anyhow::anyhow!(
            "engine returned no result groups"
        )));
    };
    if groups.len() > 1 {
        tracing::warn!(
            groups = groups.len(),
            "Engine returned more than one result group, annotating the first"
        );
    }

    let vocabulary = engine.vocabulary();
    let mut detections = Vec::new();
    for raw in groups.iter().flat_map(|group| &group.detections) {
        let name = vocabulary.name(raw.class_index).ok_or_else(|| {
            PipelineError::InferenceError(anyhow::anyhow!(
                "class index {} outside the model vocabulary of {} classes",
                raw.class_index,
                vocabulary.len()
            ))
        })?;
        detections.push((*raw, name.to_string()));
    }

    let frame = engine
        .annotate(&image, first)
        .map_err(PipelineError::InferenceError)?;
    drop(engine);

    let jpeg = {
        let _s = common::span!("encode");
        frame_to_jpeg(frame).map_err(|e| PipelineError::Encode(format!("{e:#}")))?
    };

    Ok(EngineRun { detections, jpeg })
}

/// Missing or blank means the configured default.
pub fn parse_threshold(raw: Option<&str>, default: f32) -> Result<f32, PipelineError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(default),
        Some(raw) => raw,
    };

    match raw.parse::<f32>() {
        Ok(value) if value.is_finite() && (0.0..=1.0).contains(&value) => Ok(value),
        _ => Err(PipelineError::InvalidThreshold(raw.to_string())),
    }
}
