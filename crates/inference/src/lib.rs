pub mod annotate;
pub mod backend;
pub mod config;
pub mod engine;
pub mod processing;
pub mod vocabulary;
pub mod yolo;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use config::{EngineConfig, ExecutionProvider};
pub use engine::{ColorFormat, DetectionEngine, RawDetection, RenderedFrame, ResultGroup};
pub use vocabulary::ClassVocabulary;
pub use yolo::YoloEngine;

#[cfg(feature = "ort-backend")]
pub use backend::ort::OrtBackend;

/// Load `<models_dir>/<model_identifier>` as a YOLO engine on ONNX Runtime.
///
/// Class names come from the model metadata, falling back to COCO for an
/// 80-class head. Any other mismatch fails the load.
#[cfg(feature = "ort-backend")]
pub fn load_engine(
    models_dir: &std::path::Path,
    model_identifier: &str,
    config: &EngineConfig,
) -> anyhow::Result<YoloEngine<OrtBackend>> {
    config.validate()?;

    let path = models_dir.join(model_identifier);
    let mut backend = OrtBackend::load_model(&path, config)?;

    let classes = yolo::output_classes(&mut backend, config.input_size)?;
    let vocabulary = yolo::resolve_vocabulary(backend.class_names(), classes)
        .map_err(|e| e.context(format!("Unusable class names in {}", model_identifier)))?;

    tracing::info!(
        model = model_identifier,
        classes = vocabulary.len(),
        input_size = config.input_size,
        "Detection engine ready"
    );

    Ok(YoloEngine::new(backend, vocabulary, config))
}
