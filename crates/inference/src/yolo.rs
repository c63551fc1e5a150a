use crate::annotate::Annotator;
use crate::backend::InferenceBackend;
use crate::config::EngineConfig;
use crate::engine::{DetectionEngine, RenderedFrame, ResultGroup};
use crate::processing::post::{PostProcessor, TransformParams};
use crate::vocabulary::ClassVocabulary;
use common::span;
use image::RgbImage;
use ndarray::{Array, IxDyn};
use preprocess::{CpuPreProcessor, Preprocess};

/// Letterbox, run the backend, decode and NMS.
pub struct YoloEngine<B> {
    backend: B,
    preprocessor: CpuPreProcessor,
    vocabulary: ClassVocabulary,
    iou_threshold: f32,
    max_detections: usize,
}

impl<B: InferenceBackend> YoloEngine<B> {
    pub fn new(backend: B, vocabulary: ClassVocabulary, config: &EngineConfig) -> Self {
        Self {
            backend,
            preprocessor: CpuPreProcessor::new((config.input_size, config.input_size)),
            vocabulary,
            iou_threshold: config.iou_threshold,
            max_detections: config.max_detections,
        }
    }
}

/// Number of classes the detection head predicts, from one blank warm-up pass.
pub fn output_classes<B: InferenceBackend>(
    backend: &mut B,
    input_size: u32,
) -> anyhow::Result<usize> {
    let side = input_size as usize;
    let blank = Array::<f32, _>::zeros(IxDyn(&[1, 3, side, side]));
    let output = backend.infer(&blank)?;

    match output.predictions.shape() {
        [1, channels, _] if *channels > 4 => Ok(channels - 4),
        shape => anyhow::bail!(
            "Expected YOLO output [1, 4 + classes, anchors], got {:?}",
            shape
        ),
    }
}

/// Pick the class names for a head predicting `classes` classes.
///
/// Embedded names must cover every class. Without them the COCO names are
/// used, which only fit an 80-class head.
pub fn resolve_vocabulary(
    names: Option<ClassVocabulary>,
    classes: usize,
) -> anyhow::Result<ClassVocabulary> {
    match names {
        Some(names) if names.len() == classes => Ok(names),
        Some(names) => anyhow::bail!(
            "Model metadata names {} classes but the model predicts {}",
            names.len(),
            classes
        ),
        None if classes == COCO_CLASS_COUNT => {
            tracing::warn!("Model has no usable class names, falling back to COCO");
            Ok(ClassVocabulary::coco())
        }
        None => anyhow::bail!(
            "Model predicts {} classes but has no class names; the COCO fallback covers {}",
            classes,
            COCO_CLASS_COUNT
        ),
    }
}

const COCO_CLASS_COUNT: usize = 80;

impl<B: InferenceBackend> DetectionEngine for YoloEngine<B> {
    fn detect(
        &mut self,
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> anyhow::Result<Vec<ResultGroup>> {
        let _s = span!("detect");

        let (width, height) = image.dimensions();
        let input = self.preprocessor.preprocess(image.as_raw(), width, height)?;

        let output = {
            let _s = span!("infer");
            self.backend.infer(&input.data)?
        };

        let post_processor = PostProcessor {
            confidence_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        };
        let transform = TransformParams {
            orig_width: width,
            orig_height: height,
            scale: input.scale,
            offset_x: input.offset_x,
            offset_y: input.offset_y,
        };

        let detections = post_processor.parse_detections(&output.predictions.view(), &transform)?;

        tracing::debug!(
            width,
            height,
            detections = detections.len(),
            "Inference complete"
        );

        Ok(vec![ResultGroup::new(detections)])
    }

    fn vocabulary(&self) -> &ClassVocabulary {
        &self.vocabulary
    }

    fn annotate(&self, image: &RgbImage, group: &ResultGroup) -> anyhow::Result<RenderedFrame> {
        let _s = span!("annotate");
        Ok(Annotator::new(&self.vocabulary).render(image, group))
    }
}
