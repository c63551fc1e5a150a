use image::RgbImage;
use inference::{
    ClassVocabulary, ColorFormat, DetectionEngine, RawDetection, RenderedFrame, ResultGroup,
};

/// Engine double that replays fixed detections.
pub struct StaticEngine {
    detections: Vec<RawDetection>,
    vocabulary: ClassVocabulary,
    groups: usize,
    failure: Option<String>,
    panic_next: bool,
}

impl StaticEngine {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self {
            detections,
            vocabulary: ClassVocabulary::coco(),
            groups: 1,
            failure: None,
            panic_next: false,
        }
    }

    pub fn with_groups(mut self, groups: usize) -> Self {
        self.groups = groups;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Panic inside the first `detect` call only.
    pub fn panicking_once(mut self) -> Self {
        self.panic_next = true;
        self
    }
}

pub fn detection(class_index: u32, confidence: f32) -> RawDetection {
    RawDetection {
        class_index,
        confidence,
        bbox: [1.0, 1.0, 6.0, 6.0],
    }
}

impl DetectionEngine for StaticEngine {
    fn detect(
        &mut self,
        _image: &RgbImage,
        confidence_threshold: f32,
    ) -> anyhow::Result<Vec<ResultGroup>> {
        if self.panic_next {
            self.panic_next = false;
            panic!("engine crashed mid-inference");
        }
        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }
        let kept: Vec<RawDetection> = self
            .detections
            .iter()
            .filter(|d| d.confidence >= confidence_threshold)
            .copied()
            .collect();
        Ok((0..self.groups).map(|_| ResultGroup::new(kept.clone())).collect())
    }

    fn vocabulary(&self) -> &ClassVocabulary {
        &self.vocabulary
    }

    fn annotate(&self, image: &RgbImage, _group: &ResultGroup) -> anyhow::Result<RenderedFrame> {
        let mut frame = RenderedFrame::from_rgb(image.clone());
        for px in frame.pixels.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        frame.format = ColorFormat::Bgr;
        Ok(frame)
    }
}
