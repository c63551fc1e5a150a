use crate::vocabulary::ClassVocabulary;
use image::RgbImage;

/// One detection as reported by the engine, in original-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub class_index: u32,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]`
    pub bbox: [f32; 4],
}

/// Detections for a single input image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultGroup {
    pub detections: Vec<RawDetection>,
}

impl ResultGroup {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self { detections }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    Rgb,
    Bgr,
}

/// Annotated pixels, packed HWC with three channels in `format` order.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub width: u32,
    pub height: u32,
    pub format: ColorFormat,
    pub pixels: Vec<u8>,
}

impl RenderedFrame {
    pub fn from_rgb(image: RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            format: ColorFormat::Rgb,
            pixels: image.into_raw(),
        }
    }

    /// Consume the frame and return it as RGB, swapping channels if needed.
    pub fn into_rgb(self) -> anyhow::Result<RgbImage> {
        let Self {
            width,
            height,
            format,
            mut pixels,
        } = self;

        if format == ColorFormat::Bgr {
            for px in pixels.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
        }

        RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            anyhow::anyhow!("Rendered frame buffer does not match {}x{}", width, height)
        })
    }
}

/// A loaded detection model.
///
/// `detect` takes `&mut self`: sessions are not shared mutably, so callers
/// serialize access (the gateway keeps the engine behind a `Mutex`).
pub trait DetectionEngine: Send {
    /// Run the model over `image`, keeping detections at or above
    /// `confidence_threshold`. One group per image in the batch.
    fn detect(
        &mut self,
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> anyhow::Result<Vec<ResultGroup>>;

    fn vocabulary(&self) -> &ClassVocabulary;

    /// Draw boxes and labels for `group` onto a copy of `image`.
    fn annotate(&self, image: &RgbImage, group: &ResultGroup) -> anyhow::Result<RenderedFrame>;
}
