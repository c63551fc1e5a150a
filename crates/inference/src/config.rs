use crate::processing::post::{DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_DETECTIONS};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    Cuda,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Square model input side in pixels
    pub input_size: u32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub intra_threads: usize,
    pub execution_provider: ExecutionProvider,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            intra_threads: 4,
            execution_provider: ExecutionProvider::Cpu,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.input_size == 0 || self.input_size % 32 != 0 {
            anyhow::bail!(
                "inference.input_size must be a positive multiple of 32, got {}",
                self.input_size
            );
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            anyhow::bail!(
                "inference.iou_threshold must be within [0, 1], got {}",
                self.iou_threshold
            );
        }
        if self.max_detections == 0 {
            anyhow::bail!("inference.max_detections must be at least 1");
        }
        if self.intra_threads == 0 {
            anyhow::bail!("inference.intra_threads must be at least 1");
        }
        Ok(())
    }
}
