use ndarray::{Array, IxDyn};

#[cfg(feature = "ort-backend")]
pub mod ort;

/// Raw tensor-in, tensor-out model runtime.
pub trait InferenceBackend: Send {
    /// Run inference on an NCHW `[1, 3, H, W]` input
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;
}

pub struct InferenceOutput {
    /// `[1, 4 + num_classes, num_anchors]`, cxcywh in input pixels
    pub predictions: ndarray::ArrayD<f32>,
}
