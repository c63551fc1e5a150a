use crate::engine::RawDetection;
use ndarray::ArrayViewD;

pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_DETECTIONS: usize = 300;

pub struct TransformParams {
    pub orig_width: u32,
    pub orig_height: u32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
        }
    }

    /// Decode a YOLO head output into detections in original-image pixels.
    ///
    /// Expects `[1, 4 + num_classes, num_anchors]` (Ultralytics export layout).
    #[tracing::instrument(skip(self, output, transform))]
    pub fn parse_detections(
        &self,
        output: &ArrayViewD<f32>,
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<RawDetection>> {
        let shape = output.shape();
        if shape.len() != 3 || shape[0] != 1 {
            anyhow::bail!("Unexpected YOLO output shape {:?}", shape);
        }

        let (channels, num_anchors) = (shape[1], shape[2]);

        if channels <= 4 {
            anyhow::bail!("YOLO output has no class channels: {:?}", shape);
        }

        let at = |channel: usize, anchor: usize| output[[0, channel, anchor]];

        let mut candidates = Vec::new();

        for i in 0..num_anchors {
            // Argmax over class scores (already sigmoid-activated in the export)
            let mut max_score = f32::NEG_INFINITY;
            let mut class_idx = 0usize;
            for c in 4..channels {
                let score = at(c, i);
                if score > max_score {
                    max_score = score;
                    class_idx = c - 4;
                }
            }

            if max_score < self.confidence_threshold {
                continue;
            }

            let (x1, y1, x2, y2) = cxcywh_to_xyxy(at(0, i), at(1, i), at(2, i), at(3, i));

            // Undo letterbox and clamp to the original image
            let unletterbox = |v: f32, offset: f32, limit: u32| {
                ((v - offset) / transform.scale).max(0.0).min(limit as f32)
            };

            candidates.push(RawDetection {
                class_index: class_idx as u32,
                confidence: max_score,
                bbox: [
                    unletterbox(x1, transform.offset_x, transform.orig_width),
                    unletterbox(y1, transform.offset_y, transform.orig_height),
                    unletterbox(x2, transform.offset_x, transform.orig_width),
                    unletterbox(y2, transform.offset_y, transform.orig_height),
                ],
            });
        }

        let kept = non_max_suppression(candidates, self.iou_threshold, self.max_detections);

        tracing::trace!(kept = kept.len(), "Decoded detections");
        Ok(kept)
    }
}

/// Class-aware greedy NMS. Output is ordered by descending confidence.
pub fn non_max_suppression(
    mut candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawDetection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_index == candidate.class_index && iou(&k.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// Intersection over union of two xyxy boxes
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;

    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    /// Helper to create a default PostProcessor for tests
    fn test_postprocessor() -> PostProcessor {
        PostProcessor::new(0.5)
    }

    /// Helper to create TransformParams for a 640x640 model input
    fn test_transform(
        orig_width: u32,
        orig_height: u32,
        scale: f32,
        offset_x: f32,
        offset_y: f32,
    ) -> TransformParams {
        TransformParams {
            orig_width,
            orig_height,
            scale,
            offset_x,
            offset_y,
        }
    }

    /// Helper to create YOLO head output `[1, 4 + num_classes, n]`
    /// from per-anchor boxes (cxcywh in input pixels) and (class, score)
    fn create_yolo_test_data(
        boxes_cxcywh: Vec<[f32; 4]>,
        class_scores: Vec<(usize, f32)>,
        num_classes: usize,
    ) -> Array<f32, IxDyn> {
        let n = boxes_cxcywh.len();
        let channels = 4 + num_classes;
        let mut output = Array::zeros(IxDyn(&[1, channels, n]));

        for (i, (bbox, (class_idx, score))) in boxes_cxcywh.iter().zip(&class_scores).enumerate() {
            for (c, v) in bbox.iter().enumerate() {
                output[[0, c, i]] = *v;
            }
            output[[0, 4 + class_idx, i]] = *score;
        }

        output
    }

    /// Test cxcywh to xyxy conversion
    #[test]
    fn test_cxcywh_to_xyxy() {
        let (x1, y1, x2, y2) = cxcywh_to_xyxy(320.0, 320.0, 100.0, 50.0);
        assert_eq!((x1, y1, x2, y2), (270.0, 295.0, 370.0, 345.0));
    }

    /// Test that confidence threshold filters detections correctly
    #[test]
    fn test_confidence_threshold_filtering() {
        let boxes = vec![
            [100.0, 100.0, 20.0, 20.0],
            [200.0, 200.0, 20.0, 20.0],
            [300.0, 300.0, 20.0, 20.0],
        ];
        let class_scores = vec![(0, 0.49), (1, 0.5), (2, 0.8)];
        let output = create_yolo_test_data(boxes, class_scores, 80);

        let transform = test_transform(640, 640, 1.0, 0.0, 0.0);
        let detections = test_postprocessor()
            .parse_detections(&output.view(), &transform)
            .unwrap();

        assert_eq!(detections.len(), 2, "Should filter out confidence < 0.5");
        assert_eq!(detections[0].class_index, 2, "Highest confidence first");
        assert_eq!(detections[1].class_index, 1, "Boundary case: 0.5 included");
    }

    /// Test coordinate inverse transformation with known values
    #[test]
    fn test_coordinate_inverse_transformation() {
        // Original 800x600 into 640x640: scale 0.8, new size 640x480,
        // offset_y = (640 - 480) / 2 = 80.
        // Box cxcywh (320, 320, 160, 160) -> xyxy (240, 240, 400, 400)
        //   x1 = 240 / 0.8 = 300, y1 = (240 - 80) / 0.8 = 200
        //   x2 = 400 / 0.8 = 500, y2 = (400 - 80) / 0.8 = 400
        let output = create_yolo_test_data(vec![[320.0, 320.0, 160.0, 160.0]], vec![(0, 0.9)], 80);

        let transform = test_transform(800, 600, 0.8, 0.0, 80.0);
        let detections = test_postprocessor()
            .parse_detections(&output.view(), &transform)
            .unwrap();

        assert_eq!(detections.len(), 1);
        let expected = [300.0, 200.0, 500.0, 400.0];
        for (got, want) in detections[0].bbox.iter().zip(expected) {
            assert!((got - want).abs() < 0.01, "bbox {:?} != {:?}", detections[0].bbox, expected);
        }
    }

    /// Test that coordinates are clamped to image bounds
    #[test]
    fn test_coordinates_clamped_to_image_bounds() {
        let boxes = vec![[10.0, 10.0, 100.0, 100.0], [630.0, 630.0, 100.0, 100.0]];
        let output = create_yolo_test_data(boxes, vec![(0, 0.9), (1, 0.9)], 80);

        let transform = test_transform(400, 400, 1.0, 50.0, 50.0);
        let detections = test_postprocessor()
            .parse_detections(&output.view(), &transform)
            .unwrap();

        assert_eq!(detections.len(), 2);
        let low = detections.iter().find(|d| d.class_index == 0).unwrap();
        let high = detections.iter().find(|d| d.class_index == 1).unwrap();
        assert_eq!(low.bbox[0], 0.0, "Negative x1 should be clamped to 0");
        assert_eq!(low.bbox[1], 0.0, "Negative y1 should be clamped to 0");
        assert_eq!(high.bbox[2], 400.0, "x2 exceeding width should be clamped");
        assert_eq!(high.bbox[3], 400.0, "y2 exceeding height should be clamped");
    }

    /// Test class ID extraction via argmax
    #[test]
    fn test_class_id_argmax() {
        let mut output =
            create_yolo_test_data(vec![[100.0, 100.0, 10.0, 10.0]], vec![(39, 0.9)], 80);
        output[[0, 4 + 79, 0]] = 0.6;

        let transform = test_transform(640, 640, 1.0, 0.0, 0.0);
        let detections = test_postprocessor()
            .parse_detections(&output.view(), &transform)
            .unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_index, 39, "Bottle class (39)");
        assert!((detections[0].confidence - 0.9).abs() < 1e-6);
    }

    /// Test that overlapping boxes of the same class are suppressed
    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let boxes = vec![
            [100.0, 100.0, 50.0, 50.0],
            [102.0, 101.0, 50.0, 50.0],
            [102.0, 101.0, 50.0, 50.0],
        ];
        let class_scores = vec![(0, 0.8), (0, 0.9), (5, 0.7)];
        let output = create_yolo_test_data(boxes, class_scores, 80);

        let transform = test_transform(640, 640, 1.0, 0.0, 0.0);
        let detections = test_postprocessor()
            .parse_detections(&output.view(), &transform)
            .unwrap();

        assert_eq!(detections.len(), 2, "One person box suppressed");
        assert_eq!(detections[0].class_index, 0);
        assert!((detections[0].confidence - 0.9).abs() < 1e-6, "Best box kept");
        assert_eq!(detections[1].class_index, 5, "Other class not suppressed");
    }

    /// Test max_detections cap
    #[test]
    fn test_max_detections_cap() {
        let boxes: Vec<[f32; 4]> = (0..10)
            .map(|i| [i as f32 * 60.0 + 20.0, 20.0, 10.0, 10.0])
            .collect();
        let class_scores = (0..10).map(|i| (0, 0.5 + i as f32 * 0.01)).collect();
        let output = create_yolo_test_data(boxes, class_scores, 1);

        let mut post_processor = test_postprocessor();
        post_processor.max_detections = 3;
        let transform = test_transform(640, 640, 1.0, 0.0, 0.0);
        let detections = post_processor
            .parse_detections(&output.view(), &transform)
            .unwrap();

        assert_eq!(detections.len(), 3);
        assert!(detections[0].confidence > detections[2].confidence);
    }

    /// Test edge case: Empty output (0 anchors)
    #[test]
    fn test_empty_input() {
        let output = Array::<f32, _>::zeros(IxDyn(&[1, 84, 0]));
        let transform = test_transform(640, 640, 1.0, 0.0, 0.0);
        let detections = test_postprocessor()
            .parse_detections(&output.view(), &transform)
            .unwrap();
        assert!(detections.is_empty(), "Empty input should return no detections");
    }

    /// Test malformed output shapes are rejected
    #[test]
    fn test_bad_shape_rejected() {
        let transform = test_transform(640, 640, 1.0, 0.0, 0.0);
        let flat = Array::<f32, _>::zeros(IxDyn(&[84, 10]));
        assert!(test_postprocessor().parse_detections(&flat.view(), &transform).is_err());
        let boxes_only = Array::<f32, _>::zeros(IxDyn(&[1, 4, 10]));
        assert!(test_postprocessor().parse_detections(&boxes_only.view(), &transform).is_err());
    }

    #[test]
    fn test_iou() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
        assert!((iou(&a, &[5.0, 0.0, 15.0, 10.0]) - 1.0 / 3.0).abs() < 1e-6);
    }
}
