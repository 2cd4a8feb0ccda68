use std::cmp::Ordering;

/// One detected object on a single frame.
///
/// Coordinates are corner form `(x1, y1)`-`(x2, y2)` in source-frame pixels.
/// Detections are consumed by the annotation pass immediately after
/// inference and are not retained across frames.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Model confidence in 0..=1.
    pub confidence: f32,
    /// Class name as configured for the model.
    pub label: String,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, label: &str) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
            label: label.to_string(),
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// Intersection-over-union of two boxes. Returns 0.0 for disjoint boxes
/// and for degenerate (zero-area) unions.
pub fn iou(a: &Detection, b: &Detection) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Drop detections below the confidence threshold.
pub fn filter_by_confidence(detections: Vec<Detection>, threshold: f32) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| d.confidence >= threshold)
        .collect()
}

/// Greedy non-maximum suppression. Keeps the highest-confidence box of any
/// overlapping cluster; a box is suppressed when its IoU with an already
/// kept box exceeds `iou_threshold`.
pub fn apply_nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        if kept.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = Detection::new(10.0, 10.0, 20.0, 20.0, 0.9, "occupied");
        let b = a.clone();
        assert!((iou(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = Detection::new(0.0, 0.0, 10.0, 10.0, 0.9, "occupied");
        let b = Detection::new(20.0, 20.0, 30.0, 30.0, 0.9, "empty");
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        // Two 10x10 boxes sharing a 5x10 strip: 50 / (100 + 100 - 50).
        let a = Detection::new(0.0, 0.0, 10.0, 10.0, 0.9, "occupied");
        let b = Detection::new(5.0, 0.0, 15.0, 10.0, 0.8, "occupied");
        assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn filter_drops_low_confidence() {
        let detections = vec![
            Detection::new(0.0, 0.0, 1.0, 1.0, 0.9, "occupied"),
            Detection::new(0.0, 0.0, 1.0, 1.0, 0.1, "empty"),
        ];
        let kept = filter_by_confidence(detections, 0.25);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].label, "occupied");
    }

    #[test]
    fn nms_suppresses_overlapping_lower_confidence_box() {
        let detections = vec![
            Detection::new(0.0, 0.0, 10.0, 10.0, 0.6, "occupied"),
            Detection::new(1.0, 1.0, 11.0, 11.0, 0.9, "occupied"),
            Detection::new(50.0, 50.0, 60.0, 60.0, 0.7, "empty"),
        ];
        let kept = apply_nms(detections, 0.45);
        assert_eq!(kept.len(), 2);
        // Highest confidence of the overlapping pair survives.
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(kept[1].label, "empty");
    }

    #[test]
    fn nms_keeps_everything_below_threshold() {
        let detections = vec![
            Detection::new(0.0, 0.0, 10.0, 10.0, 0.6, "occupied"),
            Detection::new(9.0, 9.0, 19.0, 19.0, 0.5, "occupied"),
        ];
        // Tiny corner overlap, IoU well under 0.45.
        let kept = apply_nms(detections, 0.45);
        assert_eq!(kept.len(), 2);
    }
}
