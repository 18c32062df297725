use ndarray::{Array2, Axis};

/// Detections for one frame, stored as parallel arrays.
///
/// `xyxy` is an `N x 4` array of pixel-space boxes `(x1, y1, x2, y2)`.
/// Every optional array, when present, holds exactly `N` entries; the
/// producers (detector and tracker) are responsible for that.
#[derive(Clone, Debug, PartialEq)]
pub struct Detections {
    pub xyxy: Array2<f64>,
    pub confidence: Option<Vec<f64>>,
    pub class_id: Option<Vec<u32>>,
    pub tracker_id: Option<Vec<u32>>,
}

impl Detections {
    pub fn empty() -> Self {
        Self {
            xyxy: Array2::zeros((0, 4)),
            confidence: None,
            class_id: None,
            tracker_id: None,
        }
    }

    /// Builds detections from boxes alone; all optional arrays are absent.
    pub fn from_boxes(boxes: &[[f64; 4]]) -> Self {
        let flat: Vec<f64> = boxes.iter().flatten().copied().collect();
        let xyxy = Array2::from_shape_vec((boxes.len(), 4), flat)
            .expect("box list always flattens to N x 4");
        Self {
            xyxy,
            confidence: None,
            class_id: None,
            tracker_id: None,
        }
    }

    pub fn with_confidence(mut self, confidence: Vec<f64>) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_class_id(mut self, class_id: Vec<u32>) -> Self {
        self.class_id = Some(class_id);
        self
    }

    pub fn with_tracker_id(mut self, tracker_id: Vec<u32>) -> Self {
        self.tracker_id = Some(tracker_id);
        self
    }

    pub fn len(&self) -> usize {
        self.xyxy.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bbox(&self, i: usize) -> [f64; 4] {
        let row = self.xyxy.row(i);
        [row[0], row[1], row[2], row[3]]
    }

    /// Confidence of detection `i`, treating a missing array as certain.
    pub fn score(&self, i: usize) -> f64 {
        self.confidence.as_ref().map_or(1.0, |c| c[i])
    }

    /// New detections holding the rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        let pick_u32 =
            |v: &Vec<u32>| -> Vec<u32> { indices.iter().map(|&i| v[i]).collect() };
        Self {
            xyxy: self.xyxy.select(Axis(0), indices),
            confidence: self
                .confidence
                .as_ref()
                .map(|v| indices.iter().map(|&i| v[i]).collect()),
            class_id: self.class_id.as_ref().map(pick_u32),
            tracker_id: self.tracker_id.as_ref().map(pick_u32),
        }
    }

    /// Keeps only detections of `class_id`.
    ///
    /// Without a class array there is nothing to filter on, so everything
    /// is kept.
    pub fn filter_class(&self, class_id: u32) -> Self {
        let Some(classes) = &self.class_id else {
            return self.clone();
        };
        let keep: Vec<usize> = classes
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == class_id)
            .map(|(i, _)| i)
            .collect();
        self.select(&keep)
    }
}

impl Default for Detections {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_mixed() -> Detections {
        Detections::from_boxes(&[
            [0.0, 0.0, 10.0, 10.0],
            [5.0, 5.0, 20.0, 20.0],
            [30.0, 30.0, 40.0, 45.0],
        ])
        .with_confidence(vec![0.9, 0.4, 0.7])
        .with_class_id(vec![0, 2, 0])
    }

    #[test]
    fn test_empty_has_no_rows() {
        let d = Detections::empty();
        assert!(d.is_empty());
        assert_eq!(d.xyxy.shape(), &[0, 4]);
    }

    #[test]
    fn test_from_boxes_shape_and_rows() {
        let d = three_mixed();
        assert_eq!(d.len(), 3);
        assert_eq!(d.bbox(2), [30.0, 30.0, 40.0, 45.0]);
    }

    #[test]
    fn test_score_defaults_to_one_without_confidence() {
        let d = Detections::from_boxes(&[[0.0, 0.0, 1.0, 1.0]]);
        assert_eq!(d.score(0), 1.0);
        assert_eq!(three_mixed().score(1), 0.4);
    }

    #[test]
    fn test_select_reorders_all_arrays() {
        let d = three_mixed().with_tracker_id(vec![7, 8, 9]).select(&[2, 0]);
        assert_eq!(d.len(), 2);
        assert_eq!(d.bbox(0), [30.0, 30.0, 40.0, 45.0]);
        assert_eq!(d.confidence, Some(vec![0.7, 0.9]));
        assert_eq!(d.class_id, Some(vec![0, 0]));
        assert_eq!(d.tracker_id, Some(vec![9, 7]));
    }

    #[test]
    fn test_filter_class_keeps_matching_rows() {
        let d = three_mixed().filter_class(0);
        assert_eq!(d.len(), 2);
        assert_eq!(d.confidence, Some(vec![0.9, 0.7]));
    }

    #[test]
    fn test_filter_class_with_no_matches_is_empty() {
        let d = three_mixed().filter_class(5);
        assert!(d.is_empty());
        assert_eq!(d.class_id, Some(vec![]));
    }

    #[test]
    fn test_filter_class_is_noop_without_class_ids() {
        let d = Detections::from_boxes(&[[0.0, 0.0, 1.0, 1.0], [2.0, 2.0, 3.0, 3.0]]);
        assert_eq!(d.filter_class(0), d);
    }
}
