//! Beat-by-beat comparison of detections against reference annotations.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionScore {
    pub tolerance: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub sensitivity: f64,
    pub positive_predictivity: f64,
    pub f1: f64,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Match each reference beat to at most one detection no more than `tolerance` samples
/// away. Both lists must be sorted; matching is greedy in time order.
pub fn score_detections(reference: &[usize], detected: &[usize], tolerance: usize) -> DetectionScore {
    let mut matched = 0;
    let mut idx = 0;
    for &beat in reference {
        while idx < detected.len() && detected[idx].saturating_add(tolerance) < beat {
            idx += 1;
        }
        if idx < detected.len() && detected[idx].abs_diff(beat) <= tolerance {
            matched += 1;
            idx += 1;
        }
    }
    let false_positives = detected.len() - matched;
    let false_negatives = reference.len() - matched;
    let sensitivity = ratio(matched, reference.len());
    let positive_predictivity = ratio(matched, detected.len());
    let f1 = if sensitivity + positive_predictivity > 0.0 {
        2.0 * sensitivity * positive_predictivity / (sensitivity + positive_predictivity)
    } else {
        0.0
    };
    DetectionScore {
        tolerance,
        true_positives: matched,
        false_positives,
        false_negatives,
        sensitivity,
        positive_predictivity,
        f1,
    }
}
