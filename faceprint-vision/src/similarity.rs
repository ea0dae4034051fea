//! Cosine similarity between face descriptors.

use log::warn;
use ndarray::ArrayView1;

use crate::error::VisionError;

const NORM_EPSILON: f64 = 1e-8;

/// Compare two descriptors: L2-normalize, dot, remap [-1,1] → [0,1].
///
/// Symmetric, and self-similarity of any non-degenerate vector is 1 within
/// floating tolerance. Unequal lengths are a recoverable
/// [`VisionError::DimensionMismatch`].
pub fn compare(a: &[f64], b: &[f64]) -> Result<f64, VisionError> {
    if a.len() != b.len() {
        return Err(VisionError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let av = ArrayView1::from(a);
    let bv = ArrayView1::from(b);
    let norm_a = av.dot(&av).sqrt() + NORM_EPSILON;
    let norm_b = bv.dot(&bv).sqrt() + NORM_EPSILON;
    let cosine = av.dot(&bv) / (norm_a * norm_b);

    Ok(((cosine + 1.0) / 2.0).clamp(0.0, 1.0))
}

/// Facade behavior for callers that treat a mismatch as "no match":
/// logs the condition and returns 0.0.
pub fn compare_or_zero(a: &[f64], b: &[f64]) -> f64 {
    match compare(a, b) {
        Ok(score) => score,
        Err(err) => {
            warn!("descriptor comparison failed: {err}");
            0.0
        }
    }
}
