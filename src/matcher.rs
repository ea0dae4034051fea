use faceprint_vision::similarity;

use crate::encoding::FaceEncoding;

/// Highest similarity between a probe descriptor and any stored encoding.
///
/// Encodings with a different feature layout score 0.0 (logged by the
/// similarity layer) rather than failing the whole probe.
pub fn best_score(encodings: &[FaceEncoding], probe: &[f64]) -> Option<f64> {
    encodings
        .iter()
        .map(|e| similarity::compare_or_zero(&e.features, probe))
        .fold(None, |acc, s| match acc {
            Some(best) if best > s => Some(best),
            _ => Some(s),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::ENCODING_TYPE;

    fn encoding_with(features: Vec<f64>) -> FaceEncoding {
        FaceEncoding {
            subject_id: "e1".into(),
            subject_name: "Alice".into(),
            quality: 0.8,
            frame_count: 1,
            feature_count: features.len(),
            features,
            timestamp: "2025-08-17T06:53:41Z".into(),
            encoding_type: ENCODING_TYPE.into(),
        }
    }

    #[test]
    fn no_encodings_no_score() {
        assert!(best_score(&[], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn picks_the_closest_encoding() {
        let probe = vec![1.0, 0.0, 0.0];
        let stored = vec![
            encoding_with(vec![0.0, 1.0, 0.0]),
            encoding_with(vec![1.0, 0.1, 0.0]),
        ];
        let score = best_score(&stored, &probe).unwrap();
        assert!(score > 0.95);
    }

    #[test]
    fn layout_mismatch_scores_zero_instead_of_failing() {
        let probe = vec![1.0, 0.0];
        let stored = vec![encoding_with(vec![1.0, 0.0, 0.0])];
        assert_eq!(best_score(&stored, &probe), Some(0.0));
    }
}
