//! Enrollment encoding: pick the best of several candidate frames and
//! package its descriptor as a versioned, text-safe record.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use faceprint_vision::{Pipeline, VisionError};

/// Layout-version tag carried by every record; future feature layouts must
/// use a different tag to stay distinguishable.
pub const ENCODING_TYPE: &str = "enhanced_features";

/// At most this many candidate frames are scored per enrollment.
pub const MAX_CONSIDERED_FRAMES: usize = 5;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("no candidate frames provided")]
    NoFrames,

    #[error("no frame contained a usable face")]
    NoUsableFrame,

    #[error("malformed encoding artifact: {0}")]
    Malformed(String),

    #[error(transparent)]
    Vision(#[from] VisionError),
}

/// Packaged descriptor record produced at enrollment, immutable once built.
/// Persisted by external collaborators as the opaque text from [`pack`].
///
/// [`pack`]: FaceEncoding::pack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEncoding {
    pub subject_id: String,
    pub subject_name: String,
    pub quality: f64,
    pub frame_count: usize,
    pub features: Vec<f64>,
    pub feature_count: usize,
    pub timestamp: String,
    pub encoding_type: String,
}

impl FaceEncoding {
    /// Serialize as compact JSON, then base64 for text-only stores.
    pub fn pack(&self) -> String {
        let json = serde_json::to_string(self).expect("encoding record serializes");
        BASE64.encode(json)
    }

    /// Inverse of [`pack`](Self::pack).
    pub fn unpack(artifact: &str) -> Result<Self, EncodingError> {
        let bytes = BASE64
            .decode(artifact.trim())
            .map_err(|e| EncodingError::Malformed(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| EncodingError::Malformed(e.to_string()))
    }
}

/// Build one encoding from an ordered list of candidate frames.
///
/// Scores at most the first [`MAX_CONSIDERED_FRAMES`] frames; a frame that
/// fails to decode scores 0.0 and is skipped with a warning. The record's
/// `quality` is the arithmetic mean over the considered frames, while the
/// descriptor comes from the single best-scoring frame (earliest wins a
/// tie). Reporting the mean but extracting from the best frame is a known
/// asymmetry of the reference behavior, preserved deliberately.
pub fn build_encoding(
    pipeline: &Pipeline,
    subject_id: &str,
    subject_name: &str,
    frames: &[String],
) -> Result<FaceEncoding, EncodingError> {
    if frames.is_empty() {
        return Err(EncodingError::NoFrames);
    }

    let considered = &frames[..frames.len().min(MAX_CONSIDERED_FRAMES)];

    let mut best: Option<(usize, f64)> = None;
    let mut quality_sum = 0.0;
    for (index, frame) in considered.iter().enumerate() {
        let quality = match pipeline.score_quality(frame) {
            Ok(score) => score.overall,
            Err(err) => {
                warn!("frame {}: {err}", index + 1);
                0.0
            }
        };
        info!("frame {} quality: {quality:.3}", index + 1);
        quality_sum += quality;

        // Strict comparison against a 0.0 floor: zero-quality frames are
        // never eligible, and ties resolve to the earliest frame.
        if quality > best.map_or(0.0, |(_, q)| q) {
            best = Some((index, quality));
        }
    }
    let overall_quality = quality_sum / considered.len() as f64;

    let Some((best_index, best_quality)) = best else {
        return Err(EncodingError::NoUsableFrame);
    };

    let features = pipeline.extract_features(&considered[best_index])?;
    if features.is_empty() {
        return Err(EncodingError::NoUsableFrame);
    }

    info!(
        "encoding {subject_name}: best frame {} ({best_quality:.3}), mean quality {overall_quality:.3}, {} features",
        best_index + 1,
        features.len()
    );

    Ok(FaceEncoding {
        subject_id: subject_id.to_string(),
        subject_name: subject_name.to_string(),
        quality: overall_quality,
        frame_count: frames.len(),
        feature_count: features.len(),
        features,
        timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        encoding_type: ENCODING_TYPE.to_string(),
    })
}
