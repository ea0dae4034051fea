use thiserror::Error;

/// Errors produced by the vision core.
///
/// "No face found" is not represented here: zero detections are a valid
/// outcome, surfaced as a zero quality score or an empty feature vector.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("feature vector length mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

impl From<image::ImageError> for VisionError {
    fn from(err: image::ImageError) -> Self {
        VisionError::Decode(err.to_string())
    }
}
