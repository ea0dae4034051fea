pub mod config;
pub mod encoding;
pub mod matcher;

// Re-export vision types for convenience
pub use faceprint_vision::{
    similarity, BoundingBox, DetectorParams, Pipeline, QualityScore, VisionError, FEATURE_LEN,
};

pub use encoding::{build_encoding, EncodingError, FaceEncoding, MAX_CONSIDERED_FRAMES};
