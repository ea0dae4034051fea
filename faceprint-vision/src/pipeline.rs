//! Full analysis pipeline: decode → locate → score / extract.
//!
//! A [`Pipeline`] owns the detector and is immutable after construction, so
//! one instance can be shared across arbitrarily many concurrent calls.

use image::{DynamicImage, RgbImage};
use log::info;

use crate::decode;
use crate::detect::{largest_face, BoundingBox, CascadeDetector, DetectorParams, FaceDetector};
use crate::error::VisionError;
use crate::features;
use crate::quality::{self, QualityScore};

pub struct Pipeline {
    detector: CascadeDetector,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_params(DetectorParams::default())
    }

    pub fn with_params(params: DetectorParams) -> Self {
        Self {
            detector: CascadeDetector::new(params),
        }
    }

    /// Detect all faces in a base64 image payload.
    pub fn detect_faces(&self, payload: &str) -> Result<Vec<BoundingBox>, VisionError> {
        let img = decode::decode_payload(payload)?;
        Ok(self.locate(&img))
    }

    /// Quality score for the canonical face, 0.0 when no face is found.
    pub fn score_quality(&self, payload: &str) -> Result<QualityScore, VisionError> {
        let img = decode::decode_payload(payload)?;
        let faces = self.locate(&img);
        let Some(face) = largest_face(&faces) else {
            info!("no face found for quality scoring");
            return Ok(QualityScore::zero());
        };

        let gray = DynamicImage::ImageRgb8(img.clone()).to_luma8();
        let score = quality::score_face(&gray, face);
        info!(
            "quality {:.3} for {}x{} face",
            score.overall, face.width, face.height
        );
        Ok(score)
    }

    /// 64-value descriptor for the canonical face, empty when no face is
    /// found. An empty vector is the caller's no-face signal; decode failure
    /// is the only error path.
    pub fn extract_features(&self, payload: &str) -> Result<Vec<f64>, VisionError> {
        let img = decode::decode_payload(payload)?;
        let faces = self.locate(&img);
        let Some(face) = largest_face(&faces) else {
            info!("no face found for feature extraction");
            return Ok(Vec::new());
        };
        Ok(features::extract(&img, face))
    }

    fn locate(&self, img: &RgbImage) -> Vec<BoundingBox> {
        let (width, height) = img.dimensions();
        let gray = DynamicImage::ImageRgb8(img.clone()).to_luma8();
        let faces = self.detector.detect(gray.as_raw(), width, height);
        info!("detected {} face(s)", faces.len());
        faces
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
