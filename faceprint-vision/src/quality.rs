//! Face quality scoring.
//!
//! Four normalized sub-scores (size, position, sharpness, contrast), blended
//! by arithmetic mean. Pure: identical pixels and box in, identical score
//! out. All normalization divisors are committed contract values.

use image::{imageops, GrayImage, Luma};
use imageproc::filter::filter3x3;

use crate::detect::BoundingBox;

/// Faces at or above ~100×100 px score full marks for size.
const SIZE_REFERENCE_AREA: f64 = 10_000.0;
/// Variance-of-Laplacian reaching this value counts as fully sharp.
const SHARPNESS_REFERENCE: f64 = 500.0;
/// Intensity standard deviation reaching this value counts as full contrast.
const CONTRAST_REFERENCE: f64 = 128.0;

/// 4-neighbor discrete Laplacian, the standard focus-measure kernel.
const LAPLACIAN: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];

/// Blended [0,1] quality measure with its per-metric breakdown.
///
/// `subscores` is `None` exactly when no face was found, in which case
/// `overall` is 0.0.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityScore {
    pub overall: f64,
    pub subscores: Option<QualitySubscores>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualitySubscores {
    pub size: f64,
    pub position: f64,
    pub sharpness: f64,
    pub contrast: f64,
}

impl QualityScore {
    /// The no-face score: zero overall, no breakdown.
    pub fn zero() -> Self {
        Self {
            overall: 0.0,
            subscores: None,
        }
    }
}

/// Score a single face within a grayscale image.
pub fn score_face(gray: &GrayImage, face: &BoundingBox) -> QualityScore {
    let (img_w, img_h) = gray.dimensions();
    let region = face_region(gray, face);

    let size = ((face.width as f64 * face.height as f64) / SIZE_REFERENCE_AREA).min(1.0);

    let face_cx = face.x as f64 + face.width as f64 / 2.0;
    let face_cy = face.y as f64 + face.height as f64 / 2.0;
    let img_cx = img_w as f64 / 2.0;
    let img_cy = img_h as f64 / 2.0;
    let distance = ((face_cx - img_cx).powi(2) + (face_cy - img_cy).powi(2)).sqrt();
    let max_distance = (img_cx.powi(2) + img_cy.powi(2)).sqrt().max(1.0);
    let position = (1.0 - distance / max_distance).max(0.0);

    let sharpness = (laplacian_variance(&region) / SHARPNESS_REFERENCE).min(1.0);
    let contrast = (intensity_stddev(&region) / CONTRAST_REFERENCE).min(1.0);

    let overall = (size + position + sharpness + contrast) / 4.0;
    QualityScore {
        overall: overall.clamp(0.0, 1.0),
        subscores: Some(QualitySubscores {
            size,
            position,
            sharpness,
            contrast,
        }),
    }
}

/// Crop the face box, clamped to image bounds.
fn face_region(gray: &GrayImage, face: &BoundingBox) -> GrayImage {
    let (img_w, img_h) = gray.dimensions();
    let x = face.x.min(img_w.saturating_sub(1));
    let y = face.y.min(img_h.saturating_sub(1));
    let w = face.width.min(img_w - x).max(1);
    let h = face.height.min(img_h - y).max(1);
    imageops::crop_imm(gray, x, y, w, h).to_image()
}

/// Variance of the Laplacian response over the region.
fn laplacian_variance(region: &GrayImage) -> f64 {
    let filtered = filter3x3::<Luma<u8>, f32, f32>(region, &LAPLACIAN);
    variance(filtered.iter().map(|&v| v as f64))
}

fn intensity_stddev(region: &GrayImage) -> f64 {
    variance(region.iter().map(|&v| v as f64)).sqrt()
}

fn variance(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        return 0.0;
    }
    let n = collected.len() as f64;
    let mean = collected.iter().sum::<f64>() / n;
    collected.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
