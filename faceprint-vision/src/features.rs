//! 64-value face descriptor extraction.
//!
//! The layout and every normalization divisor below are the committed
//! contract of the `enhanced_features` encoding type. Descriptors are
//! compared position-wise, so reordering or re-normalizing any segment
//! breaks interoperability with previously stored encodings.
//!
//! Layout (64 values):
//! - 32: intensity histogram of the 128×128 grayscale crop
//! -  3: edge density at 128/64/32 px downscales
//! -  4: oriented Gabor responses at 0°/45°/90°/135°
//! - 16: per-block gradient magnitude over 16×16 blocks, raster order
//! -  2: brightness and contrast
//! -  1: box aspect ratio
//! -  6: HSV and Lab channel means

use image::{imageops, imageops::FilterType, DynamicImage, GrayImage, RgbImage};
use imageproc::edges::canny;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use once_cell::sync::Lazy;

use crate::detect::BoundingBox;

/// Descriptor length whenever extraction succeeds.
pub const FEATURE_LEN: usize = 64;

/// Side of the square canvas every face crop is resized to.
const CANVAS: u32 = 128;
const HISTOGRAM_BINS: usize = 32;
const EDGE_SCALES: [u32; 3] = [1, 2, 4];
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;
const BLOCK: u32 = 16;
const BLOCK_FEATURES: usize = 16;
const EPSILON: f64 = 1e-8;

/// Gabor bank parameters: 21×21 support, σ=8, λ=10, γ=0.5, ψ=0.
const GABOR_SIZE: i32 = 21;
const GABOR_SIGMA: f64 = 8.0;
const GABOR_WAVELENGTH: f64 = 10.0;
const GABOR_ASPECT: f64 = 0.5;
const GABOR_ORIENTATIONS: [f64; 4] = [0.0, 45.0, 90.0, 135.0];

/// The four oriented kernels, built once per process.
static GABOR_BANK: Lazy<Vec<Vec<f64>>> = Lazy::new(|| {
    GABOR_ORIENTATIONS
        .iter()
        .map(|&degrees| gabor_kernel(degrees.to_radians()))
        .collect()
});

/// Extract the 64-value descriptor for a face box within an RGB image.
pub fn extract(img: &RgbImage, face: &BoundingBox) -> Vec<f64> {
    let crop = face_crop(img, face);
    let gray = DynamicImage::ImageRgb8(crop.clone()).to_luma8();

    let mut features = Vec::with_capacity(FEATURE_LEN);
    features.extend(histogram(&gray));
    features.extend(edge_densities(&gray));
    features.extend(gabor_responses(&gray));
    features.extend(block_gradients(&gray));
    features.extend(brightness_contrast(&gray));
    features.push(aspect_ratio(face));
    features.extend(color_statistics(&crop));

    debug_assert_eq!(features.len(), FEATURE_LEN);
    features
}

/// Crop the box (clamped to bounds) and resize to the 128×128 canvas.
fn face_crop(img: &RgbImage, face: &BoundingBox) -> RgbImage {
    let (img_w, img_h) = img.dimensions();
    let x = face.x.min(img_w.saturating_sub(1));
    let y = face.y.min(img_h.saturating_sub(1));
    let w = face.width.min(img_w - x).max(1);
    let h = face.height.min(img_h - y).max(1);
    let region = imageops::crop_imm(img, x, y, w, h).to_image();
    DynamicImage::ImageRgb8(region)
        .resize_exact(CANVAS, CANVAS, FilterType::Triangle)
        .to_rgb8()
}

/// 32-bin intensity histogram normalized by total pixel count.
fn histogram(gray: &GrayImage) -> Vec<f64> {
    let mut bins = [0u64; HISTOGRAM_BINS];
    for pixel in gray.pixels() {
        bins[(pixel[0] >> 3) as usize] += 1;
    }
    let total = gray.width() as f64 * gray.height() as f64 + EPSILON;
    bins.iter().map(|&count| count as f64 / total).collect()
}

/// Fraction of Canny edge pixels at 1×, 2×, and 4× downscales.
fn edge_densities(gray: &GrayImage) -> Vec<f64> {
    EDGE_SCALES
        .iter()
        .map(|&scale| {
            let side = CANVAS / scale;
            let scaled = if scale == 1 {
                gray.clone()
            } else {
                DynamicImage::ImageLuma8(gray.clone())
                    .resize_exact(side, side, FilterType::Triangle)
                    .to_luma8()
            };
            let edges = canny(&scaled, CANNY_LOW, CANNY_HIGH);
            let edge_pixels = edges.pixels().filter(|p| p[0] > 0).count();
            edge_pixels as f64 / (side as f64 * side as f64)
        })
        .collect()
}

/// Mean response of each oriented band-pass kernel, normalized to [0,1].
///
/// Per-pixel responses saturate into [0,255] before averaging, matching the
/// unsigned 8-bit destination of the reference behavior.
fn gabor_responses(gray: &GrayImage) -> Vec<f64> {
    GABOR_BANK
        .iter()
        .map(|kernel| {
            let mut sum = 0.0;
            for y in 0..CANVAS as i32 {
                for x in 0..CANVAS as i32 {
                    sum += convolve_at(gray, kernel, x, y).clamp(0.0, 255.0);
                }
            }
            sum / (CANVAS as f64 * CANVAS as f64) / 255.0
        })
        .collect()
}

/// Single-pixel convolution with replicated borders.
fn convolve_at(gray: &GrayImage, kernel: &[f64], x: i32, y: i32) -> f64 {
    let half = GABOR_SIZE / 2;
    let max_x = CANVAS as i32 - 1;
    let max_y = CANVAS as i32 - 1;
    let mut acc = 0.0;
    for ky in 0..GABOR_SIZE {
        let sy = (y + ky - half).clamp(0, max_y) as u32;
        for kx in 0..GABOR_SIZE {
            let sx = (x + kx - half).clamp(0, max_x) as u32;
            acc += kernel[(ky * GABOR_SIZE + kx) as usize] * gray.get_pixel(sx, sy)[0] as f64;
        }
    }
    acc
}

fn gabor_kernel(theta: f64) -> Vec<f64> {
    let half = GABOR_SIZE / 2;
    let sigma_sq = GABOR_SIGMA * GABOR_SIGMA;
    let gamma_sq = GABOR_ASPECT * GABOR_ASPECT;
    let mut kernel = Vec::with_capacity((GABOR_SIZE * GABOR_SIZE) as usize);
    for y in -half..=half {
        for x in -half..=half {
            let (xf, yf) = (x as f64, y as f64);
            let x_rot = xf * theta.cos() + yf * theta.sin();
            let y_rot = -xf * theta.sin() + yf * theta.cos();
            let envelope = (-(x_rot * x_rot + gamma_sq * y_rot * y_rot) / (2.0 * sigma_sq)).exp();
            let carrier = (2.0 * std::f64::consts::PI * x_rot / GABOR_WAVELENGTH).cos();
            kernel.push(envelope * carrier);
        }
    }
    kernel
}

/// Mean Sobel gradient magnitude per 16×16 block, first 16 blocks in raster
/// order, each normalized by 255.
fn block_gradients(gray: &GrayImage) -> Vec<f64> {
    let mut features = Vec::with_capacity(BLOCK_FEATURES);
    'outer: for by in (0..CANVAS).step_by(BLOCK as usize) {
        for bx in (0..CANVAS).step_by(BLOCK as usize) {
            let block = imageops::crop_imm(gray, bx, by, BLOCK, BLOCK).to_image();
            let gx = horizontal_sobel(&block);
            let gy = vertical_sobel(&block);
            let mean_magnitude: f64 = gx
                .iter()
                .zip(gy.iter())
                .map(|(&dx, &dy)| ((dx as f64).powi(2) + (dy as f64).powi(2)).sqrt())
                .sum::<f64>()
                / (BLOCK as f64 * BLOCK as f64);
            features.push(mean_magnitude / 255.0);
            if features.len() == BLOCK_FEATURES {
                break 'outer;
            }
        }
    }
    features
}

fn brightness_contrast(gray: &GrayImage) -> Vec<f64> {
    let n = gray.width() as f64 * gray.height() as f64;
    let mean = gray.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = gray.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    vec![mean / 255.0, variance.sqrt() / 255.0]
}

/// Box width over height, unnormalized.
fn aspect_ratio(face: &BoundingBox) -> f64 {
    face.width as f64 / (face.height as f64 + EPSILON)
}

/// HSV and Lab channel means over the color crop.
///
/// Channels use 8-bit OpenCV-style ranges (H in [0,179], S/V in [0,255],
/// L scaled by 255/100, a/b offset by +128) and are normalized by the
/// channel maximum.
fn color_statistics(crop: &RgbImage) -> Vec<f64> {
    let n = crop.width() as f64 * crop.height() as f64;
    let (mut h_sum, mut s_sum, mut v_sum) = (0.0, 0.0, 0.0);
    let (mut l_sum, mut a_sum, mut b_sum) = (0.0, 0.0, 0.0);

    for pixel in crop.pixels() {
        let (h, s, v) = rgb_to_hsv8(pixel[0], pixel[1], pixel[2]);
        h_sum += h;
        s_sum += s;
        v_sum += v;
        let (l, a, b) = rgb_to_lab8(pixel[0], pixel[1], pixel[2]);
        l_sum += l;
        a_sum += a;
        b_sum += b;
    }

    vec![
        h_sum / n / 179.0,
        s_sum / n / 255.0,
        v_sum / n / 255.0,
        l_sum / n / 255.0,
        a_sum / n / 255.0,
        b_sum / n / 255.0,
    ]
}

/// HSV with H in [0,179] (degrees halved) and S, V in [0,255].
fn rgb_to_hsv8(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let (rf, gf, bf) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let hue_deg = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (((gf - bf) / delta).rem_euclid(6.0))
    } else if max == gf {
        60.0 * ((bf - rf) / delta + 2.0)
    } else {
        60.0 * ((rf - gf) / delta + 4.0)
    };
    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    (hue_deg / 2.0, saturation * 255.0, max * 255.0)
}

/// CIE Lab (D65) in 8-bit encoding: L·255/100, a+128, b+128.
fn rgb_to_lab8(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    fn linearize(c: f64) -> f64 {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    fn lab_f(t: f64) -> f64 {
        if t > 0.008856 {
            t.cbrt()
        } else {
            7.787 * t + 16.0 / 116.0
        }
    }

    let (rl, gl, bl) = (
        linearize(r as f64 / 255.0),
        linearize(g as f64 / 255.0),
        linearize(b as f64 / 255.0),
    );

    // sRGB → XYZ, D65 white point.
    let x = (0.412453 * rl + 0.357580 * gl + 0.180423 * bl) / 0.950456;
    let y = 0.212671 * rl + 0.715160 * gl + 0.072169 * bl;
    let z = (0.019334 * rl + 0.119193 * gl + 0.950227 * bl) / 1.088754;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let b_chan = 200.0 * (fy - fz);

    (l * 255.0 / 100.0, a + 128.0, b_chan + 128.0)
}
