//! End-to-end pipeline properties over synthetic images.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use faceprint_vision::{similarity, Pipeline, FEATURE_LEN};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

/// Draw a stylized frontal face: bright skin block, dark eye blocks, darker
/// mouth. Strong enough contrasts for the cascade's band tests at any
/// reasonable size.
fn draw_face(img: &mut RgbImage, fx: i32, fy: i32, fs: i32) {
    let gray = |v: u8| Rgb([v, v, v]);
    let frac = |f: f64| (fs as f64 * f) as i32;

    // Skin
    draw_filled_rect_mut(
        img,
        Rect::at(fx, fy).of_size(fs as u32, fs as u32),
        gray(200),
    );
    // Eyes
    for (left, right) in [(0.20, 0.38), (0.62, 0.80)] {
        draw_filled_rect_mut(
            img,
            Rect::at(fx + frac(left), fy + frac(0.25))
                .of_size((frac(right) - frac(left)) as u32, (frac(0.40) - frac(0.25)) as u32),
            gray(30),
        );
    }
    // Mouth
    draw_filled_rect_mut(
        img,
        Rect::at(fx + frac(0.30), fy + frac(0.70))
            .of_size((frac(0.70) - frac(0.30)) as u32, (frac(0.78) - frac(0.70)) as u32),
        gray(60),
    );
}

fn png_payload(img: &RgbImage) -> String {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .unwrap();
    BASE64.encode(buffer)
}

fn face_image(side: u32, fx: i32, fy: i32, fs: i32) -> RgbImage {
    let mut img = RgbImage::from_pixel(side, side, Rgb([50, 50, 50]));
    draw_face(&mut img, fx, fy, fs);
    img
}

fn centered_face_payload() -> String {
    png_payload(&face_image(160, 40, 40, 80))
}

#[test]
fn synthetic_face_is_detected() {
    let pipeline = Pipeline::new();
    let faces = pipeline.detect_faces(&centered_face_payload()).unwrap();
    assert!(!faces.is_empty(), "expected at least one detection");

    let best = faceprint_vision::largest_face(&faces).unwrap();
    let (cx, cy) = (
        best.x as i32 + best.width as i32 / 2,
        best.y as i32 + best.height as i32 / 2,
    );
    assert!((40..120).contains(&cx), "face center x {cx} outside planted box");
    assert!((40..120).contains(&cy), "face center y {cy} outside planted box");
}

#[test]
fn blank_image_scores_zero_with_empty_features() {
    let pipeline = Pipeline::new();
    let blank = RgbImage::from_pixel(10, 10, Rgb([200, 200, 200]));
    let payload = png_payload(&blank);

    let score = pipeline.score_quality(&payload).unwrap();
    assert_eq!(score.overall, 0.0);
    assert!(score.subscores.is_none());

    let features = pipeline.extract_features(&payload).unwrap();
    assert!(features.is_empty());
}

#[test]
fn face_quality_is_in_unit_interval_with_breakdown() {
    let pipeline = Pipeline::new();
    let score = pipeline.score_quality(&centered_face_payload()).unwrap();
    assert!((0.0..=1.0).contains(&score.overall));

    let subs = score.subscores.expect("detected face must carry subscores");
    for value in [subs.size, subs.position, subs.sharpness, subs.contrast] {
        assert!((0.0..=1.0).contains(&value));
    }
    assert!(score.overall > 0.0);
}

#[test]
fn descriptor_has_64_values() {
    let pipeline = Pipeline::new();
    let features = pipeline.extract_features(&centered_face_payload()).unwrap();
    assert_eq!(features.len(), FEATURE_LEN);
    assert!(features.iter().all(|v| v.is_finite()));
}

#[test]
fn identical_payloads_yield_identical_descriptors() {
    let pipeline = Pipeline::new();
    let payload = centered_face_payload();
    let a = pipeline.extract_features(&payload).unwrap();
    let b = pipeline.extract_features(&payload).unwrap();
    assert_eq!(a, b);

    let score = similarity::compare(&a, &b).unwrap();
    assert!(score >= 0.999);
}

#[test]
fn data_uri_prefix_does_not_change_results() {
    let pipeline = Pipeline::new();
    let payload = centered_face_payload();
    let prefixed = format!("data:image/png;base64,{payload}");

    let plain = pipeline.score_quality(&payload).unwrap();
    let with_prefix = pipeline.score_quality(&prefixed).unwrap();
    assert_eq!(plain, with_prefix);
}

#[test]
fn centered_face_scores_higher_position_than_offset_face() {
    let pipeline = Pipeline::new();
    let centered = pipeline.score_quality(&centered_face_payload()).unwrap();
    let offset = pipeline
        .score_quality(&png_payload(&face_image(200, 8, 8, 80)))
        .unwrap();

    let centered_subs = centered.subscores.expect("centered face detected");
    let offset_subs = offset.subscores.expect("offset face detected");
    assert!(centered_subs.position > offset_subs.position);
}

#[test]
fn undecodable_payload_is_a_decode_error() {
    let pipeline = Pipeline::new();
    let payload = BASE64.encode(b"not an image at all");
    assert!(pipeline.score_quality(&payload).is_err());
    assert!(pipeline.extract_features(&payload).is_err());
}
