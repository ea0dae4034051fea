use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::RgbImage;

use crate::error::VisionError;

/// Decode a base64 image payload into an RGB pixel buffer.
///
/// Payloads may carry a data-URI prefix (`data:image/png;base64,...`);
/// everything up to and including the first `,` is stripped before decoding.
pub fn decode_payload(payload: &str) -> Result<RgbImage, VisionError> {
    let raw = match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    };
    let bytes = BASE64.decode(raw.trim())?;
    decode_bytes(&bytes)
}

/// Decode raw encoded image bytes (PNG, JPEG, ...) into an RGB pixel buffer.
pub fn decode_bytes(bytes: &[u8]) -> Result<RgbImage, VisionError> {
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder, Rgb};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([(x % 256) as u8, (y % 256) as u8, 7]);
        }
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
            .unwrap();
        buffer
    }

    #[test]
    fn decodes_plain_base64() {
        let payload = BASE64.encode(png_bytes(12, 9));
        let img = decode_payload(&payload).unwrap();
        assert_eq!(img.dimensions(), (12, 9));
    }

    #[test]
    fn strips_data_uri_prefix() {
        let bytes = png_bytes(8, 8);
        let plain = decode_payload(&BASE64.encode(&bytes)).unwrap();
        let prefixed =
            decode_payload(&format!("data:image/png;base64,{}", BASE64.encode(&bytes))).unwrap();
        assert_eq!(plain.as_raw(), prefixed.as_raw());
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(
            decode_payload("!!not base64!!"),
            Err(VisionError::Base64(_))
        ));
    }

    #[test]
    fn rejects_non_image_bytes() {
        let payload = BASE64.encode(b"definitely not an image");
        assert!(matches!(
            decode_payload(&payload),
            Err(VisionError::Decode(_))
        ));
    }
}
