use image::{DynamicImage, ImageReader, RgbImage, codecs::jpeg::JpegEncoder};
use inference::RenderedFrame;
use std::io::Cursor;

pub const JPEG_QUALITY: u8 = 95;

/// Decode uploaded bytes into plain RGB8.
///
/// Alpha is dropped (not composited), palette and grayscale are expanded.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, String> {
    if bytes.is_empty() {
        return Err("empty upload".to_string());
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| e.to_string())?;

    if reader.format().is_none() {
        return Err("unrecognized image format".to_string());
    }

    let image: DynamicImage = reader.decode().map_err(|e| e.to_string())?;

    if image.width() == 0 || image.height() == 0 {
        return Err("image has no pixels".to_string());
    }

    Ok(image.to_rgb8())
}

/// `None` and `image/*` are accepted; anything else is not an image upload.
pub fn is_image_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(ct) => ct
            .trim()
            .get(..6)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/")),
    }
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(image)?;
    Ok(buffer)
}

/// Normalize channel order and encode an annotated frame.
pub fn frame_to_jpeg(frame: RenderedFrame) -> anyhow::Result<Vec<u8>> {
    let rgb = frame.into_rgb()?;
    Ok(encode_jpeg(&rgb, JPEG_QUALITY)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, Rgba, RgbaImage};
    use inference::ColorFormat;

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_decode_png_to_rgb() {
        let mut source = RgbImage::new(4, 3);
        source.put_pixel(1, 1, Rgb([10, 200, 30]));

        let decoded = decode_image(&png_bytes(DynamicImage::ImageRgb8(source.clone()))).unwrap();

        assert_eq!(decoded, source);
    }

    #[test]
    fn test_decode_drops_alpha() {
        let mut source = RgbaImage::new(2, 2);
        source.put_pixel(0, 0, Rgba([255, 0, 0, 0]));

        let decoded = decode_image(&png_bytes(DynamicImage::ImageRgba8(source))).unwrap();

        assert_eq!(decoded.get_pixel(0, 0), &Rgb([255, 0, 0]), "Alpha discarded, not composited");
    }

    #[test]
    fn test_decode_grayscale_expands() {
        let gray = image::GrayImage::from_pixel(2, 2, image::Luma([77]));
        let decoded = decode_image(&png_bytes(DynamicImage::ImageLuma8(gray))).unwrap();
        assert_eq!(decoded.get_pixel(1, 1), &Rgb([77, 77, 77]));
    }

    #[test]
    fn test_decode_rejects_non_images() {
        assert!(decode_image(b"").is_err());
        assert!(decode_image(b"%PDF-1.7 not an image").is_err());
        // PNG signature with a truncated body
        assert!(decode_image(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0]).is_err());
    }

    #[test]
    fn test_content_type_check() {
        assert!(is_image_content_type(None));
        assert!(is_image_content_type(Some("image/jpeg")));
        assert!(is_image_content_type(Some("IMAGE/PNG")));
        assert!(!is_image_content_type(Some("text/plain")));
        assert!(!is_image_content_type(Some("application/octet-stream")));
        assert!(!is_image_content_type(Some("")));
    }

    #[test]
    fn test_bgr_frame_encodes_as_rgb() {
        // Pure blue in BGR order
        let frame = RenderedFrame {
            width: 16,
            height: 16,
            format: ColorFormat::Bgr,
            pixels: [255u8, 0, 0].repeat(16 * 16),
        };

        let jpeg = frame_to_jpeg(frame).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();

        let Rgb([r, g, b]) = *decoded.get_pixel(8, 8);
        assert!(b > 200 && r < 50 && g < 50, "Expected blue, got {:?}", (r, g, b));
    }

    #[test]
    fn test_jpeg_signature() {
        let jpeg = encode_jpeg(&RgbImage::new(8, 8), JPEG_QUALITY).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
