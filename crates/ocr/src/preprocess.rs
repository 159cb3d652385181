use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::io::Cursor;
use thiserror::Error;

/// Target width for OCR input. Receipts photographed at phone
/// resolution carry no extra information past this point, and
/// Tesseract slows down sharply on oversized pages.
const TARGET_WIDTH: u32 = 1500;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Process raw image bytes (JPEG / PNG / WEBP / …) into normalized PNG
/// bytes suitable for OCR. Deterministic; fails only on malformed
/// image input.
pub fn optimize_for_ocr(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    encode_as_png(normalize(img))
}

/// Grayscale + contrast stretch, downscaling wide images to the OCR
/// target width. Never enlarges.
fn normalize(img: DynamicImage) -> DynamicImage {
    let img = if img.width() > TARGET_WIDTH {
        let height =
            ((img.height() as u64 * TARGET_WIDTH as u64) / img.width() as u64).max(1) as u32;
        img.resize_exact(TARGET_WIDTH, height, image::imageops::FilterType::Lanczos3)
    } else {
        img
    };

    let gray: GrayImage = img.to_luma8();

    let (min_px, max_px) = gray
        .pixels()
        .fold((255u8, 0u8), |(mn, mx), p| (mn.min(p[0]), mx.max(p[0])));

    if max_px == min_px {
        // Uniform image, nothing to stretch.
        return DynamicImage::ImageLuma8(gray);
    }

    let range = (max_px - min_px) as u32;
    let stretched: GrayImage = ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0];
        let v = ((p - min_px) as u32 * 255 / range) as u8;
        Luma([v])
    });

    DynamicImage::ImageLuma8(stretched)
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_gray(width: u32, height: u32, value: u8) -> DynamicImage {
        let img: GrayImage = ImageBuffer::from_fn(width, height, |_, _| Luma([value]));
        DynamicImage::ImageLuma8(img)
    }

    fn gradient_gray(width: u32, height: u32) -> DynamicImage {
        let img: GrayImage =
            ImageBuffer::from_fn(width, height, |x, _| Luma([(x * 255 / width) as u8]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn normalize_uniform_image_is_stable() {
        let result = normalize(solid_gray(10, 10, 128));
        assert_eq!(result.width(), 10);
        assert_eq!(result.height(), 10);
    }

    #[test]
    fn normalize_gradient_stretches_to_full_range() {
        let result = normalize(gradient_gray(256, 1));
        let gray = result.to_luma8();
        let min = gray.pixels().map(|p| p[0]).min().unwrap();
        let max = gray.pixels().map(|p| p[0]).max().unwrap();
        assert_eq!(min, 0);
        assert_eq!(max, 255);
    }

    #[test]
    fn wide_image_is_downscaled_to_target() {
        let result = normalize(solid_gray(3000, 4000, 200));
        assert_eq!(result.width(), TARGET_WIDTH);
    }

    #[test]
    fn small_image_is_not_enlarged() {
        let result = normalize(solid_gray(400, 600, 200));
        assert_eq!(result.width(), 400);
        assert_eq!(result.height(), 600);
    }

    #[test]
    fn optimize_produces_png_header() {
        let mut png_bytes = Vec::new();
        solid_gray(4, 4, 100)
            .write_to(&mut Cursor::new(&mut png_bytes), image::ImageFormat::Png)
            .unwrap();
        let result = optimize_for_ocr(&png_bytes).unwrap();
        assert_eq!(&result[..4], b"\x89PNG");
    }

    #[test]
    fn optimize_rejects_malformed_input() {
        assert!(matches!(
            optimize_for_ocr(b"definitely not an image"),
            Err(PreprocessError::Load(_))
        ));
    }
}
