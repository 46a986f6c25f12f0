//! OCR 전처리.
//!
//! 회색조 변환, 작은 이미지 2배 확대, 명암 늘리기 후 PNG로 다시 인코딩합니다.

use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};

use bcra_core::{BcraError, BcraResult};

/// 이보다 좁은 이미지는 2배 확대
pub const UPSCALE_BELOW_WIDTH: u32 = 1600;

/// 명암 범위를 0..=255로 늘립니다.
fn stretch_contrast(gray: &mut GrayImage) {
    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if max <= min {
        return;
    }

    let range = f32::from(max - min);
    for pixel in gray.pixels_mut() {
        let v = f32::from(pixel.0[0] - min) * 255.0 / range;
        pixel.0[0] = v.round().clamp(0.0, 255.0) as u8;
    }
}

/// 이미지를 OCR에 맞게 변환해 PNG 바이트로 반환합니다.
pub fn prepare_for_ocr(bytes: &[u8]) -> BcraResult<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| BcraError::Recognition(format!("이미지 디코딩 실패: {}", e)))?;

    let img = if img.width() < UPSCALE_BELOW_WIDTH {
        img.resize(img.width() * 2, img.height() * 2, FilterType::CatmullRom)
    } else {
        img
    };

    let mut gray = img.to_luma8();
    stretch_contrast(&mut gray);

    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_with_encoder(PngEncoder::new(&mut buf))
        .map_err(|e| BcraError::Recognition(format!("PNG 인코딩 실패: {}", e)))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn make_png(width: u32, height: u32) -> Vec<u8> {
        let mut img = RgbImage::new(width, height);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            // 100..=150 범위의 좁은 명암
            let v = if x % 2 == 0 { 100 } else { 150 };
            *pixel = Rgb([v, v, v]);
        }
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_with_encoder(PngEncoder::new(&mut buf))
            .unwrap();
        buf
    }

    #[test]
    fn test_small_image_is_upscaled_and_stretched() {
        let out = prepare_for_ocr(&make_png(40, 20)).unwrap();
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!(img.dimensions(), (80, 40));

        let gray = img.to_luma8();
        let min = gray.pixels().map(|p| p.0[0]).min().unwrap();
        let max = gray.pixels().map(|p| p.0[0]).max().unwrap();
        assert_eq!((min, max), (0, 255));
    }

    #[test]
    fn test_large_image_keeps_size() {
        let out = prepare_for_ocr(&make_png(1600, 2)).unwrap();
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!(img.dimensions(), (1600, 2));
    }

    #[test]
    fn test_undecodable_image() {
        let err = prepare_for_ocr(b"<html>not an image</html>").unwrap_err();
        assert!(matches!(err, BcraError::Recognition(_)));
    }
}
