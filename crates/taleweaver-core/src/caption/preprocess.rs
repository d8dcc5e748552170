//! Image preprocessing for the BLIP vision encoder.
//!
//! BLIP base expects:
//! - Input size: 384×384 pixels, bicubic resampling
//! - Rescale to [0, 1], then normalize with the CLIP per-channel mean/std
//! - Channel order: RGB
//! - Tensor layout: NCHW [batch, channels, height, width]

use image::DynamicImage;
use ndarray::Array4;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// CLIP normalization mean (per-channel, RGB).
const NORM_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std (per-channel, RGB).
const NORM_STD: [f32; 3] = [0.268_629_54, 0.261_302_6, 0.275_777_1];

/// Preprocess an image for BLIP inference.
///
/// Resizes to `image_size × image_size` (aspect ratio is not preserved),
/// converts to RGB, normalizes, and returns an NCHW tensor.
pub fn preprocess(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let resized = image.resize_exact(
        image_size,
        image_size,
        image::imageops::FilterType::CatmullRom,
    );
    let rgb = resized.to_rgb8();

    let size = image_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..CHANNELS {
            let scaled = pixel.0[c] as f32 / 255.0;
            tensor[[0, c, y, x]] = (scaled - NORM_MEAN[c]) / NORM_STD[c];
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    #[test]
    fn test_preprocess_shape_384() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let tensor = preprocess(&img, 384);
        assert_eq!(tensor.shape(), &[1, 3, 384, 384]);
    }

    #[test]
    fn test_preprocess_custom_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(10, 30));
        let tensor = preprocess(&img, 32);
        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
    }

    #[test]
    fn test_preprocess_normalization_per_channel() {
        // White image: (1.0 - mean[c]) / std[c]
        let img =
            DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255])));
        let tensor = preprocess(&img, 16);
        for c in 0..CHANNELS {
            let expected = (1.0 - NORM_MEAN[c]) / NORM_STD[c];
            assert!((tensor[[0, c, 5, 5]] - expected).abs() < 1e-3);
        }

        // Black image: -mean[c] / std[c]
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0])));
        let tensor = preprocess(&img, 16);
        for c in 0..CHANNELS {
            let expected = -NORM_MEAN[c] / NORM_STD[c];
            assert!((tensor[[0, c, 0, 0]] - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn test_preprocess_keeps_channel_order() {
        // Pure red: channel 0 high, channels 1 and 2 at their minimum.
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0])));
        let tensor = preprocess(&img, 4);
        assert!(tensor[[0, 0, 2, 2]] > 1.0);
        assert!(tensor[[0, 1, 2, 2]] < -1.0);
        assert!(tensor[[0, 2, 2, 2]] < -1.0);
    }
}
