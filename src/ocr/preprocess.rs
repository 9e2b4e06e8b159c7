use image::imageops::FilterType;
use image::{GrayImage, Luma, RgbImage};

use crate::calibration::PixelRect;
use crate::config::OcrConfig;

/// Crops a region given in absolute pixels, clamped to the image bounds.
///
/// A region entirely outside the image yields an empty image.
pub fn crop_region(img: &RgbImage, region: &PixelRect) -> RgbImage {
    let (w, h) = img.dimensions();
    let r = region.clamp_to(w, h);
    image::imageops::crop_imm(img, r.x, r.y, r.width, r.height).to_image()
}

/// Converts to grayscale with BT.601 luma weights (0.299, 0.587, 0.114).
pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000;
        output.put_pixel(x, y, Luma([luma as u8]));
    }

    output
}

/// Scales both dimensions by an integer factor with bilinear filtering.
pub fn upscale(img: &GrayImage, factor: u32) -> GrayImage {
    if factor <= 1 || img.width() == 0 || img.height() == 0 {
        return img.clone();
    }
    image::imageops::resize(
        img,
        img.width() * factor,
        img.height() * factor,
        FilterType::Triangle,
    )
}

/// Adaptive mean threshold, inverted binary output.
///
/// Each pixel is compared against the mean of its `block_size` x `block_size`
/// neighbourhood minus `offset`. Edge pixels are replicated outward so every
/// window is full size, and the mean is rounded to a whole grey level.
/// Pixels brighter than the threshold become black (0), the rest white (255),
/// so dark digits on a lit display come out white on black.
pub fn adaptive_threshold_mean_inv(img: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return output;
    }

    let (w, h) = (width as usize, height as usize);
    let radius = (block_size.max(1) / 2) as usize;
    let side = 2 * radius + 1;
    let raw = img.as_raw();

    // Summed-area table over the image padded by `radius` on every side
    let (pw, ph) = (w + 2 * radius, h + 2 * radius);
    let stride = pw + 1;
    let mut integral = vec![0u64; stride * (ph + 1)];
    for py in 0..ph {
        let sy = py.saturating_sub(radius).min(h - 1);
        let mut row_sum = 0u64;
        for px in 0..pw {
            let sx = px.saturating_sub(radius).min(w - 1);
            row_sum += raw[sy * w + sx] as u64;
            integral[(py + 1) * stride + px + 1] = integral[py * stride + px + 1] + row_sum;
        }
    }

    let count = (side * side) as f64;
    for y in 0..h {
        // Window rows y..y+side in padded coordinates are centred on image row y
        let (y0, y1) = (y, y + side);
        for x in 0..w {
            let (x0, x1) = (x, x + side);
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let mean = (sum as f64 / count).round_ties_even() as i32;

            let value = if raw[y * w + x] as i32 > mean - offset {
                0u8
            } else {
                255u8
            };
            output.put_pixel(x as u32, y as u32, Luma([value]));
        }
    }

    output
}

/// Full preprocessing chain for a cropped display region:
/// grayscale, upscale, adaptive inverted threshold.
pub fn prepare_for_ocr(crop: &RgbImage, config: &OcrConfig) -> GrayImage {
    let gray = to_grayscale(crop);
    let scaled = upscale(&gray, config.upscale);
    adaptive_threshold_mean_inv(&scaled, config.block_size, config.offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_crop_region() {
        let img = RgbImage::from_fn(100, 200, |x, y| Rgb([x as u8, y as u8, 0]));

        let cropped = crop_region(&img, &PixelRect::new(10, 50, 50, 20));

        assert_eq!(cropped.dimensions(), (50, 20));
        // Top-left pixel should be (10, 50) from original
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(0, 0)[1], 50);
    }

    #[test]
    fn test_crop_region_clamps() {
        let img = RgbImage::new(100, 100);
        let cropped = crop_region(&img, &PixelRect::new(90, 90, 50, 50));
        assert_eq!(cropped.dimensions(), (10, 10));

        let outside = crop_region(&img, &PixelRect::new(150, 10, 20, 20));
        assert_eq!(outside.dimensions(), (0, 20));
    }

    #[test]
    fn test_grayscale_weights() {
        let mut img = RgbImage::new(4, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(2, 0, Rgb([0, 0, 255]));
        img.put_pixel(3, 0, Rgb([255, 255, 255]));

        let gray = to_grayscale(&img);
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
        assert_eq!(gray.get_pixel(2, 0)[0], 29);
        assert_eq!(gray.get_pixel(3, 0)[0], 255);
    }

    #[test]
    fn test_upscale_doubles_dimensions() {
        let img = GrayImage::from_pixel(13, 7, Luma([90]));
        let scaled = upscale(&img, 2);
        assert_eq!(scaled.dimensions(), (26, 14));

        assert_eq!(upscale(&img, 1).dimensions(), (13, 7));
    }

    #[test]
    fn test_threshold_uniform_region_is_background() {
        let img = GrayImage::from_pixel(40, 40, Luma([180]));
        let binary = adaptive_threshold_mean_inv(&img, 31, 15);
        assert!(binary.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_threshold_dark_stroke_becomes_white() {
        // Bright display with a dark vertical stroke in the middle
        let img = GrayImage::from_fn(60, 30, |x, _| {
            if (28..32).contains(&x) {
                Luma([40])
            } else {
                Luma([210])
            }
        });

        let binary = adaptive_threshold_mean_inv(&img, 31, 15);
        assert_eq!(binary.get_pixel(30, 15)[0], 255, "stroke should be white");
        assert_eq!(binary.get_pixel(5, 15)[0], 0, "background should be black");
        assert_eq!(binary.get_pixel(55, 2)[0], 0, "background should be black");
    }

    #[test]
    fn test_threshold_replicates_edges() {
        // Left edge 100 next to 200: the replicated window mean is 133,
        // so 100 clears the 93 threshold and stays background
        let img = GrayImage::from_fn(8, 1, |x, _| if x == 0 { Luma([100]) } else { Luma([200]) });
        let binary = adaptive_threshold_mean_inv(&img, 3, 40);
        assert_eq!(binary.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_threshold_uses_rounded_mean() {
        // Window mean 99.67 rounds to 100; a pixel equal to it is not brighter
        let img = GrayImage::from_raw(3, 1, vec![99, 100, 100]).unwrap();
        let binary = adaptive_threshold_mean_inv(&img, 3, 0);
        assert_eq!(binary.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn test_threshold_empty_image() {
        let binary = adaptive_threshold_mean_inv(&GrayImage::new(0, 5), 31, 15);
        assert_eq!(binary.dimensions(), (0, 5));
    }

    #[test]
    fn test_prepare_for_ocr_upscales() {
        let crop = RgbImage::from_pixel(20, 10, Rgb([200, 200, 200]));
        let prepared = prepare_for_ocr(&crop, &OcrConfig::default());
        assert_eq!(prepared.dimensions(), (40, 20));
    }
}
