use image::{Rgb, RgbImage};

/// Sets a pixel if it lies inside the image; coordinates may be negative.
pub fn put_pixel_clipped(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, color);
    }
}

/// Draws a rectangle border on an image.
pub fn draw_rect(
    img: &mut RgbImage,
    x: i64,
    y: i64,
    w: u32,
    h: u32,
    color: Rgb<u8>,
    thickness: u32,
) {
    if w == 0 || h == 0 {
        return;
    }
    let (w, h) = (w as i64, h as i64);
    let t = (thickness.max(1) as i64).min(w.min(h));

    for d in 0..t {
        for dx in 0..w {
            // Top and bottom edges
            put_pixel_clipped(img, x + dx, y + d, color);
            put_pixel_clipped(img, x + dx, y + h - 1 - d, color);
        }
        for dy in 0..h {
            // Left and right edges
            put_pixel_clipped(img, x + d, y + dy, color);
            put_pixel_clipped(img, x + w - 1 - d, y + dy, color);
        }
    }
}

/// Draws a filled disc centred on (cx, cy).
pub fn fill_circle(img: &mut RgbImage, cx: i64, cy: i64, radius: u32, color: Rgb<u8>) {
    let r = radius as i64;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                put_pixel_clipped(img, cx + dx, cy + dy, color);
            }
        }
    }
}
