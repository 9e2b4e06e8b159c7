//! Tiny built-in bitmap font for marker and montage labels.
//!
//! Only digits, the degree sign and a minus are needed. Each glyph is 5x7;
//! row bits are read from bit 4 (left) to bit 0 (right).

use image::{Rgb, RgbImage};

use super::draw::put_pixel_clipped;

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
const GLYPH_GAP: u32 = 1;

fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '°' => [0b01100, 0b10010, 0b10010, 0b01100, 0b00000, 0b00000, 0b00000],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        _ => return None,
    };
    Some(rows)
}

/// Draws `text` with its top-left corner at (x, y). Unknown characters
/// leave a blank cell.
pub fn draw_text(img: &mut RgbImage, x: i64, y: i64, text: &str, scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1) as i64;
    let advance = (GLYPH_WIDTH + GLYPH_GAP) as i64 * scale;

    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            continue;
        };
        let origin_x = x + i as i64 * advance;

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH as i64 {
                if bits & (1 << (GLYPH_WIDTH as i64 - 1 - col)) == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        put_pixel_clipped(
                            img,
                            origin_x + col * scale + sx,
                            y + row as i64 * scale + sy,
                            color,
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

    #[test]
    fn test_draw_digit_one() {
        let mut img = RgbImage::from_pixel(10, 10, BLACK);
        draw_text(&mut img, 0, 0, "1", 1, GREEN);

        // Vertical stem in the middle column
        for y in 0..7 {
            assert_eq!(*img.get_pixel(2, y), GREEN, "row {}", y);
        }
        // Base spans three columns
        assert_eq!(*img.get_pixel(1, 6), GREEN);
        assert_eq!(*img.get_pixel(3, 6), GREEN);
        assert_eq!(*img.get_pixel(0, 0), BLACK);
    }

    #[test]
    fn test_draw_text_scaled() {
        let mut img = RgbImage::from_pixel(20, 20, BLACK);
        draw_text(&mut img, 0, 0, "-", 2, GREEN);
        // Row 3 at scale 2 covers y = 6..8
        assert_eq!(*img.get_pixel(0, 6), GREEN);
        assert_eq!(*img.get_pixel(9, 7), GREEN);
        assert_eq!(*img.get_pixel(0, 5), BLACK);
    }

    #[test]
    fn test_unknown_characters_are_blank() {
        let mut img = RgbImage::from_pixel(20, 10, BLACK);
        draw_text(&mut img, 0, 0, "x", 1, GREEN);
        assert!(img.pixels().all(|p| *p == BLACK));
    }
}
