use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};

use super::glyphs::draw_text;
use crate::log;
use crate::paths::pressure_crop_path;

pub const MONTAGE_FILE: &str = "pressure_montage.png";

const LABEL_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const LABEL_MARGIN: i64 = 4;

/// Puts the crops side by side, each scaled to the tallest height and
/// labelled with its angle in the top-left corner.
///
/// Returns `None` when there is nothing to show.
pub fn build_montage(crops: &[(u32, RgbImage)]) -> Option<RgbImage> {
    let max_h = crops
        .iter()
        .map(|(_, img)| img.height())
        .filter(|&h| h > 0)
        .max()?;

    let tiles: Vec<RgbImage> = crops
        .iter()
        .filter(|(_, img)| img.width() > 0 && img.height() > 0)
        .map(|(angle, img)| {
            let w = ((img.width() as u64 * max_h as u64) / img.height() as u64).max(1) as u32;
            let mut tile = if img.height() == max_h {
                img.clone()
            } else {
                image::imageops::resize(img, w, max_h, FilterType::Triangle)
            };
            let scale = (max_h / 24).clamp(1, 4);
            draw_text(
                &mut tile,
                LABEL_MARGIN,
                LABEL_MARGIN,
                &format!("{}°", angle),
                scale,
                LABEL_COLOR,
            );
            tile
        })
        .collect();

    let total_w: u32 = tiles.iter().map(|t| t.width()).sum();
    let mut montage = RgbImage::new(total_w, max_h);
    let mut x = 0i64;
    for tile in &tiles {
        image::imageops::replace(&mut montage, tile, x, 0);
        x += tile.width() as i64;
    }
    Some(montage)
}

/// Loads the saved crops for the given crossings (in order) and writes the
/// montage. Missing or unreadable crops are skipped.
///
/// Returns the montage path, or `None` if no crop was available.
pub fn write_montage(run_dir: &Path, angles: &[u32]) -> Result<Option<PathBuf>> {
    let crops: Vec<(u32, RgbImage)> = angles
        .iter()
        .filter_map(|&angle| {
            let path = pressure_crop_path(run_dir, angle);
            if !path.exists() {
                return None;
            }
            match image::open(&path) {
                Ok(img) => Some((angle, img.to_rgb8())),
                Err(e) => {
                    log(&format!("Skipping {} in montage: {}", path.display(), e));
                    None
                }
            }
        })
        .collect();

    let Some(montage) = build_montage(&crops) else {
        return Ok(None);
    };

    let path = run_dir.join(MONTAGE_FILE);
    montage
        .save(&path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_montage_scales_to_tallest() {
        let crops = vec![
            (0, RgbImage::from_pixel(40, 20, Rgb([10, 10, 10]))),
            (30, RgbImage::from_pixel(30, 40, Rgb([200, 200, 200]))),
        ];
        let montage = build_montage(&crops).unwrap();

        // First tile doubled to 80x40, second unchanged
        assert_eq!(montage.dimensions(), (110, 40));
        assert_eq!(*montage.get_pixel(100, 35), Rgb([200, 200, 200]));
    }

    #[test]
    fn test_montage_labels_tiles() {
        let crops = vec![(90, RgbImage::from_pixel(60, 30, Rgb([0, 0, 0])))];
        let montage = build_montage(&crops).unwrap();
        assert!(montage.pixels().any(|p| *p == LABEL_COLOR));
    }

    #[test]
    fn test_empty_montage() {
        assert!(build_montage(&[]).is_none());
    }

    #[test]
    fn test_write_montage_skips_missing_crops() {
        let dir = tempdir().unwrap();
        RgbImage::from_pixel(20, 10, Rgb([50, 50, 50]))
            .save(pressure_crop_path(dir.path(), 10))
            .unwrap();

        let path = write_montage(dir.path(), &[0, 10]).unwrap().unwrap();
        let montage = image::open(&path).unwrap().to_rgb8();
        assert_eq!(montage.dimensions(), (20, 10));
    }

    #[test]
    fn test_write_montage_without_crops() {
        let dir = tempdir().unwrap();
        assert!(write_montage(dir.path(), &[0, 10]).unwrap().is_none());
        assert!(!dir.path().join(MONTAGE_FILE).exists());
    }
}
