//! Normalized cross-correlation template tracker.
//!
//! Keeps the grayscale patch selected on the first frame and, on every new
//! frame, slides it over a window around the previous position. The best
//! match wins if its correlation clears `min_score`; otherwise the target is
//! reported lost.

use anyhow::{anyhow, Result};
use image::{GrayImage, RgbImage};

use super::{BoundingBox, Tracker};
use crate::config::TrackerConfig;
use crate::ocr::preprocess::to_grayscale;

/// Template variance below this is treated as a flat, untrackable patch.
const MIN_TEMPLATE_NORM: f64 = 1e-3;

pub struct TemplateTracker {
    config: TrackerConfig,
    /// Template pixels minus their mean, row-major
    template: Vec<f64>,
    template_w: u32,
    template_h: u32,
    template_norm: f64,
    last: Option<(u32, u32)>,
}

impl TemplateTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            template: Vec::new(),
            template_w: 0,
            template_h: 0,
            template_norm: 0.0,
            last: None,
        }
    }

    fn current_box(&self) -> Option<BoundingBox> {
        self.last.map(|(x, y)| {
            BoundingBox::new(
                x as f64,
                y as f64,
                self.template_w as f64,
                self.template_h as f64,
            )
        })
    }
}

impl Tracker for TemplateTracker {
    fn init(&mut self, frame: &RgbImage, bbox: BoundingBox) -> Result<()> {
        let (w, h) = frame.dimensions();
        let x0 = bbox.x.max(0.0).round() as u32;
        let y0 = bbox.y.max(0.0).round() as u32;
        let x1 = ((bbox.x + bbox.width).round().max(0.0) as u32).min(w);
        let y1 = ((bbox.y + bbox.height).round().max(0.0) as u32).min(h);

        if x0 >= x1 || y0 >= y1 {
            return Err(anyhow!(
                "Tracking box ({:.0}, {:.0}, {:.0}x{:.0}) lies outside the {}x{} frame",
                bbox.x,
                bbox.y,
                bbox.width,
                bbox.height,
                w,
                h
            ));
        }

        let gray = to_grayscale(frame);
        let (tw, th) = (x1 - x0, y1 - y0);
        let mut pixels = Vec::with_capacity((tw * th) as usize);
        for y in y0..y1 {
            for x in x0..x1 {
                pixels.push(gray.get_pixel(x, y)[0] as f64);
            }
        }

        let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;
        let template: Vec<f64> = pixels.iter().map(|p| p - mean).collect();
        let norm = template.iter().map(|d| d * d).sum::<f64>().sqrt();

        if norm < MIN_TEMPLATE_NORM {
            return Err(anyhow!(
                "Tracking box has no contrast; select a region containing the tube tip"
            ));
        }

        self.template = template;
        self.template_w = tw;
        self.template_h = th;
        self.template_norm = norm;
        self.last = Some((x0, y0));
        Ok(())
    }

    fn update(&mut self, frame: &RgbImage) -> Option<BoundingBox> {
        let (last_x, last_y) = self.last?;
        let (w, h) = frame.dimensions();
        let (tw, th) = (self.template_w, self.template_h);
        if tw > w || th > h {
            return None;
        }

        let gray = to_grayscale(frame);
        let integrals = Integrals::new(&gray);
        let margin = self.config.search_margin;

        let x_min = last_x.saturating_sub(margin);
        let y_min = last_y.saturating_sub(margin);
        let x_max = last_x.saturating_add(margin).min(w - tw);
        let y_max = last_y.saturating_add(margin).min(h - th);

        let n = (tw * th) as f64;
        let mut best: Option<(f64, u32, u32)> = None;

        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let (sum, sum_sq) = integrals.window(x, y, tw, th);
                let variance = sum_sq - sum * sum / n;
                if variance <= 0.0 {
                    continue;
                }

                let cross = self.cross_term(&gray, x, y);
                let score = cross / (self.template_norm * variance.sqrt());

                let better = match best {
                    None => true,
                    Some((best_score, _, _)) => score > best_score,
                };
                if better {
                    best = Some((score, x, y));
                }
            }
        }

        match best {
            Some((score, x, y)) if score >= self.config.min_score as f64 => {
                self.last = Some((x, y));
                self.current_box()
            }
            _ => None,
        }
    }
}

impl TemplateTracker {
    /// Sum of template deviations times window pixels (template mean is zero).
    fn cross_term(&self, gray: &GrayImage, x: u32, y: u32) -> f64 {
        let raw = gray.as_raw();
        let stride = gray.width() as usize;
        let tw = self.template_w as usize;
        let mut total = 0.0;
        for row in 0..self.template_h as usize {
            let start = (y as usize + row) * stride + x as usize;
            let window_row = &raw[start..start + tw];
            let template_row = &self.template[row * tw..(row + 1) * tw];
            total += window_row
                .iter()
                .zip(template_row)
                .map(|(&p, &t)| p as f64 * t)
                .sum::<f64>();
        }
        total
    }
}

/// Summed-area tables of pixel values and squared pixel values.
struct Integrals {
    width: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl Integrals {
    fn new(gray: &GrayImage) -> Self {
        let (w, h) = (gray.width() as usize, gray.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0.0; stride * (h + 1)];
        let mut sum_sq = vec![0.0; stride * (h + 1)];
        let raw = gray.as_raw();

        for y in 0..h {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w {
                let v = raw[y * w + x] as f64;
                row_sum += v;
                row_sq += v * v;
                sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row_sum;
                sum_sq[(y + 1) * stride + x + 1] = sum_sq[y * stride + x + 1] + row_sq;
            }
        }

        Self {
            width: stride,
            sum,
            sum_sq,
        }
    }

    /// (sum, sum of squares) over the window at (x, y) of size w x h.
    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let s = self.width;
        let area = |table: &[f64]| {
            table[y1 * s + x1] - table[y0 * s + x1] - table[y1 * s + x0] + table[y0 * s + x0]
        };
        (area(&self.sum), area(&self.sum_sq))
    }
}
