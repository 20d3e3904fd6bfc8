// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binarization: turn a rectified grayscale sheet into an ink mask using adaptive
// local-mean thresholding, morphological cleanup, residual skew removal and
// optional sharpening.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::sharpen3x3;
use imageproc::morphology::{close, open};
use sheetgrade_core::config::BinarizerConfig;
use tracing::{debug, info, instrument, warn};

use crate::geometry::{Geometry, ImageprocGeometry};
use crate::image::filters::rotate_replicate;
use crate::image::mask::BinaryMask;

/// Extracts filled bubbles from a rectified sheet.
#[derive(Debug, Clone, Default)]
pub struct Binarizer<G = ImageprocGeometry> {
    config: BinarizerConfig,
    geometry: G,
}

impl Binarizer<ImageprocGeometry> {
    pub fn new(config: BinarizerConfig) -> Self {
        Self {
            config,
            geometry: ImageprocGeometry,
        }
    }
}

impl<G: Geometry> Binarizer<G> {
    /// Use a custom geometry backend.
    pub fn with_geometry(config: BinarizerConfig, geometry: G) -> Self {
        Self { config, geometry }
    }

    pub fn config(&self) -> &BinarizerConfig {
        &self.config
    }

    /// Produce the ink mask for `gray`. The mask has the same dimensions.
    #[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
    pub fn binarize(&self, gray: &GrayImage) -> BinaryMask {
        let c = &self.config;

        let thresholded = threshold_mean_inverted(gray, c.block_size / 2, c.offset);
        let cleaned = self.clean(&thresholded);

        let deskewed = if c.deskew {
            match self.estimate_skew(&cleaned) {
                Some(angle) if angle.abs() >= c.min_skew_degrees => {
                    info!(angle, "correcting residual skew");
                    rotate_replicate(&cleaned, angle)
                }
                Some(angle) => {
                    debug!(angle, "skew below correction threshold");
                    cleaned
                }
                None => {
                    warn!("blank mask; skew estimation skipped");
                    cleaned
                }
            }
        } else {
            cleaned
        };

        let finished = if c.sharpen { sharpen3x3(&deskewed) } else { deskewed };
        let mask = BinaryMask::from_gray(&finished);
        debug!(ink_pixels = mask.foreground_count(), "binarization complete");
        mask
    }

    /// Morphological closing (fills gaps inside bubble fills) followed by
    /// opening (removes isolated specks).
    pub fn clean(&self, binary: &GrayImage) -> GrayImage {
        let c = &self.config;
        let radius = c.kernel_size / 2;
        let close_k = morphology_radius(radius * c.close_iterations);
        let open_k = morphology_radius(radius * c.open_iterations);

        let closed = if close_k > 0 {
            close(binary, Norm::LInf, close_k)
        } else {
            binary.clone()
        };
        if open_k > 0 {
            open(&closed, Norm::LInf, open_k)
        } else {
            closed
        }
    }

    /// Rotation in degrees (counter-clockwise positive, within `(-45, 45]`)
    /// that levels the ink, or `None` when there is no ink at all.
    ///
    /// The minimum-area rectangle around every ink pixel gives a raw angle
    /// `a` in `(-90, 0]`; angles below -45 are folded to `-(90 + a)`, the rest
    /// become `-a`.
    pub fn estimate_skew(&self, binary: &GrayImage) -> Option<f64> {
        let points = BinaryMask::from_gray(binary).row_extremes();
        if points.is_empty() {
            return None;
        }
        let rect = self.geometry.min_area_rect(&points)?;
        let raw = rect.angle;
        let angle = if raw < -45.0 { -(90.0 + raw) } else { -raw };
        debug!(raw, angle, "skew estimated");
        Some(angle)
    }
}

fn morphology_radius(k: u32) -> u8 {
    k.min(u8::MAX as u32) as u8
}

/// Inverted adaptive threshold on the local mean.
///
/// For each pixel the threshold is the mean intensity within a
/// `block_radius` neighbourhood (clamped at the borders) minus `offset`.
/// Pixels at or below the threshold are ink (255); the rest become 0.
pub fn threshold_mean_inverted(gray: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let sums = IntegralImage::new(gray);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let threshold = sums.window_mean(x, y, block_radius) - f64::from(offset);
        let ink = f64::from(gray.get_pixel(x, y).0[0]) <= threshold;
        Luma([if ink { 255u8 } else { 0 }])
    })
}

// -- Summed-area table ---------------------------------------------------------

/// Summed-area table with a zero first row and column, so entry
/// `(x, y)` holds the sum of all pixels strictly above and left of it.
struct IntegralImage {
    width: u32,
    height: u32,
    sums: Vec<u64>,
}

impl IntegralImage {
    fn new(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let stride = width as usize + 1;
        let mut sums = vec![0u64; stride * (height as usize + 1)];

        for (y, row) in gray.rows().enumerate() {
            let mut running = 0u64;
            for (x, pixel) in row.enumerate() {
                running += u64::from(pixel.0[0]);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + running;
            }
        }

        Self { width, height, sums }
    }

    fn at(&self, x: usize, y: usize) -> u64 {
        self.sums[y * (self.width as usize + 1) + x]
    }

    /// Mean over the square window of `radius` around `(cx, cy)`, cropped to
    /// the image.
    fn window_mean(&self, cx: u32, cy: u32, radius: u32) -> f64 {
        let x0 = cx.saturating_sub(radius) as usize;
        let y0 = cy.saturating_sub(radius) as usize;
        let x1 = cx.saturating_add(radius + 1).min(self.width) as usize;
        let y1 = cy.saturating_add(radius + 1).min(self.height) as usize;

        let count = ((x1 - x0) * (y1 - y0)) as f64;
        let total = self.at(x1, y1) + self.at(x0, y0) - self.at(x1, y0) - self.at(x0, y1);
        total as f64 / count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER: u8 = 235;
    const INK: u8 = 20;

    /// White sheet with a 4px dark frame and 20x16 marks centred in chosen
    /// 50x34 cells of a 4-column grid.
    fn crisp_sheet(rows: u32, marks: &[Option<u32>]) -> GrayImage {
        let (cell_w, cell_h) = (50u32, 34u32);
        let (w, h) = (4 * cell_w, rows * cell_h);
        let mut img = GrayImage::from_pixel(w, h, Luma([PAPER]));
        for y in 0..h {
            for x in 0..w {
                if x < 4 || y < 4 || x >= w - 4 || y >= h - 4 {
                    img.put_pixel(x, y, Luma([INK]));
                }
            }
        }
        for (row, mark) in marks.iter().enumerate() {
            let Some(col) = mark else { continue };
            let x0 = col * cell_w + 15;
            let y0 = row as u32 * cell_h + 9;
            for y in y0..y0 + 16 {
                for x in x0..x0 + 20 {
                    img.put_pixel(x, y, Luma([INK]));
                }
            }
        }
        img
    }

    fn mismatch(a: &BinaryMask, b: &BinaryMask) -> usize {
        let (w, h) = a.dimensions();
        (0..h)
            .flat_map(|y| (0..w).map(move |x| (x, y)))
            .filter(|&(x, y)| a.get(x, y) != b.get(x, y))
            .count()
    }

    #[test]
    fn threshold_flags_dark_marks_only() {
        let img = crisp_sheet(2, &[Some(1), None]);
        let out = threshold_mean_inverted(&img, 12, 15);
        assert_eq!(out.get_pixel(75, 17).0[0], 255, "mark centre");
        assert_eq!(out.get_pixel(0, 0).0[0], 255, "frame corner");
        assert_eq!(out.get_pixel(100, 50).0[0], 0, "paper");
        assert_eq!(out.get_pixel(5, 5).0[0], 0, "paper beside frame");
    }

    #[test]
    fn window_mean_is_cropped_at_borders() {
        let img = GrayImage::from_fn(4, 4, |x, y| Luma([(x + 4 * y) as u8]));
        let sums = IntegralImage::new(&img);
        // Full 3x3 window around (1, 1): values 0,1,2,4,5,6,8,9,10.
        assert_eq!(sums.window_mean(1, 1, 1), 5.0);
        // Corner window keeps only (0,0),(1,0),(0,1),(1,1).
        assert_eq!(sums.window_mean(0, 0, 1), 2.5);
    }

    #[test]
    fn flat_image_has_no_ink() {
        let img = GrayImage::from_pixel(40, 40, Luma([128u8]));
        let out = threshold_mean_inverted(&img, 12, 15);
        assert!(out.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn opening_removes_specks_and_closing_fills_pinholes() {
        let mut img = GrayImage::new(40, 40);
        for y in 10..30 {
            for x in 10..30 {
                img.put_pixel(x, y, Luma([255u8]));
            }
        }
        img.put_pixel(20, 20, Luma([0u8])); // pinhole
        img.put_pixel(2, 2, Luma([255u8])); // speck

        let cleaned = Binarizer::new(BinarizerConfig::default()).clean(&img);
        assert_eq!(cleaned.get_pixel(20, 20).0[0], 255);
        assert_eq!(cleaned.get_pixel(2, 2).0[0], 0);
    }

    #[test]
    fn binarize_keeps_dimensions_and_marks() {
        let marks = [Some(2), Some(0), None, Some(3)];
        let img = crisp_sheet(4, &marks);
        let mask = Binarizer::new(BinarizerConfig::default()).binarize(&img);
        assert_eq!(mask.dimensions(), img.dimensions());
        assert!(mask.get(125, 17), "row 0 mark");
        assert!(mask.get(25, 51), "row 1 mark");
        assert!(!mask.get(125, 85), "row 2 blank");
        assert_eq!(mask.count_region(65..85, 43..59), 0, "unmarked bubble stays clean");
    }

    #[test]
    fn sharpening_leaves_binary_images_unchanged() {
        let img = GrayImage::from_fn(20, 20, |x, y| {
            Luma([if (5..15).contains(&x) && (5..15).contains(&y) { 255u8 } else { 0 }])
        });
        assert_eq!(sharpen3x3(&img), img);
    }

    #[test]
    fn blank_image_skips_skew_estimation() {
        let img = GrayImage::from_pixel(60, 60, Luma([200u8]));
        let binarizer = Binarizer::new(BinarizerConfig::default());
        assert!(binarizer.estimate_skew(&GrayImage::new(60, 60)).is_none());
        let mask = binarizer.binarize(&img);
        assert_eq!(mask.dimensions(), (60, 60));
        assert_eq!(mask.foreground_count(), 0);
    }

    #[test]
    fn skew_of_clockwise_tilted_block_is_positive() {
        // Solid block rotated 6 degrees clockwise on screen.
        let theta = 6f64.to_radians();
        let (s, c) = theta.sin_cos();
        let img = GrayImage::from_fn(200, 200, |x, y| {
            let dx = x as f64 - 100.0;
            let dy = y as f64 - 100.0;
            let u = dx * c + dy * s;
            let v = -dx * s + dy * c;
            Luma([if u.abs() <= 70.0 && v.abs() <= 40.0 { 255u8 } else { 0 }])
        });
        let angle = Binarizer::new(BinarizerConfig::default())
            .estimate_skew(&img)
            .expect("ink present");
        assert!((angle - 6.0).abs() < 1.0, "angle {angle}");

        let levelled = rotate_replicate(&img, angle);
        let residual = Binarizer::new(BinarizerConfig::default())
            .estimate_skew(&levelled)
            .expect("ink present");
        assert!(residual.abs() < 1.5, "residual {residual}");
    }

    #[test]
    fn binarize_is_near_fixed_point_on_its_own_output() {
        let img = crisp_sheet(4, &[Some(1), Some(3), None, Some(0)]);
        let binarizer = Binarizer::new(BinarizerConfig::default());
        let first = binarizer.binarize(&img);
        let second = binarizer.binarize(&first.render(0, 255));
        let total = (first.width() * first.height()) as usize;
        assert!(mismatch(&first, &second) * 100 < total, "masks diverged");
    }
}
