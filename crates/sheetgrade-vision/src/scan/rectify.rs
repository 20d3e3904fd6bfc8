// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet rectification: lighting normalization, sheet boundary detection and
// perspective correction of a photographed answer sheet.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::bilateral_filter;
use imageproc::geometric_transformations::{Interpolation, warp_into};
use sheetgrade_core::config::RectifierConfig;
use sheetgrade_core::error::{Result, SheetgradeError};
use tracing::{debug, info, instrument, warn};

use crate::geometry::{Geometry, ImageprocGeometry, Quad};
use crate::image::filters::{clahe, flatten_background, gaussian_blur_kernel};

/// Output of the rectification stage.
#[derive(Debug, Clone)]
pub struct RectifiedSheet {
    /// Normalized grayscale view of the sheet, input to binarization.
    pub gray: GrayImage,
    /// Matching color view, kept for display only.
    pub color: RgbImage,
    /// Detected sheet corners in the source photo, when a warp was applied.
    pub corners: Option<Quad>,
}

impl RectifiedSheet {
    /// Whether a perspective correction was applied.
    pub fn warped(&self) -> bool {
        self.corners.is_some()
    }
}

/// Produces an upright, evenly lit view of the sheet in a photo.
#[derive(Debug, Clone, Default)]
pub struct Rectifier<G = ImageprocGeometry> {
    config: RectifierConfig,
    geometry: G,
}

impl Rectifier<ImageprocGeometry> {
    pub fn new(config: RectifierConfig) -> Self {
        Self {
            config,
            geometry: ImageprocGeometry,
        }
    }
}

impl<G: Geometry> Rectifier<G> {
    /// Use a custom geometry backend.
    pub fn with_geometry(config: RectifierConfig, geometry: G) -> Self {
        Self { config, geometry }
    }

    pub fn config(&self) -> &RectifierConfig {
        &self.config
    }

    // -- Pipeline -------------------------------------------------------------

    /// Run the full rectification:
    ///
    /// 1. Convert to grayscale
    /// 2-4. Normalize lighting (CLAHE, bilateral smoothing, background flattening)
    /// 5. Blur and detect edges
    /// 6. Take the largest outer contour and approximate it by a polygon
    /// 7. Order its four corners
    /// 8. Warp the color photo to an axis-aligned rectangle
    /// 9. Normalize the warped view again
    ///
    /// When no four-corner boundary is found the normalized, un-warped photo
    /// is returned instead.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn rectify(&self, image: &DynamicImage) -> Result<RectifiedSheet> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SheetgradeError::InvalidImage(format!(
                "image has zero area ({}x{})",
                image.width(),
                image.height()
            )));
        }

        let color = image.to_rgb8();
        let gray = image.to_luma8();
        let normalized = self.normalize(&gray);

        let Some(quad) = self.detect_sheet(&normalized) else {
            warn!("no four-corner sheet boundary found; using un-warped image");
            return Ok(RectifiedSheet {
                gray: normalized,
                color,
                corners: None,
            });
        };

        let Some(warped) = self.warp(&color, &quad) else {
            warn!("perspective transform could not be applied; using un-warped image");
            return Ok(RectifiedSheet {
                gray: normalized,
                color,
                corners: None,
            });
        };

        let warped_gray = image::imageops::grayscale(&warped);
        let gray = self.normalize(&warped_gray);

        info!(
            out_w = gray.width(),
            out_h = gray.height(),
            "sheet rectified"
        );

        Ok(RectifiedSheet {
            gray,
            color: warped,
            corners: Some(quad),
        })
    }

    // -- Stages ---------------------------------------------------------------

    /// Contrast equalization, edge-preserving smoothing and background
    /// flattening.
    pub fn normalize(&self, gray: &GrayImage) -> GrayImage {
        let c = &self.config;
        if gray.width() == 0 || gray.height() == 0 {
            return gray.clone();
        }
        let equalized = clahe(gray, c.clahe_tiles, c.clahe_clip_limit);
        let smoothed = bilateral_filter(
            &equalized,
            c.bilateral_diameter,
            c.bilateral_sigma_color,
            c.bilateral_sigma_space,
        );
        let flattened = flatten_background(&smoothed, c.background_kernel);
        debug!("lighting normalized");
        flattened
    }

    /// Locate the sheet boundary in a normalized image.
    pub fn detect_sheet(&self, normalized: &GrayImage) -> Option<Quad> {
        let c = &self.config;
        let blurred = gaussian_blur_kernel(normalized, c.edge_blur_kernel);
        let edges = canny(&blurred, c.canny_low, c.canny_high);

        let corners = self
            .geometry
            .largest_quadrilateral(&edges, c.polygon_epsilon_ratio)?;
        let quad = Quad::from_unordered(corners);

        debug!(
            top_left = ?quad.top_left,
            top_right = ?quad.top_right,
            bottom_right = ?quad.bottom_right,
            bottom_left = ?quad.bottom_left,
            area = quad.area(),
            "sheet corners detected"
        );
        Some(quad)
    }

    /// Warp `color` so that `quad` fills an axis-aligned rectangle sized by
    /// its longer opposing edges.
    pub fn warp(&self, color: &RgbImage, quad: &Quad) -> Option<RgbImage> {
        let (out_w, out_h) = quad.output_size();
        if out_w < 2 || out_h < 2 {
            debug!(out_w, out_h, "sheet quadrilateral too small to warp");
            return None;
        }

        let right = (out_w - 1) as f32;
        let bottom = (out_h - 1) as f32;
        let dest = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];

        let projection = self.geometry.solve_perspective(&quad.to_array(), &dest)?;

        let mut output = RgbImage::new(out_w, out_h);
        warp_into(
            color,
            &projection,
            Interpolation::Bilinear,
            Rgb([255u8, 255, 255]),
            &mut output,
        );
        Some(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point2, RotatedRect};
    use image::{GrayImage, Luma};
    use imageproc::geometric_transformations::Projection;
    use imageproc::point::Point;

    /// Geometry stub returning a fixed quadrilateral.
    struct FixedQuad(Option<[Point2; 4]>);

    impl Geometry for FixedQuad {
        fn largest_quadrilateral(&self, _: &GrayImage, _: f64) -> Option<[Point2; 4]> {
            self.0
        }

        fn solve_perspective(&self, from: &[Point2; 4], to: &[Point2; 4]) -> Option<Projection> {
            ImageprocGeometry.solve_perspective(from, to)
        }

        fn min_area_rect(&self, points: &[Point<i32>]) -> Option<RotatedRect> {
            ImageprocGeometry.min_area_rect(points)
        }
    }

    fn small_config() -> RectifierConfig {
        RectifierConfig {
            background_kernel: 15,
            ..RectifierConfig::default()
        }
    }

    #[test]
    fn zero_sized_image_is_invalid() {
        let rectifier = Rectifier::new(RectifierConfig::default());
        let err = rectifier
            .rectify(&DynamicImage::new_rgb8(0, 10))
            .unwrap_err();
        assert!(matches!(err, SheetgradeError::InvalidImage(_)));
    }

    /// A uniform image has no edges, so the fallback keeps its dimensions.
    #[test]
    fn blank_image_falls_back_unwarped() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(120, 160, Luma([200u8])));
        let sheet = Rectifier::new(small_config()).rectify(&img).unwrap();
        assert!(!sheet.warped());
        assert_eq!(sheet.gray.dimensions(), (120, 160));
        assert_eq!(sheet.color.dimensions(), (120, 160));
    }

    #[test]
    fn stub_quad_drives_output_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 240, Rgb([220, 220, 220])));
        let quad = [(150.0, 20.0), (20.0, 10.0), (160.0, 210.0), (10.0, 200.0)];
        let rectifier = Rectifier::with_geometry(small_config(), FixedQuad(Some(quad)));
        let sheet = rectifier.rectify(&img).unwrap();

        let expected = Quad::from_unordered(quad).output_size();
        assert!(sheet.warped());
        assert_eq!(sheet.gray.dimensions(), expected);
        assert_eq!(sheet.color.dimensions(), expected);
    }

    #[test]
    fn degenerate_stub_quad_falls_back() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 50, Rgb([220, 220, 220])));
        let quad = [(10.0, 10.0), (10.5, 10.0), (10.5, 10.5), (10.0, 10.5)];
        let rectifier = Rectifier::with_geometry(small_config(), FixedQuad(Some(quad)));
        let sheet = rectifier.rectify(&img).unwrap();
        assert!(!sheet.warped());
        assert_eq!(sheet.gray.dimensions(), (50, 50));
    }

    #[test]
    fn normalize_is_near_fixed_point_on_flat_sheet() {
        let rectifier = Rectifier::new(small_config());
        let once = rectifier.normalize(&GrayImage::from_pixel(64, 64, Luma([180u8])));
        let twice = rectifier.normalize(&once);
        assert_eq!(once, twice);
    }

    /// Light sheet with the given corners on a dark table.
    fn photo_of_sheet(width: u32, height: u32, corners: [Point2; 4]) -> RgbImage {
        let inside = |x: f32, y: f32| {
            (0..4).all(|i| {
                let a = corners[i];
                let b = corners[(i + 1) % 4];
                (b.0 - a.0) * (y - a.1) - (b.1 - a.1) * (x - a.0) >= 0.0
            })
        };
        RgbImage::from_fn(width, height, |x, y| {
            if inside(x as f32, y as f32) { Rgb([235, 235, 230]) } else { Rgb([40, 35, 30]) }
        })
    }

    #[test]
    fn tilted_sheet_is_found_and_warped() {
        let drawn = Quad::from_unordered([(40.0, 30.0), (260.0, 50.0), (250.0, 330.0), (30.0, 310.0)]);
        let img = photo_of_sheet(300, 360, drawn.to_array());

        let sheet = Rectifier::new(RectifierConfig::default())
            .rectify(&DynamicImage::ImageRgb8(img))
            .unwrap();
        assert!(sheet.warped(), "sheet boundary not detected");

        let found = sheet.corners.expect("corners of a warped sheet");
        for (got, want) in found.to_array().iter().zip(drawn.to_array().iter()) {
            let offset = (got.0 - want.0).hypot(got.1 - want.1);
            assert!(offset < 5.0, "corner {got:?} is {offset:.1}px from {want:?}");
        }
        assert_eq!(sheet.gray.dimensions(), found.output_size());
        assert_eq!(sheet.color.dimensions(), found.output_size());

        // The warped view is almost entirely paper.
        let (w, h) = sheet.color.dimensions();
        let light = sheet.color.pixels().filter(|p| p.0[0] > 150).count();
        assert!(light * 10 > (w * h) as usize * 9, "{light} light pixels of {}", w * h);
    }

    #[test]
    fn rectifying_a_rectified_sheet_changes_little() {
        let drawn = [(40.0, 30.0), (260.0, 50.0), (250.0, 330.0), (30.0, 310.0)];
        let rectifier = Rectifier::new(RectifierConfig::default());
        let first = rectifier
            .rectify(&DynamicImage::ImageRgb8(photo_of_sheet(300, 360, drawn)))
            .unwrap();
        let second = rectifier
            .rectify(&DynamicImage::ImageRgb8(first.color.clone()))
            .unwrap();

        let (w1, h1) = first.color.dimensions();
        let (w2, h2) = second.color.dimensions();
        assert!(w1.abs_diff(w2) <= 6 && h1.abs_diff(h2) <= 6, "{w1}x{h1} became {w2}x{h2}");

        let light = second.color.pixels().filter(|p| p.0[0] > 150).count();
        assert!(light * 10 > (w2 * h2) as usize * 9);
    }
}
