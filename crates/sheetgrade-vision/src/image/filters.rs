// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grayscale filters used by the rectification and binarization stages that
// imageproc does not offer in the required form: tiled contrast equalization
// (CLAHE), background flattening, min-max normalization and replicate-border
// rotation.

use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

/// Gaussian sigma equivalent to an odd `kernel`-sized box with automatic sigma.
///
/// Uses the conventional `0.3 * ((k - 1) / 2 - 1) + 0.8` rule so that a
/// 55-pixel kernel corresponds to sigma 8.6.
pub fn sigma_for_kernel(kernel: u32) -> f32 {
    let k = kernel.max(1) as f32;
    (0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8).max(0.1)
}

/// Blur with a Gaussian sized for an odd `kernel`.
pub fn gaussian_blur_kernel(gray: &GrayImage, kernel: u32) -> GrayImage {
    gaussian_blur_f32(gray, sigma_for_kernel(kernel))
}

// -- Contrast-limited adaptive histogram equalization ------------------------

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `tiles` x `tiles` grid. Each tile gets its own
/// equalization lookup table built from a histogram clipped at
/// `clip_limit` times the uniform bin height; the clipped excess is spread
/// evenly across all bins. Pixels are mapped by bilinear interpolation
/// between the four nearest tile tables, which removes block seams.
pub fn clahe(gray: &GrayImage, tiles: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let tile_w = width.div_ceil(tiles.clamp(1, width));
    let tile_h = height.div_ceil(tiles.clamp(1, height));
    // Recount so that no trailing tile is empty.
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];

    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);

            let mut histogram = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    histogram[gray.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            let area = (x1.saturating_sub(x0) * y1.saturating_sub(y0)).max(1);

            if clip_limit > 0.0 {
                let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
                let mut excess = 0u32;
                for bin in histogram.iter_mut() {
                    if *bin > limit {
                        excess += *bin - limit;
                        *bin = limit;
                    }
                }
                let bonus = excess / 256;
                let residual = (excess % 256) as usize;
                for (i, bin) in histogram.iter_mut().enumerate() {
                    *bin += bonus;
                    if i < residual {
                        *bin += 1;
                    }
                }
            }

            let lut = &mut luts[(ty * tiles_x + tx) as usize];
            let scale = 255.0 / area as f32;
            let mut cumulative = 0u32;
            for (value, count) in histogram.iter().enumerate() {
                cumulative += count;
                lut[value] = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    let mut output = GrayImage::new(width, height);
    for y in 0..height {
        // Position relative to tile centres.
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let ty0 = fy.floor().clamp(0.0, (tiles_y - 1) as f32) as u32;
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let wy = (fy - ty0 as f32).clamp(0.0, 1.0);

        for x in 0..width {
            let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
            let tx0 = fx.floor().clamp(0.0, (tiles_x - 1) as f32) as u32;
            let tx1 = (tx0 + 1).min(tiles_x - 1);
            let wx = (fx - tx0 as f32).clamp(0.0, 1.0);

            let value = gray.get_pixel(x, y).0[0] as usize;
            let lookup = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][value] as f32;

            let top = lookup(tx0, ty0) * (1.0 - wx) + lookup(tx1, ty0) * wx;
            let bottom = lookup(tx0, ty1) * (1.0 - wx) + lookup(tx1, ty1) * wx;
            let mapped = top * (1.0 - wy) + bottom * wy;
            output.put_pixel(x, y, Luma([mapped.round().clamp(0.0, 255.0) as u8]));
        }
    }

    output
}

// -- Illumination -------------------------------------------------------------

/// Stretch intensities linearly so the darkest pixel becomes 0 and the
/// brightest 255. A constant image maps to all zeros.
pub fn normalize_min_max(gray: &GrayImage) -> GrayImage {
    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));

    let mut output = GrayImage::new(gray.width(), gray.height());
    if max <= min {
        return output;
    }

    let scale = 255.0 / (max - min) as f32;
    for (src, dst) in gray.pixels().zip(output.pixels_mut()) {
        let stretched = (src.0[0] - min) as f32 * scale;
        *dst = Luma([stretched.round().clamp(0.0, 255.0) as u8]);
    }
    output
}

/// Remove slowly varying illumination.
///
/// A heavily blurred copy approximates the background lighting; it is
/// subtracted with saturation at zero and the result is stretched back to the
/// full intensity range.
pub fn flatten_background(gray: &GrayImage, kernel: u32) -> GrayImage {
    let background = gaussian_blur_kernel(gray, kernel);
    let mut difference = GrayImage::new(gray.width(), gray.height());
    for ((src, bg), dst) in gray
        .pixels()
        .zip(background.pixels())
        .zip(difference.pixels_mut())
    {
        *dst = Luma([src.0[0].saturating_sub(bg.0[0])]);
    }
    normalize_min_max(&difference)
}

// -- Rotation -----------------------------------------------------------------

/// Rotate about the image centre by `degrees` (positive is counter-clockwise
/// as displayed) keeping the canvas size.
///
/// Nearest-neighbour sampling keeps binary images binary, and samples that
/// fall outside the source are clamped to the nearest edge pixel instead of
/// being filled with a constant.
pub fn rotate_replicate(gray: &GrayImage, degrees: f64) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let cx = (width / 2) as f64;
    let cy = (height / 2) as f64;
    let max_x = (width - 1) as f64;
    let max_y = (height - 1) as f64;

    GrayImage::from_fn(width, height, |x, y| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        let sx = (cx + dx * cos - dy * sin).round().clamp(0.0, max_x) as u32;
        let sy = (cy + dx * sin + dy * cos).round().clamp(0.0, max_y) as u32;
        *gray.get_pixel(sx, sy)
    })
}
