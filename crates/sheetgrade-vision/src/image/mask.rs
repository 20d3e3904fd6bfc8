// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binary ink mask: one boolean per pixel, `true` where ink was detected.

use std::ops::Range;

use image::{GrayImage, Luma};
use imageproc::point::Point;

/// Ink / not-ink matrix with the same dimensions as the image it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl BinaryMask {
    /// An all-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; width as usize * height as usize],
        }
    }

    /// Treat every non-zero pixel as ink.
    pub fn from_gray(gray: &GrayImage) -> Self {
        Self {
            width: gray.width(),
            height: gray.height(),
            pixels: gray.pixels().map(|p| p.0[0] != 0).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.pixels[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, ink: bool) {
        let idx = self.index(x, y);
        self.pixels[idx] = ink;
    }

    /// Mark every pixel of the rectangle `xs` x `ys` (clamped) as ink.
    pub fn fill(&mut self, xs: Range<u32>, ys: Range<u32>) {
        for y in ys.start..ys.end.min(self.height) {
            for x in xs.start..xs.end.min(self.width) {
                self.set(x, y, true);
            }
        }
    }

    /// Total number of ink pixels.
    pub fn foreground_count(&self) -> usize {
        self.pixels.iter().filter(|ink| **ink).count()
    }

    /// Number of ink pixels inside `xs` x `ys` (clamped to the mask).
    pub fn count_region(&self, xs: Range<u32>, ys: Range<u32>) -> u32 {
        let x_end = xs.end.min(self.width) as usize;
        let x_start = (xs.start as usize).min(x_end);
        let mut count = 0;
        for y in ys.start..ys.end.min(self.height) {
            let row = y as usize * self.width as usize;
            count += self.pixels[row + x_start..row + x_end]
                .iter()
                .filter(|ink| **ink)
                .count() as u32;
        }
        count
    }

    /// Leftmost and rightmost ink pixel of every row that has ink.
    ///
    /// The convex hull of these points equals the hull of all ink pixels.
    pub fn row_extremes(&self) -> Vec<Point<i32>> {
        let mut points = Vec::new();
        for y in 0..self.height {
            let row = y as usize * self.width as usize;
            let line = &self.pixels[row..row + self.width as usize];
            let first = line.iter().position(|ink| *ink);
            let last = line.iter().rposition(|ink| *ink);
            if let (Some(first), Some(last)) = (first, last) {
                points.push(Point::new(first as i32, y as i32));
                if last != first {
                    points.push(Point::new(last as i32, y as i32));
                }
            }
        }
        points
    }

    /// Render ink as 255 on a 0 background.
    pub fn to_gray(&self) -> GrayImage {
        self.render(255, 0)
    }

    /// Render with explicit ink and paper intensities.
    pub fn render(&self, ink: u8, paper: u8) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(x, y) { ink } else { paper }])
        })
    }
}
