// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometric primitives behind a small capability trait: locating the sheet
// quadrilateral in an edge map, solving the perspective transform between two
// quadrilaterals, and fitting a minimum-area rotated rectangle.
//
// The pipeline stages only talk to `Geometry`, so they can be driven by
// synthetic geometry in tests or by another vision backend.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometric_transformations::Projection;
use imageproc::geometry::{approximate_polygon_dp, arc_length, contour_area, min_area_rect};
use imageproc::point::Point;
use tracing::debug;

/// A point in image coordinates (x right, y down).
pub type Point2 = (f32, f32);

/// Quadrilaterals enclosing less than this many square pixels cannot anchor
/// a perspective transform.
const MIN_QUAD_AREA: f64 = 1.0;

// -- Quadrilateral ------------------------------------------------------------

/// Four sheet corners in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub top_left: Point2,
    pub top_right: Point2,
    pub bottom_right: Point2,
    pub bottom_left: Point2,
}

impl Quad {
    /// Assign corners independently of the order the points arrive in.
    ///
    /// - top-left has the smallest `x + y`
    /// - bottom-right has the largest `x + y`
    /// - top-right has the smallest `y - x`
    /// - bottom-left has the largest `y - x`
    ///
    /// Ties keep the first candidate, so the result depends only on the point
    /// set for any non-degenerate sheet tilted less than 45 degrees.
    pub fn from_unordered(points: [Point2; 4]) -> Self {
        let pick = |key: fn(&Point2) -> f32, largest: bool| -> Point2 {
            let mut best = points[0];
            for p in &points[1..] {
                let better = if largest { key(p) > key(&best) } else { key(p) < key(&best) };
                if better {
                    best = *p;
                }
            }
            best
        };
        let sum = |p: &Point2| p.0 + p.1;
        let diff = |p: &Point2| p.1 - p.0;

        Self {
            top_left: pick(sum, false),
            bottom_right: pick(sum, true),
            top_right: pick(diff, false),
            bottom_left: pick(diff, true),
        }
    }

    /// Corners as `[top_left, top_right, bottom_right, bottom_left]`.
    pub fn to_array(&self) -> [Point2; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }

    /// Output size for an axis-aligned view of this quad: the longer of the
    /// two horizontal edges by the longer of the two vertical edges.
    pub fn output_size(&self) -> (u32, u32) {
        let width_bottom = distance(self.bottom_right, self.bottom_left) as u32;
        let width_top = distance(self.top_right, self.top_left) as u32;
        let height_right = distance(self.top_right, self.bottom_right) as u32;
        let height_left = distance(self.top_left, self.bottom_left) as u32;
        (width_bottom.max(width_top), height_right.max(height_left))
    }

    /// Enclosed area.
    pub fn area(&self) -> f64 {
        polygon_area(&self.to_array())
    }
}

fn distance(a: Point2, b: Point2) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

fn polygon_area(points: &[Point2]) -> f64 {
    let vertices: Vec<Point<f32>> = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
    contour_area(&vertices)
}

// -- Rotated rectangle --------------------------------------------------------

/// Minimum-area rectangle around a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub center: Point2,
    pub width: f32,
    pub height: f32,
    /// Rotation in degrees within `(-90, 0]`. An edge direction of `a` degrees
    /// (measured from +x towards +y, i.e. clockwise on screen) is reported as
    /// `-(a mod 90)`.
    pub angle: f64,
}

impl RotatedRect {
    /// Build from corners listed in order around the rectangle.
    ///
    /// The angle is read off the longer of the first two sides, which is the
    /// better conditioned one when corners sit on the pixel grid.
    pub fn from_corners(corners: [Point2; 4]) -> Self {
        let [a, b, c, _] = corners;
        let center = (
            corners.iter().map(|p| p.0).sum::<f32>() / 4.0,
            corners.iter().map(|p| p.1).sum::<f32>() / 4.0,
        );
        let width = distance(a, b);
        let height = distance(b, c);

        let (from, to) = if width >= height { (a, b) } else { (b, c) };
        let (dx, dy) = ((to.0 - from.0) as f64, (to.1 - from.1) as f64);
        let edge_degrees = if dx == 0.0 && dy == 0.0 {
            0.0
        } else {
            dy.atan2(dx).to_degrees().rem_euclid(90.0)
        };
        // rem_euclid can round up to exactly 90 for tiny negative inputs.
        let angle = if edge_degrees == 0.0 || edge_degrees >= 90.0 {
            0.0
        } else {
            -edge_degrees
        };

        Self {
            center,
            width,
            height,
            angle,
        }
    }
}

// -- Capability trait ---------------------------------------------------------

/// Vision primitives needed by the rectification and deskew stages.
pub trait Geometry {
    /// Find the outermost contour of largest area in a binary edge map and
    /// approximate it by a polygon with tolerance `epsilon_ratio` times its
    /// perimeter. Returns its corners when the polygon has exactly four.
    fn largest_quadrilateral(&self, edges: &GrayImage, epsilon_ratio: f64) -> Option<[Point2; 4]>;

    /// Projective transform mapping each `from[i]` onto `to[i]`, or `None`
    /// when either quadrilateral is degenerate.
    fn solve_perspective(&self, from: &[Point2; 4], to: &[Point2; 4]) -> Option<Projection>;

    /// Minimum-area enclosing rectangle of pixel positions, or `None` for an
    /// empty point set.
    fn min_area_rect(&self, points: &[Point<i32>]) -> Option<RotatedRect>;
}

/// `Geometry` backed by `imageproc` contours, polygon simplification,
/// control-point projections and rotating calipers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageprocGeometry;

impl Geometry for ImageprocGeometry {
    fn largest_quadrilateral(&self, edges: &GrayImage, epsilon_ratio: f64) -> Option<[Point2; 4]> {
        let contours = find_contours::<i32>(edges);

        let largest = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter(|c| c.points.len() >= 4)
            .map(|c| (contour_area(&c.points), c))
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, c)| c)?;

        let perimeter = arc_length(&largest.points, true);
        let epsilon = (epsilon_ratio * perimeter).max(1.0);
        let polygon = approximate_polygon_dp(&largest.points, epsilon, true);
        let vertices = merge_close_vertices(&polygon, epsilon);

        debug!(
            contour_points = largest.points.len(),
            perimeter,
            vertices = vertices.len(),
            "largest contour approximated"
        );

        match vertices.as_slice() {
            [a, b, c, d] => Some([*a, *b, *c, *d]),
            _ => None,
        }
    }

    fn solve_perspective(&self, from: &[Point2; 4], to: &[Point2; 4]) -> Option<Projection> {
        if polygon_area(from) < MIN_QUAD_AREA || polygon_area(to) < MIN_QUAD_AREA {
            debug!("degenerate quadrilateral; no perspective transform");
            return None;
        }
        Projection::from_control_points(*from, *to)
    }

    fn min_area_rect(&self, points: &[Point<i32>]) -> Option<RotatedRect> {
        if points.is_empty() {
            return None;
        }
        let corners = min_area_rect(points).map(|p| (p.x as f32, p.y as f32));
        Some(RotatedRect::from_corners(corners))
    }
}

/// Drop vertices lying within `epsilon` of their predecessor (including the
/// wrap-around from last to first), which appear when the trace starts
/// beside a corner.
fn merge_close_vertices(polygon: &[Point<i32>], epsilon: f64) -> Vec<Point2> {
    let mut merged: Vec<Point2> = Vec::with_capacity(polygon.len());
    for p in polygon {
        let point = (p.x as f32, p.y as f32);
        match merged.last() {
            Some(prev) if (distance(*prev, point) as f64) < epsilon => {}
            _ => merged.push(point),
        }
    }
    while merged.len() > 1 {
        let first = merged[0];
        let last = merged[merged.len() - 1];
        if (distance(first, last) as f64) < epsilon {
            merged.pop();
        } else {
            break;
        }
    }
    merged
}
