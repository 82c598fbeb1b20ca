// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour extraction and the geometry derived from a single contour:
// bounding box, enclosed area, perimeter, polygon approximation, and the
// skew angle of its minimum-area enclosing rectangle.

use image::GrayImage;
use image::imageops::replace;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::{approximate_polygon_dp, arc_length, min_area_rect};
use imageproc::point::Point as PixelPoint;
use sheetgrade_core::types::{BoundingBox, Point};

/// Closed boundary of one connected foreground region.
#[derive(Debug, Clone, PartialEq)]
pub struct CellContour {
    points: Vec<PixelPoint<i32>>,
    bbox: BoundingBox,
}

impl CellContour {
    /// Wrap a traced boundary. Returns `None` for an empty point list.
    pub fn new(points: Vec<PixelPoint<i32>>) -> Option<Self> {
        let bbox = BoundingBox::enclosing(points.iter().map(|p| Point::new(p.x, p.y)))?;
        Some(Self { points, bbox })
    }

    /// Rectangular outline whose bounding box is exactly `(x, y, width, height)`.
    ///
    /// `width` and `height` must be at least 1.
    pub fn rectangle(x: i32, y: i32, width: u32, height: u32) -> Self {
        let (right, bottom) = (x + width.max(1) as i32 - 1, y + height.max(1) as i32 - 1);
        let points = vec![
            PixelPoint::new(x, y),
            PixelPoint::new(right, y),
            PixelPoint::new(right, bottom),
            PixelPoint::new(x, bottom),
        ];
        Self {
            points,
            bbox: BoundingBox::new(x, y, width.max(1), height.max(1)),
        }
    }

    pub fn points(&self) -> &[PixelPoint<i32>] {
        &self.points
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Center of the bounding box.
    pub fn center(&self) -> Point {
        self.bbox.center()
    }

    /// Area enclosed by the boundary polygon (shoelace formula).
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut twice_area: i64 = 0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            twice_area += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
        }
        twice_area.abs() as f64 / 2.0
    }

    /// Length of the closed boundary.
    pub fn perimeter(&self) -> f64 {
        arc_length(&self.points, true)
    }

    /// Douglas-Peucker approximation with a tolerance of
    /// `epsilon_fraction * perimeter`.
    ///
    /// The closed boundary is split at the point farthest from its first
    /// point and each half is simplified as an open chain, so the result
    /// never depends on where tracing happened to start and end.
    pub fn approximate(&self, epsilon_fraction: f64) -> Vec<(f32, f32)> {
        let epsilon = epsilon_fraction * self.perimeter();
        if self.points.len() < 3 || !(epsilon > 0.0) {
            let mut points = self.points.clone();
            points.dedup();
            return points.into_iter().map(|p| (p.x as f32, p.y as f32)).collect();
        }

        let first = self.points[0];
        let far = self
            .points
            .iter()
            .enumerate()
            .fold((0usize, 0i64), |(best, best_d), (i, p)| {
                let (dx, dy) = ((p.x - first.x) as i64, (p.y - first.y) as i64);
                let d = dx * dx + dy * dy;
                if d > best_d { (i, d) } else { (best, best_d) }
            })
            .0;
        if far == 0 {
            return vec![(first.x as f32, first.y as f32)];
        }

        let head = approximate_polygon_dp(&self.points[..=far], epsilon, false);
        let mut tail_chain = self.points[far..].to_vec();
        tail_chain.push(first);
        let tail = approximate_polygon_dp(&tail_chain, epsilon, false);

        let mut approx = head;
        // The tail starts at the split point and ends back at the first point.
        approx.extend(tail.iter().skip(1).take(tail.len().saturating_sub(2)));
        approx.dedup();
        approx.into_iter().map(|p| (p.x as f32, p.y as f32)).collect()
    }

    /// Angle in degrees, in `[0, 90)`, of the minimum-area enclosing
    /// rectangle, measured counter-clockwise as seen on screen.
    ///
    /// An upright rectangle reports 0; content turned clockwise by a small
    /// angle `a` reports `90 - a`.
    pub fn min_area_angle(&self) -> f32 {
        if self.points.len() < 3 || self.area() == 0.0 {
            return 0.0;
        }
        let corners = min_area_rect(&self.points);
        let (mut dx, mut dy) = (corners[1].x - corners[0].x, corners[1].y - corners[0].y);
        if dx == 0 && dy == 0 {
            dx = corners[2].x - corners[1].x;
            dy = corners[2].y - corners[1].y;
        }
        if dx == 0 && dy == 0 {
            return 0.0;
        }
        // Image y grows downwards; negate so positive means counter-clockwise.
        let degrees = (-(dy as f32)).atan2(dx as f32).to_degrees();
        let angle = degrees.rem_euclid(90.0);
        if angle >= 90.0 { 0.0 } else { angle }
    }
}

/// Outermost contours of the foreground (non-zero) regions of `binary`.
///
/// Holes and regions nested inside other regions are skipped. Pixels outside
/// the image count as background, so regions touching the frame are traced
/// like any other.
pub fn external_contours(binary: &GrayImage) -> Vec<CellContour> {
    // `find_contours` never starts an outer border in column 0.
    let mut padded = GrayImage::new(binary.width() + 2, binary.height() + 2);
    replace(&mut padded, binary, 1, 1);

    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| {
            let points = c
                .points
                .into_iter()
                .map(|p| PixelPoint::new(p.x - 1, p.y - 1))
                .collect();
            CellContour::new(points)
        })
        .collect()
}

/// The contour enclosing the largest area; the first one wins ties.
pub fn largest(contours: &[CellContour]) -> Option<&CellContour> {
    contours.iter().fold(None, |best: Option<&CellContour>, c| match best {
        Some(b) if b.area() >= c.area() => Some(b),
        _ => Some(c),
    })
}
