//! Geometric utilities for document image processing.
//!
//! This module provides the small set of geometric primitives the pipeline
//! needs: contour bounding rectangles and rectangle union.

use crate::domain::zone::PixelRect;
use imageproc::contours::Contour;

/// Axis-aligned bounding rectangle of a contour.
///
/// Returns None for an empty contour.
pub fn contour_bounds(contour: &Contour<u32>) -> Option<PixelRect> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    if contour.points.is_empty() {
        return None;
    }
    Some(PixelRect::new(
        min_x,
        min_y,
        max_x - min_x + 1,
        max_y - min_y + 1,
    ))
}

/// Union of two pixel rectangles.
pub fn union_rect(a: PixelRect, b: PixelRect) -> PixelRect {
    let x1 = a.x.min(b.x);
    let y1 = a.y.min(b.y);
    let x2 = (a.x + a.width).max(b.x + b.width);
    let y2 = (a.y + a.height).max(b.y + b.height);
    PixelRect::new(x1, y1, x2 - x1, y2 - y1)
}
