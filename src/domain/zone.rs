//! Zone types and ratio-based geometry.
//!
//! A zone is a labeled rectangular region of a document page. Zones carry
//! two forms of geometry: absolute pixels (the working form used while an
//! image is in hand) and fractions of the page dimensions (the persisted
//! form, which is what makes fingerprints invariant to scan resolution).

use serde::{Deserialize, Serialize};

/// Slack permitted when checking ratio bounds, absorbing float round-trips
/// through JSON.
pub const RATIO_EPSILON: f32 = 1e-4;

/// The label assigned to a detected content region.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    /// Banner content near the top of the page.
    Header,
    /// Large ruled or columnar content, typically line items.
    Table,
    /// Content near the bottom of the page.
    Footer,
    /// Small compact block, typically a vendor mark.
    Logo,
    /// Anything else.
    #[default]
    Other,
}

impl ZoneType {
    /// All zone types, in a fixed order.
    ///
    /// Distribution comparisons iterate this list so that types absent from
    /// both sides still contribute a perfect per-type agreement.
    pub const ALL: [ZoneType; 5] = [
        ZoneType::Header,
        ZoneType::Table,
        ZoneType::Footer,
        ZoneType::Logo,
        ZoneType::Other,
    ];
}

impl std::fmt::Display for ZoneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneType::Header => write!(f, "header"),
            ZoneType::Table => write!(f, "table"),
            ZoneType::Footer => write!(f, "footer"),
            ZoneType::Logo => write!(f, "logo"),
            ZoneType::Other => write!(f, "other"),
        }
    }
}

/// An axis-aligned rectangle in absolute pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Creates a new pixel rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// An axis-aligned rectangle expressed as fractions of the page dimensions.
///
/// This is the persisted form: positions and sizes in [0, 1], so the same
/// layout scanned at different resolutions produces the same rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioRect {
    /// Left edge as a fraction of page width.
    pub x: f32,
    /// Top edge as a fraction of page height.
    pub y: f32,
    /// Width as a fraction of page width.
    pub width: f32,
    /// Height as a fraction of page height.
    pub height: f32,
}

impl RatioRect {
    /// Creates a new ratio rectangle.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Derives a ratio rectangle from pixel bounds and page dimensions.
    ///
    /// Dimensions of zero yield an all-zero rectangle rather than NaN.
    pub fn from_pixels(bounds: PixelRect, page_width: u32, page_height: u32) -> Self {
        if page_width == 0 || page_height == 0 {
            return Self::new(0.0, 0.0, 0.0, 0.0);
        }
        let w = page_width as f32;
        let h = page_height as f32;
        Self {
            x: bounds.x as f32 / w,
            y: bounds.y as f32 / h,
            width: bounds.width as f32 / w,
            height: bounds.height as f32 / h,
        }
    }

    /// Converts back to pixel bounds against the given page dimensions,
    /// clamped so the result never exceeds the page.
    pub fn to_pixels(&self, page_width: u32, page_height: u32) -> PixelRect {
        let w = page_width as f32;
        let h = page_height as f32;
        let x = (self.x.clamp(0.0, 1.0) * w).round() as u32;
        let y = (self.y.clamp(0.0, 1.0) * h).round() as u32;
        let width = (self.width.clamp(0.0, 1.0) * w).round() as u32;
        let height = (self.height.clamp(0.0, 1.0) * h).round() as u32;
        PixelRect {
            x: x.min(page_width.saturating_sub(1)),
            y: y.min(page_height.saturating_sub(1)),
            width: width.min(page_width - x.min(page_width)),
            height: height.min(page_height - y.min(page_height)),
        }
    }

    /// Fractional area covered by this rectangle.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Center point, in ratio coordinates.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Checks the ratio invariants: every component in [0, 1] and the
    /// rectangle contained within the page.
    pub fn is_within_bounds(&self) -> bool {
        let in_unit = |v: f32| (-RATIO_EPSILON..=1.0 + RATIO_EPSILON).contains(&v);
        in_unit(self.x)
            && in_unit(self.y)
            && in_unit(self.width)
            && in_unit(self.height)
            && self.x + self.width <= 1.0 + RATIO_EPSILON
            && self.y + self.height <= 1.0 + RATIO_EPSILON
    }
}

/// A labeled content region with both working and persisted geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Classification of this region.
    pub kind: ZoneType,
    /// Absolute pixel bounds against the image the zone was detected on.
    pub bounds: PixelRect,
    /// The same bounds as fractions of that image's dimensions.
    pub ratios: RatioRect,
}

impl Zone {
    /// Creates a zone from pixel bounds, deriving the ratio form.
    pub fn from_pixels(kind: ZoneType, bounds: PixelRect, page_width: u32, page_height: u32) -> Self {
        Self {
            kind,
            bounds,
            ratios: RatioRect::from_pixels(bounds, page_width, page_height),
        }
    }
}

/// The persisted, scale-free form of a zone: label plus ratio geometry.
///
/// Fine fingerprints are ordered lists of these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneShape {
    /// Classification of the region.
    pub kind: ZoneType,
    /// Ratio-form bounds.
    pub rect: RatioRect,
}

impl ZoneShape {
    /// Creates a new zone shape.
    pub fn new(kind: ZoneType, rect: RatioRect) -> Self {
        Self { kind, rect }
    }
}

impl From<&Zone> for ZoneShape {
    fn from(zone: &Zone) -> Self {
        Self {
            kind: zone.kind,
            rect: zone.ratios,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_rect_from_pixels() {
        let rect = RatioRect::from_pixels(PixelRect::new(100, 50, 200, 100), 1000, 500);
        assert!((rect.x - 0.1).abs() < 1e-6);
        assert!((rect.y - 0.1).abs() < 1e-6);
        assert!((rect.width - 0.2).abs() < 1e-6);
        assert!((rect.height - 0.2).abs() < 1e-6);
        assert!(rect.is_within_bounds());
    }

    #[test]
    fn test_ratio_rect_zero_page_is_degenerate_not_nan() {
        let rect = RatioRect::from_pixels(PixelRect::new(10, 10, 10, 10), 0, 0);
        assert_eq!(rect, RatioRect::new(0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_ratio_rect_bounds_check_rejects_overflow() {
        assert!(!RatioRect::new(0.8, 0.0, 0.4, 0.1).is_within_bounds());
        assert!(!RatioRect::new(0.0, 0.0, 1.2, 0.1).is_within_bounds());
        assert!(!RatioRect::new(-0.2, 0.0, 0.1, 0.1).is_within_bounds());
    }

    #[test]
    fn test_ratio_rect_bounds_check_accepts_full_page() {
        assert!(RatioRect::new(0.0, 0.0, 1.0, 1.0).is_within_bounds());
    }

    #[test]
    fn test_pixel_roundtrip_is_scale_stable() {
        // The same physical layout at two scan resolutions produces
        // near-identical ratio geometry.
        let low = RatioRect::from_pixels(PixelRect::new(85, 110, 425, 55), 850, 1100);
        let high = RatioRect::from_pixels(PixelRect::new(255, 330, 1275, 165), 2550, 3300);
        assert!((low.x - high.x).abs() < 1e-4);
        assert!((low.y - high.y).abs() < 1e-4);
        assert!((low.width - high.width).abs() < 1e-4);
        assert!((low.height - high.height).abs() < 1e-4);
    }

    #[test]
    fn test_to_pixels_clamps_to_page() {
        let rect = RatioRect::new(0.9, 0.9, 0.2, 0.2);
        let px = rect.to_pixels(100, 100);
        assert!(px.x + px.width <= 100);
        assert!(px.y + px.height <= 100);
    }

    #[test]
    fn test_zone_shape_from_zone() {
        let zone = Zone::from_pixels(ZoneType::Header, PixelRect::new(0, 0, 500, 100), 1000, 1000);
        let shape = ZoneShape::from(&zone);
        assert_eq!(shape.kind, ZoneType::Header);
        assert!((shape.rect.width - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_zone_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ZoneType::Header).expect("serialize"),
            "\"header\""
        );
    }
}
