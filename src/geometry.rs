//! Hotspot geometry.
//!
//! Hotspots are stored as percentages of the page box and emitted as
//! percentages too, never converted to pixels. The overlay therefore follows
//! whatever size the page box ends up with in the viewer's browser.
//!
//! No clipping or overlap resolution happens here. Overlapping hotspots are
//! legal; the one later in document order sits on top and takes the click.

use crate::model::Hotspot;

/// A rectangle expressed in percent of its containing page box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl PercentRect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn from_hotspot(h: &Hotspot) -> Self {
        Self::new(h.top, h.left, h.width, h.height)
    }

    /// Inline `style` value that positions an absolutely-placed overlay.
    pub fn to_style(&self) -> String {
        format!(
            "top:{}%;left:{}%;width:{}%;height:{}%",
            format_percent(self.top),
            format_percent(self.left),
            format_percent(self.width),
            format_percent(self.height),
        )
    }

    /// Whether the point (`x`, `y`), in percent of the page box, falls
    /// inside this rectangle. Edges are inclusive on the top-left side only.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.left + self.width && y >= self.top && y < self.top + self.height
    }
}

/// Format a percentage with at most four decimals and no trailing zeros.
///
/// Non-finite input becomes `0` so a corrupt job cannot emit `NaN%`.
pub fn format_percent(v: f64) -> String {
    let rounded = (v * 10_000.0).round() / 10_000.0;
    if !rounded.is_finite() {
        return "0".to_string();
    }
    // Avoid "-0".
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded}")
}

/// The hotspot a click at (`x`, `y`) lands on: the last one in document
/// order whose rectangle contains the point.
pub fn hit_test<'a>(hotspots: &[&'a Hotspot], x: f64, y: f64) -> Option<&'a Hotspot> {
    hotspots
        .iter()
        .rev()
        .find(|h| PercentRect::from_hotspot(h).contains(x, y))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spot(id: &str, top: f64, left: f64, width: f64, height: f64) -> Hotspot {
        Hotspot {
            id: id.into(),
            page_index: 0,
            top,
            left,
            width,
            height,
            url: format!("https://example.com/{id}"),
            label: None,
        }
    }

    #[test]
    fn style_keeps_percentages() {
        let r = PercentRect::new(12.5, 10.0, 33.3333333, 5.0);
        assert_eq!(r.to_style(), "top:12.5%;left:10%;width:33.3333%;height:5%");
    }

    #[test]
    fn format_percent_edge_cases() {
        assert_eq!(format_percent(f64::NAN), "0");
        assert_eq!(format_percent(f64::INFINITY), "0");
        assert_eq!(format_percent(-0.00001), "0");
        assert_eq!(format_percent(100.0), "100");
        assert_eq!(format_percent(-5.25), "-5.25");
        assert_eq!(format_percent(1e305), "0");
        assert_eq!(format_percent(-1e305), "0");
        assert_eq!(format_percent(f64::MAX), "0");
    }

    #[test]
    fn out_of_box_values_are_not_clipped() {
        let r = PercentRect::new(-10.0, 90.0, 20.0, 120.0);
        assert_eq!(r.to_style(), "top:-10%;left:90%;width:20%;height:120%");
    }

    #[test]
    fn topmost_in_document_order_wins() {
        let a = spot("a", 0.0, 0.0, 50.0, 50.0);
        let b = spot("b", 25.0, 25.0, 50.0, 50.0);
        let spots = [&a, &b];
        assert_eq!(hit_test(&spots, 30.0, 30.0).map(|h| h.id.as_str()), Some("b"));
        assert_eq!(hit_test(&spots, 10.0, 10.0).map(|h| h.id.as_str()), Some("a"));
        assert!(hit_test(&spots, 90.0, 90.0).is_none());
    }
}
