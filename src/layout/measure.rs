//! Text measurement seam.
//!
//! The real renderer owns font metrics; the engine only needs extents
//! to compute bounding boxes and justification, so it asks a
//! [`TextMeasurer`]. [`EstimatedTextMeasurer`] is the default.

use unicode_width::UnicodeWidthStr;

/// Width and height of a block of text, in the same units as `font_px`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f64,
    pub height: f64,
}

pub trait TextMeasurer: Send + Sync {
    /// Extent of `text` (possibly multi-line) at `font_px`.
    fn measure(&self, text: &str, font_px: f64) -> TextExtent;
}

/// Average advance per display column, in em.
const ADVANCE_EM: f64 = 0.6;

/// Line height, in em.
const LINE_HEIGHT_EM: f64 = 1.2;

/// Column-count estimate: wide glyphs count as two columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedTextMeasurer;

impl TextMeasurer for EstimatedTextMeasurer {
    fn measure(&self, text: &str, font_px: f64) -> TextExtent {
        let (columns, lines) = text.lines().fold((0usize, 0usize), |(widest, count), line| {
            (widest.max(UnicodeWidthStr::width(line)), count + 1)
        });
        TextExtent {
            width: columns as f64 * ADVANCE_EM * font_px,
            height: lines.max(1) as f64 * LINE_HEIGHT_EM * font_px,
        }
    }
}
