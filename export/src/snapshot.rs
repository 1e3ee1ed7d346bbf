//! Off-screen layout of the captured manuscript.
//!
//! The capture target is a fixed-width column at [`CAPTURE_SCALE`]× the
//! on-screen size. Layout is a greedy word wrap with a per-glyph advance
//! estimate for the artifact's built-in face; the frame's pixel dimensions
//! drive the page geometry downstream.

use crate::{BASE_WIDTH_PX, CAPTURE_SCALE};

/// Frame margin in capture pixels.
pub(crate) const MARGIN_PX: u32 = 48 * CAPTURE_SCALE;

/// Body size in capture pixels.
pub(crate) const FONT_PX: u32 = 12 * CAPTURE_SCALE;

/// Baseline-to-baseline distance in capture pixels.
pub(crate) const LINE_HEIGHT_PX: u32 = 20 * CAPTURE_SCALE;

/// Average glyph advance estimate for the built-in face, in capture pixels.
const GLYPH_ADVANCE_PX: u32 = FONT_PX / 2;

/// A laid-out document snapshot at capture scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFrame {
    pub width_px: u32,
    pub height_px: u32,
    pub lines: Vec<String>,
}

impl CaptureFrame {
    /// Height-over-width ratio used to size the output page.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.height_px as f32 / self.width_px as f32
    }
}

/// Lay `text` out into the capture frame.
///
/// Paragraph breaks are preserved; each paragraph wraps greedily at the
/// column width. The frame is never shorter than a full A4 page at the
/// capture width, so sparse documents still produce a sensible page.
pub(crate) fn layout_document(text: &str) -> CaptureFrame {
    let width_px = BASE_WIDTH_PX * CAPTURE_SCALE;
    let usable_px = width_px - 2 * MARGIN_PX;
    let max_chars = (usable_px / GLYPH_ADVANCE_PX).max(1) as usize;

    let mut lines = Vec::new();
    for paragraph in text.lines() {
        if paragraph.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        wrap_paragraph(paragraph, max_chars, &mut lines);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    let content_height = 2 * MARGIN_PX + lines.len() as u32 * LINE_HEIGHT_PX;
    // A4 aspect: 297/210
    let min_height = width_px * 297 / 210;

    CaptureFrame {
        width_px,
        height_px: content_height.max(min_height),
        lines,
    }
}

fn wrap_paragraph(paragraph: &str, max_chars: usize, lines: &mut Vec<String>) {
    let mut current = String::new();

    for word in paragraph.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed <= max_chars {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        // A single word longer than the column is hard-split.
        let mut rest: Vec<char> = word.chars().collect();
        while rest.len() > max_chars {
            let head: String = rest.drain(..max_chars).collect();
            lines.push(head);
        }
        current = rest.into_iter().collect();
    }

    if !current.is_empty() {
        lines.push(current);
    }
}
