//! Paginated artifact packaging.
//!
//! One logical page at A4 width; page height follows the captured frame's
//! aspect ratio, so the whole manuscript lands on a single continuous page
//! the way the on-screen column reads.

use std::io::BufWriter;

use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::snapshot::{CaptureFrame, FONT_PX, LINE_HEIGHT_PX, MARGIN_PX};
use crate::{ExportError, PAGE_WIDTH_MM};

const PT_PER_MM: f32 = 72.0 / 25.4;

/// Render the frame into PDF bytes.
pub(crate) fn package_frame(frame: &CaptureFrame, title: &str) -> Result<Vec<u8>, ExportError> {
    let page_height_mm = PAGE_WIDTH_MM * frame.aspect();
    let mm_per_px = PAGE_WIDTH_MM / frame.width_px as f32;

    let (doc, page, layer) = PdfDocument::new(
        title,
        Mm(PAGE_WIDTH_MM),
        Mm(page_height_mm),
        "story",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Package(e.to_string()))?;

    let layer = doc.get_page(page).get_layer(layer);
    let font_size_pt = FONT_PX as f32 * mm_per_px * PT_PER_MM;
    let x_mm = MARGIN_PX as f32 * mm_per_px;

    for (index, line) in frame.lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let baseline_px = MARGIN_PX + (index as u32 + 1) * LINE_HEIGHT_PX;
        let y_mm = page_height_mm - baseline_px as f32 * mm_per_px;
        layer.use_text(line.clone(), font_size_pt, Mm(x_mm), Mm(y_mm), &font);
    }

    let mut bytes: Vec<u8> = Vec::new();
    doc.save(&mut BufWriter::new(&mut bytes))
        .map_err(|e| ExportError::Package(e.to_string()))?;
    Ok(bytes)
}
