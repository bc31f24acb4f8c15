use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Marks a cell cut to fit its column.
const CLIPPED: &str = "..";

/// Cut `cell` to at most `width` display columns, ending in [`CLIPPED`].
///
/// Wide characters are never split; the result may be one column short.
fn clip(cell: &str, width: usize) -> Cow<'_, str> {
    if cell.width() <= width {
        return Cow::Borrowed(cell);
    }
    let budget = width.saturating_sub(CLIPPED.len());
    let mut used = 0;
    let mut out = String::new();
    for ch in cell.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    if width >= CLIPPED.len() {
        out.push_str(CLIPPED);
    }
    Cow::Owned(out)
}

/// Render rows under a header as space-aligned columns, each at most
/// `max_width` display columns wide. Lines carry no trailing padding.
pub(crate) fn render_table(columns: &[String], rows: &[Vec<String>], max_width: usize) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.width().min(max_width)).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.width().min(max_width));
        }
    }

    let mut out = String::new();
    for line in std::iter::once(columns).chain(rows.iter().map(Vec::as_slice)) {
        let mut text = String::new();
        for (i, (cell, &w)) in line.iter().zip(&widths).enumerate() {
            if i > 0 {
                text.push_str("  ");
            }
            let cell = clip(cell, w);
            text.push_str(&cell);
            text.extend(std::iter::repeat(' ').take(w - cell.width()));
        }
        out.push_str(text.trim_end());
        out.push('\n');
    }
    out
}
