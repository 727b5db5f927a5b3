//! Running header/footer stamping.
//!
//! Overlays the book title, the owning chapter title, and a running page
//! number on every non-cover page of the assembled document. The overlay is
//! an appended content stream per page plus one shared Helvetica resource;
//! the input bytes are never mutated, and stamping yields a new stream.

use std::fmt::Write;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::Result;
use crate::ranges::{self, ChapterRange};

/// Font size for header and footer text.
const STAMP_FONT_SIZE: f32 = 9.0;
/// Header baseline distance from the top edge.
const HEADER_OFFSET: f32 = 24.0;
/// Footer baseline distance from the bottom edge.
const FOOTER_OFFSET: f32 = 20.0;
/// Horizontal page margin for header text.
const MARGIN: f32 = 36.0;
/// Character budget for header labels; longer labels are cut with an
/// ellipsis.
const LABEL_BUDGET: usize = 48;
/// Approximate Helvetica advance as a fraction of the font size, used to
/// right-align and center text without real glyph metrics.
const GLYPH_ASPECT: f32 = 0.5;

/// Resource name for the stamp font; unusual on purpose to avoid colliding
/// with the page's own font names.
const STAMP_FONT: &str = "FbdyHdr";

/// Stamp every non-cover page of the assembled document.
///
/// The running number is 1-based and counted from the first non-cover
/// page. Pages outside every chapter range (front matter, the TOC) get no
/// chapter title.
pub fn stamp_pages(
    assembled: &[u8],
    book_title: &str,
    ranges: &[ChapterRange],
    cover_pages: usize,
) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(assembled)?;

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
    for (page_number, page_id) in pages {
        let page_index = page_number as usize - 1;
        if page_index < cover_pages {
            continue;
        }

        let media = media_box(&doc, page_id);
        let chapter = ranges::chapter_title_for_page(ranges, page_index).unwrap_or("");
        let running_number = page_index - cover_pages + 1;
        let overlay = overlay_content(book_title, chapter, running_number, media);

        ensure_stamp_font(&mut doc, page_id, font_id)?;
        append_content(&mut doc, page_id, &overlay)?;
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

/// Build the overlay operations for one page.
fn overlay_content(title: &str, chapter: &str, number: usize, media: [f32; 4]) -> String {
    let width = media[2] - media[0];
    let height = media[3] - media[1];
    let header_y = media[1] + height - HEADER_OFFSET;

    let mut ops = String::new();
    ops.push_str("q\n0 0 0 rg\n");

    let title = truncate_label(title, LABEL_BUDGET);
    if !title.is_empty() {
        draw_text(&mut ops, &title, media[0] + MARGIN, header_y);
    }

    let chapter = truncate_label(chapter, LABEL_BUDGET);
    if !chapter.is_empty() {
        let x = media[0] + width - MARGIN - text_width(&chapter);
        draw_text(&mut ops, &chapter, x.max(media[0] + MARGIN), header_y);
    }

    let number = number.to_string();
    let x = media[0] + (width - text_width(&number)) / 2.0;
    draw_text(&mut ops, &number, x, media[1] + FOOTER_OFFSET);

    ops.push_str("Q\n");
    ops
}

fn draw_text(ops: &mut String, text: &str, x: f32, y: f32) {
    ops.push_str("BT\n");
    let _ = writeln!(ops, "/{STAMP_FONT} {STAMP_FONT_SIZE} Tf");
    let _ = writeln!(ops, "{x:.2} {y:.2} Td");
    let _ = writeln!(ops, "({}) Tj", escape_pdf_text(text));
    ops.push_str("ET\n");
}

fn text_width(text: &str) -> f32 {
    text.chars().count() as f32 * STAMP_FONT_SIZE * GLYPH_ASPECT
}

/// Cut a label to `budget` characters, ellipsis included.
fn truncate_label(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let kept: String = text.chars().take(budget.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Escape a string for a PDF literal.
fn escape_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            _ => out.push(c),
        }
    }
    out
}

/// Register the stamp font in the page's Resources, inlining a referenced
/// Resources or Font dictionary when necessary.
fn ensure_stamp_font(doc: &mut Document, page_id: ObjectId, font_id: ObjectId) -> Result<()> {
    let mut resources = match doc.get_object(page_id)? {
        Object::Dictionary(dict) => match dict.get(b"Resources") {
            Ok(Object::Dictionary(res)) => res.clone(),
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Dictionary(res)) => res.clone(),
                _ => Dictionary::new(),
            },
            _ => Dictionary::new(),
        },
        _ => return Ok(()),
    };

    let mut fonts = match resources.get(b"Font") {
        Ok(Object::Dictionary(fonts)) => fonts.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Dictionary(fonts)) => fonts.clone(),
            _ => Dictionary::new(),
        },
        _ => Dictionary::new(),
    };
    fonts.set(STAMP_FONT, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    if let Object::Dictionary(dict) = doc.get_object_mut(page_id)? {
        dict.set("Resources", Object::Dictionary(resources));
    }
    Ok(())
}

/// Append an overlay content stream after the page's existing content.
fn append_content(doc: &mut Document, page_id: ObjectId, content: &str) -> Result<()> {
    let stream = Stream::new(Dictionary::new(), content.as_bytes().to_vec());
    let content_id = doc.add_object(Object::Stream(stream));

    if let Object::Dictionary(dict) = doc.get_object_mut(page_id)? {
        let existing = dict.get(b"Contents").ok().cloned();
        match existing {
            Some(Object::Reference(existing_id)) => {
                dict.set(
                    "Contents",
                    Object::Array(vec![
                        Object::Reference(existing_id),
                        Object::Reference(content_id),
                    ]),
                );
            }
            Some(Object::Array(mut array)) => {
                array.push(Object::Reference(content_id));
                dict.set("Contents", Object::Array(array));
            }
            _ => {
                dict.set("Contents", Object::Reference(content_id));
            }
        }
    }
    Ok(())
}

/// Media box of a page, following the Parent chain with a depth limit.
fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let mut object = doc.get_object(page_id).ok();
    for _ in 0..8 {
        let Some(Object::Dictionary(dict)) = object else {
            break;
        };
        if let Ok(candidate) = dict.get(b"MediaBox")
            && let Some(values) = media_values(doc, candidate)
        {
            return values;
        }
        object = match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => doc.get_object(*parent).ok(),
            _ => None,
        };
    }
    // US Letter fallback.
    [0.0, 0.0, 612.0, 792.0]
}

fn media_values(doc: &Document, object: &Object) -> Option<[f32; 4]> {
    let array = match object {
        Object::Array(array) => array,
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Array(array) => array,
            _ => return None,
        },
        _ => return None,
    };
    if array.len() != 4 {
        return None;
    }
    let mut values = [0.0f32; 4];
    for (slot, entry) in values.iter_mut().zip(array) {
        *slot = match entry {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r,
            _ => return None,
        };
    }
    Some(values)
}
