//! HTML synthesis for the render engine.
//!
//! Expands `{{TOKEN}}` placeholders in the caller's templates and generates
//! the documents handed to the layout engine: cover, front matter, table of
//! contents, and the chapter content itself.

use std::fmt::Write;

use crate::anchor;
use crate::model::{BookSource, LinearNode, NodeKind};
use crate::toc::TocEntry;

/// Replace `{{TOKEN}}` placeholders in a template.
///
/// Unknown placeholders are left in place so a typo is visible in the
/// output rather than silently swallowed.
pub fn expand_tokens(template: &str, replacements: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (token, value) in replacements {
        out = out.replace(&format!("{{{{{token}}}}}"), value);
    }
    out
}

/// Wrap body markup into a complete HTML document.
pub fn document(title: &str, body: &str) -> String {
    let mut doc = String::new();
    doc.push_str("<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"utf-8\"/>\n  <title>");
    doc.push_str(&escape_html(title));
    doc.push_str("</title>\n</head>\n<body>\n");
    doc.push_str(body);
    doc.push_str("</body>\n</html>\n");
    doc
}

/// Expand a cover or front-matter template into a full document.
pub fn template_document(template: &str, source: &BookSource) -> String {
    let body = expand_tokens(template, &standard_tokens(source));
    document(&source.title, &body)
}

/// Generate the content document: every node's title block (chapters
/// carrying their invisible anchor) followed by its authored body markup.
pub fn content_document(source: &BookSource, sequence: &[LinearNode]) -> String {
    let mut body = String::new();
    for node in sequence {
        match node.kind {
            NodeKind::Part => {
                let _ = writeln!(
                    body,
                    "<h1 class=\"part-title\">{}</h1>",
                    escape_html(&node.title)
                );
            }
            NodeKind::Chapter => {
                let _ = writeln!(
                    body,
                    "<h1 class=\"chapter-title\">{}{}</h1>",
                    anchor::anchor_markup(&node.id),
                    escape_html(&node.title)
                );
            }
            NodeKind::Heading => {
                let level = node.level.clamp(2, 6);
                let _ = writeln!(
                    body,
                    "<h{level} class=\"heading\">{}</h{level}>",
                    escape_html(&node.title)
                );
            }
        }
        // Authored markup goes in verbatim; it is already HTML.
        if !node.body.is_empty() {
            let _ = writeln!(body, "<div class=\"node-body\">{}</div>", node.body);
        }
    }
    document(&source.title, &body)
}

/// Expand the TOC skeleton template with one row per resolved entry.
pub fn toc_document(template: &str, source: &BookSource, entries: &[TocEntry]) -> String {
    let rows = toc_rows(entries);
    let mut tokens = standard_tokens(source);
    tokens.push(("TOC_ROWS", &rows));
    let expanded = expand_tokens(template, &tokens);
    document(&source.title, &expanded)
}

fn toc_rows(entries: &[TocEntry]) -> String {
    let mut rows = String::new();
    for entry in entries {
        let page = entry.page.map(|p| p.to_string()).unwrap_or_default();
        let _ = writeln!(
            rows,
            "<div class=\"toc-row toc-level-{}\"><span class=\"toc-label\">{}</span> \
             <span class=\"toc-page\">{}</span></div>",
            entry.level,
            escape_html(&entry.label),
            page
        );
    }
    rows
}

fn standard_tokens<'a>(source: &'a BookSource) -> Vec<(&'static str, &'a str)> {
    // Escaping happens at insertion; titles and authors are plain text.
    vec![
        ("BOOK_TITLE", source.title.as_str()),
        ("BOOK_AUTHOR", source.author.as_deref().unwrap_or("")),
        ("YEAR", source.year.as_deref().unwrap_or("")),
    ]
}

/// Escape special HTML characters.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}
