//! Chapter anchors: invisible markers embedded in the content document and
//! recovered from rendered page text.
//!
//! The layout engine exposes no "page number of this element" primitive, so
//! a zero-sized text token is planted immediately before each chapter title
//! and scanned back out of the rendered pages. The token flows with
//! ordinary text, so it lands on the same page the chapter begins on.

use std::collections::HashMap;

use memchr::memmem;

use crate::error::Result;
use crate::linearize::is_id_byte;
use crate::render::{PageStream, RenderEngine};

/// Prefix of every embedded anchor token.
pub const ANCHOR_PREFIX: &str = "ANCHOR:";

/// Chapter id → zero-based page index within the content fragment.
pub type AnchorMap = HashMap<String, usize>;

/// The marker token for one chapter.
///
/// The trailing `;` terminates the id, since text extraction can butt the
/// token up against the chapter title with no whitespace in between.
pub fn anchor_token(chapter_id: &str) -> String {
    format!("{ANCHOR_PREFIX}{chapter_id};")
}

/// Invisible in-flow markup carrying the token.
///
/// Zero font size, zero line height and a transparent fill keep the marker
/// out of the visual layout while it still travels into the page text.
pub fn anchor_markup(chapter_id: &str) -> String {
    format!(
        "<span class=\"pg-anchor\" style=\"font-size:0;line-height:0;color:transparent\">{}</span>",
        anchor_token(chapter_id)
    )
}

/// Scan the rendered content fragment for chapter tokens.
///
/// Records the first page each token appears on; later occurrences (a token
/// echoed across a page break by the layout engine) are ignored. Chapters
/// whose token never surfaces are left unmapped; the caller treats that as
/// a degraded result, not a failure.
pub fn resolve_anchors<E: RenderEngine + ?Sized>(
    engine: &E,
    content: &PageStream,
    chapter_ids: &[String],
) -> Result<AnchorMap> {
    let mut map = AnchorMap::new();
    if content.is_empty() || chapter_ids.is_empty() {
        return Ok(map);
    }

    let finder = memmem::Finder::new(ANCHOR_PREFIX.as_bytes());
    for page_index in 0..content.page_count {
        if map.len() == chapter_ids.len() {
            break;
        }
        let text = engine.extract_page_text(content, page_index)?;
        for id in tokens_in(&finder, &text) {
            if !map.contains_key(id) && chapter_ids.iter().any(|c| c == id) {
                map.insert(id.to_string(), page_index);
            }
        }
    }

    for id in chapter_ids {
        if !map.contains_key(id) {
            log::warn!("anchor for chapter {id} not found in rendered content; defaulting to page 0");
        }
    }

    Ok(map)
}

/// All anchor ids present in one page's text.
fn tokens_in<'t>(finder: &memmem::Finder<'_>, text: &'t str) -> Vec<&'t str> {
    let bytes = text.as_bytes();
    finder
        .find_iter(bytes)
        .filter_map(|start| {
            let id_start = start + ANCHOR_PREFIX.len();
            let len = bytes[id_start..]
                .iter()
                .position(|b| !is_id_byte(*b))
                .unwrap_or(bytes.len() - id_start);
            let id = &text[id_start..id_start + len];
            if id.is_empty() { None } else { Some(id) }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::time::Duration;

    /// Engine double that serves canned page text.
    struct PagedText {
        pages: Vec<String>,
        calls: RefCell<usize>,
    }

    impl PagedText {
        fn new(pages: &[&str]) -> Self {
            Self {
                pages: pages.iter().map(|p| p.to_string()).collect(),
                calls: RefCell::new(0),
            }
        }
    }

    impl RenderEngine for PagedText {
        fn render(&self, _html: &str, _css: &str, _timeout: Duration) -> Result<PageStream> {
            unreachable!("resolver never renders")
        }

        fn extract_page_text(&self, _stream: &PageStream, page_index: usize) -> Result<String> {
            *self.calls.borrow_mut() += 1;
            Ok(self.pages[page_index].clone())
        }
    }

    fn stream(pages: usize) -> PageStream {
        PageStream {
            bytes: vec![0],
            page_count: pages,
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn token_is_terminated() {
        assert_eq!(anchor_token("ch1"), "ANCHOR:ch1;");
        assert!(anchor_markup("ch1").contains("ANCHOR:ch1;"));
        assert!(anchor_markup("ch1").contains("font-size:0"));
    }

    #[test]
    fn maps_first_occurrence_per_chapter() {
        let engine = PagedText::new(&[
            "ANCHOR:intro;Introduction text",
            "ANCHOR:methods;Methods ANCHOR:intro;echoed",
        ]);
        let map = resolve_anchors(&engine, &stream(2), &ids(&["intro", "methods"])).unwrap();
        assert_eq!(map.get("intro"), Some(&0));
        assert_eq!(map.get("methods"), Some(&1));
    }

    #[test]
    fn token_glued_to_title_still_parses() {
        // Extraction may not keep any whitespace between the invisible run
        // and the visible title.
        let engine = PagedText::new(&["ANCHOR:intro;Introduction"]);
        let map = resolve_anchors(&engine, &stream(1), &ids(&["intro"])).unwrap();
        assert_eq!(map.get("intro"), Some(&0));
    }

    #[test]
    fn unknown_tokens_are_ignored() {
        let engine = PagedText::new(&["ANCHOR:stranger;"]);
        let map = resolve_anchors(&engine, &stream(1), &ids(&["intro"])).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn missing_chapter_left_unmapped() {
        let engine = PagedText::new(&["no tokens here", "still none"]);
        let map = resolve_anchors(&engine, &stream(2), &ids(&["intro"])).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn stops_scanning_once_all_found() {
        let engine = PagedText::new(&["ANCHOR:a;", "irrelevant", "irrelevant"]);
        let map = resolve_anchors(&engine, &stream(3), &ids(&["a"])).unwrap();
        assert_eq!(map.get("a"), Some(&0));
        assert_eq!(*engine.calls.borrow(), 1);
    }

    #[test]
    fn empty_inputs() {
        let engine = PagedText::new(&[]);
        assert!(
            resolve_anchors(&engine, &PageStream::empty(), &ids(&["a"]))
                .unwrap()
                .is_empty()
        );
        assert!(
            resolve_anchors(&engine, &stream(0), &[])
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn anchor_indices_stay_within_page_bounds() {
        let engine = PagedText::new(&["x", "ANCHOR:a; ANCHOR:b;", "y"]);
        let map = resolve_anchors(&engine, &stream(3), &ids(&["a", "b"])).unwrap();
        for index in map.values() {
            assert!(*index < 3);
        }
    }
}
