//! Chapter page-range derivation.
//!
//! Turns anchor positions and the content-section offset into inclusive
//! final-page ranges, so the stamper knows which chapter owns each page.

use crate::anchor::AnchorMap;
use crate::model::{LinearNode, NodeKind};

/// Inclusive range of final pages owned by one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRange {
    pub chapter_id: String,
    pub title: String,
    /// Zero-based index of the first final page.
    pub first_page: usize,
    /// Zero-based index of the last final page.
    pub last_page: usize,
}

/// Derive chapter ranges.
///
/// `offset` is the number of final pages before the content section (cover
/// + front + toc). Each chapter starts at `offset + anchor index`
/// (unmapped chapters default to index 0) and runs until the next chapter
/// begins; the last chapter extends to the end of the document. A chapter
/// sharing its start page with a later chapter owns no pages and yields no
/// range, keeping ranges pairwise disjoint.
pub fn chapter_ranges(
    sequence: &[LinearNode],
    anchors: &AnchorMap,
    offset: usize,
    total_pages: usize,
) -> Vec<ChapterRange> {
    if total_pages == 0 {
        return Vec::new();
    }

    let mut starts: Vec<(usize, &LinearNode)> = sequence
        .iter()
        .filter(|node| node.kind == NodeKind::Chapter)
        .map(|node| {
            let index = anchors.get(&node.id).copied().unwrap_or(0);
            ((offset + index).min(total_pages - 1), node)
        })
        .collect();
    // Stable sort keeps linear order for chapters starting on the same page.
    starts.sort_by_key(|(start, _)| *start);

    let mut ranges = Vec::with_capacity(starts.len());
    for (i, (start, node)) in starts.iter().enumerate() {
        let last_page = match starts.get(i + 1) {
            Some((next_start, _)) if next_start == start => continue,
            Some((next_start, _)) => next_start - 1,
            None => total_pages - 1,
        };
        ranges.push(ChapterRange {
            chapter_id: node.id.clone(),
            title: node.title.clone(),
            first_page: *start,
            last_page,
        });
    }
    ranges
}

/// Title of the chapter owning a zero-based final page, if any.
pub fn chapter_title_for_page(ranges: &[ChapterRange], page: usize) -> Option<&str> {
    ranges
        .iter()
        .find(|r| r.first_page <= page && page <= r.last_page)
        .map(|r| r.title.as_str())
}
