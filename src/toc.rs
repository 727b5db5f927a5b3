//! Table-of-contents page-number resolution.
//!
//! A TOC entry's printed page number depends on how many pages the TOC
//! itself occupies, which is only known after rendering it, and rendering
//! it requires the printed numbers. [`resolve_toc`] breaks the circle with
//! a bounded fixed-point iteration: print numbers assuming a page count,
//! render, measure, and repeat until measurement and assumption agree.

use crate::anchor::AnchorMap;
use crate::error::Result;
use crate::model::{BookSource, LinearNode, NodeKind};
use crate::render::{self, FragmentKind, PageStream, RenderBudget, RenderEngine};
use crate::synth;

/// Maximum configurable TOC depth.
pub const MAX_TOC_DEPTH: usize = 6;

/// Cap on fixed-point iterations. Hitting it is a degraded result, not a
/// failure: the last rendered candidate is accepted as-is.
pub const MAX_TOC_ITERATIONS: usize = 5;

/// One line of the table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub label: String,
    /// 1-based depth, matching the node's level in the tree.
    pub level: usize,
    pub node_id: String,
    /// Zero-based page index within the content fragment this entry points
    /// at.
    pub content_index: usize,
    /// Resolved 1-based final page number; rewritten on every iteration of
    /// the fixed-point loop.
    pub page: Option<usize>,
}

/// Outcome of the fixed-point loop.
#[derive(Debug)]
pub struct ResolvedToc {
    /// The accepted TOC fragment.
    pub stream: PageStream,
    /// Entries as printed in the accepted fragment.
    pub entries: Vec<TocEntry>,
    pub iterations: usize,
    pub converged: bool,
}

/// Derive TOC entries from the linearized sequence.
///
/// Entries deeper than `toc_depth` are excluded before rendering. A Part
/// resolves to the first Chapter after it (scanning forward, giving up at
/// the next Part); a Heading resolves to its enclosing chapter. Entries
/// with nothing to point at are omitted rather than rendered pageless.
pub fn build_entries(
    sequence: &[LinearNode],
    anchors: &AnchorMap,
    toc_depth: usize,
) -> Vec<TocEntry> {
    let depth = toc_depth.clamp(1, MAX_TOC_DEPTH);
    let anchor_of = |id: &str| anchors.get(id).copied().unwrap_or(0);

    let mut entries = Vec::new();
    for (index, node) in sequence.iter().enumerate() {
        if node.level > depth {
            continue;
        }
        let content_index = match node.kind {
            NodeKind::Chapter => anchor_of(&node.id),
            NodeKind::Part => match next_chapter_after(sequence, index) {
                Some(chapter) => anchor_of(&chapter.id),
                None => continue,
            },
            NodeKind::Heading => match node.chapter_id.as_deref() {
                Some(chapter_id) => anchor_of(chapter_id),
                None => continue,
            },
        };
        entries.push(TocEntry {
            label: node.title.clone(),
            level: node.level,
            node_id: node.id.clone(),
            content_index,
            page: None,
        });
    }
    entries
}

/// Forward scan for the first Chapter after `index`, stopping at the next
/// Part. Index arithmetic over the materialized sequence, not a tree walk.
fn next_chapter_after(sequence: &[LinearNode], index: usize) -> Option<&LinearNode> {
    sequence[index + 1..].iter().find_map(|node| match node.kind {
        NodeKind::Chapter => Some(Some(node)),
        NodeKind::Part => Some(None),
        NodeKind::Heading => None,
    })?
}

/// Run the fixed-point loop against the render engine.
///
/// Returns `None` when the book has no TOC (no template or no entries).
/// The loop never fails on non-convergence: after [`MAX_TOC_ITERATIONS`]
/// attempts the last candidate is accepted with `converged = false`.
pub fn resolve_toc<E: RenderEngine + ?Sized>(
    engine: &E,
    source: &BookSource,
    mut entries: Vec<TocEntry>,
    pages_before_toc: usize,
    budget: &RenderBudget,
) -> Result<Option<ResolvedToc>> {
    let Some(template) = source.templates.toc.as_deref() else {
        return Ok(None);
    };
    if entries.is_empty() {
        return Ok(None);
    }

    let mut guess = 1usize;
    let mut iterations = 0usize;
    let mut converged = false;
    let mut stream = PageStream::empty();

    while iterations < MAX_TOC_ITERATIONS {
        iterations += 1;
        assign_pages(&mut entries, pages_before_toc, guess);

        let html = synth::toc_document(template, source, &entries);
        stream = render::render_fragment(engine, FragmentKind::Toc, &html, &source.css, budget)?;

        // A rendered TOC occupies at least one page.
        let measured = stream.page_count.max(1);
        if measured == guess {
            converged = true;
            break;
        }
        log::debug!("toc measured {measured} page(s), guessed {guess}; re-rendering");
        guess = measured;
    }

    if !converged {
        log::warn!(
            "toc page count did not stabilize after {iterations} iterations; \
             accepting the last candidate"
        );
    }

    Ok(Some(ResolvedToc {
        stream,
        entries,
        iterations,
        converged,
    }))
}

/// Printed number = 1-based final page index: every page before the content
/// section (cover, front, the TOC itself) plus the content-relative index.
fn assign_pages(entries: &mut [TocEntry], pages_before_toc: usize, guessed_toc_pages: usize) {
    for entry in entries.iter_mut() {
        entry.page = Some(pages_before_toc + guessed_toc_pages + entry.content_index + 1);
    }
}
