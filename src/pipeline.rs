//! The compose pipeline.
//!
//! One pure function from a content tree and templates to final PDF bytes
//! plus page metadata. No state outlives the call: fragments, anchor maps
//! and candidate TOCs are all request-scoped, and nothing partial is kept
//! on failure.

use std::time::Duration;

use crate::anchor;
use crate::assemble::{self, PageCounts};
use crate::error::{Error, Result};
use crate::linearize;
use crate::model::{BookSource, NodeKind};
use crate::ranges;
use crate::render::{
    self, FragmentKind, PageStream, RenderBudget, RenderEngine, RenderedFragment,
};
use crate::stamp;
use crate::synth;
use crate::toc;

/// Wall-clock limits for one compose request.
#[derive(Debug, Clone, Copy)]
pub struct ComposeOptions {
    /// Upper bound for a single render-engine call.
    pub render_timeout: Duration,
    /// Upper bound for the whole request.
    pub total_budget: Duration,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            render_timeout: Duration::from_secs(30),
            total_budget: Duration::from_secs(180),
        }
    }
}

/// A fully composed book.
#[derive(Debug)]
pub struct ComposedBook {
    /// Final page stream (PDF bytes).
    pub bytes: Vec<u8>,
    pub counts: PageCounts,
    /// Iterations the TOC fixed-point loop ran (0 when no TOC was
    /// produced).
    pub toc_iterations: usize,
    /// Whether the TOC reached its fixed point within the iteration cap.
    pub toc_converged: bool,
    /// Chapters whose anchor never surfaced in the rendered content; their
    /// TOC entries and ranges fell back to content page 0.
    pub unresolved_anchors: Vec<String>,
}

/// Compose a book end to end.
///
/// Stages: validate and linearize the tree, render cover/front/content
/// (concurrently, since they are mutually independent), recover chapter
/// anchors, run the TOC fixed-point loop, concatenate the fragments,
/// derive chapter ranges, and stamp headers and footers.
pub fn compose<E: RenderEngine + Sync + ?Sized>(
    engine: &E,
    source: &BookSource,
    options: &ComposeOptions,
) -> Result<ComposedBook> {
    let budget = RenderBudget::new(options.render_timeout, options.total_budget);

    let sequence = linearize::linearize(&source.nodes)?;
    log::debug!("linearized {} node(s)", sequence.len());

    let Some(cover_template) = source.templates.cover.as_deref() else {
        return Err(Error::MissingFragment(FragmentKind::Cover));
    };
    let cover_html = synth::template_document(cover_template, source);
    let front_html = source
        .templates
        .front
        .as_deref()
        .map(|template| synth::template_document(template, source));
    // An empty tree still yields a (zero-page) content fragment; there is
    // nothing to send to the engine for it.
    let content_html = if sequence.is_empty() {
        None
    } else {
        Some(synth::content_document(source, &sequence))
    };

    let (cover, front, content) = std::thread::scope(|scope| {
        let cover = scope.spawn(|| {
            render::render_fragment(engine, FragmentKind::Cover, &cover_html, &source.css, &budget)
        });
        let front = front_html.as_deref().map(|html| {
            scope.spawn(move || {
                render::render_fragment(engine, FragmentKind::Front, html, &source.css, &budget)
            })
        });
        let content = content_html.as_deref().map(|html| {
            scope.spawn(move || {
                render::render_fragment(engine, FragmentKind::Content, html, &source.css, &budget)
            })
        });
        (
            join(cover),
            front.map(join).transpose(),
            content.map(join).transpose(),
        )
    });
    let cover = cover?;
    let front = front?.unwrap_or_else(PageStream::empty);
    let content = content?.unwrap_or_else(PageStream::empty);

    let chapter_ids: Vec<String> = sequence
        .iter()
        .filter(|node| node.kind == NodeKind::Chapter)
        .map(|node| node.id.clone())
        .collect();
    let anchors = anchor::resolve_anchors(engine, &content, &chapter_ids)?;
    let unresolved_anchors: Vec<String> = chapter_ids
        .iter()
        .filter(|id| !anchors.contains_key(*id))
        .cloned()
        .collect();

    let entries = toc::build_entries(&sequence, &anchors, source.toc_depth);
    let pages_before_toc = cover.page_count + front.page_count;
    let resolved = toc::resolve_toc(engine, source, entries, pages_before_toc, &budget)?;
    let (toc_stream, toc_iterations, toc_converged) = match resolved {
        Some(resolved) => (resolved.stream, resolved.iterations, resolved.converged),
        None => (PageStream::empty(), 0, true),
    };

    let fragments = [
        RenderedFragment {
            kind: FragmentKind::Cover,
            stream: cover,
        },
        RenderedFragment {
            kind: FragmentKind::Front,
            stream: front,
        },
        RenderedFragment {
            kind: FragmentKind::Toc,
            stream: toc_stream,
        },
        RenderedFragment {
            kind: FragmentKind::Content,
            stream: content,
        },
    ];
    let (assembled, counts) = assemble::assemble(&fragments)?;

    let chapter_ranges =
        ranges::chapter_ranges(&sequence, &anchors, counts.content_offset(), counts.total);
    let bytes = stamp::stamp_pages(&assembled, &source.title, &chapter_ranges, counts.cover)?;

    log::info!(
        "composed {:?}: {} page(s), toc converged in {} iteration(s)",
        source.title,
        counts.total,
        toc_iterations
    );

    Ok(ComposedBook {
        bytes,
        counts,
        toc_iterations,
        toc_converged,
        unresolved_anchors,
    })
}

fn join(handle: std::thread::ScopedJoinHandle<'_, Result<PageStream>>) -> Result<PageStream> {
    handle
        .join()
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}
