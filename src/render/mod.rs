//! Render engine contract and rendered-fragment types.
//!
//! The layout engine that turns HTML+CSS into paginated output is an
//! external collaborator. [`RenderEngine`] captures its behavioral
//! contract; the rest of the crate treats the resulting page streams as
//! opaque PDF bytes.

use std::fmt;
use std::time::{Duration, Instant};

use lopdf::Document;

use crate::error::{Error, Result};

#[cfg(feature = "chrome")]
mod chrome;

#[cfg(feature = "chrome")]
pub use chrome::ChromiumEngine;

/// Which of the four independently rendered documents a fragment is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Cover,
    Front,
    Toc,
    Content,
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FragmentKind::Cover => "cover",
            FragmentKind::Front => "front",
            FragmentKind::Toc => "toc",
            FragmentKind::Content => "content",
        })
    }
}

/// An opaque rendered page stream.
#[derive(Debug, Clone, Default)]
pub struct PageStream {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl PageStream {
    /// A stream with no pages; contributes nothing to assembly.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.page_count == 0
    }
}

/// A rendered fragment and its role in the final document.
#[derive(Debug, Clone)]
pub struct RenderedFragment {
    pub kind: FragmentKind,
    pub stream: PageStream,
}

/// External layout engine contract.
///
/// `render` must be deterministic for identical input: the TOC fixed-point
/// loop relies on re-rendering the same document producing the same page
/// count.
pub trait RenderEngine {
    /// Render one HTML document with the given stylesheet into a page
    /// stream.
    ///
    /// Implementations should give up once `timeout` has elapsed rather
    /// than block indefinitely; the pipeline treats an exhausted budget as
    /// fatal for the whole request.
    fn render(&self, html: &str, css: &str, timeout: Duration) -> Result<PageStream>;

    /// Extract the text content of one zero-based page, including
    /// invisible runs.
    ///
    /// The default implementation reads the stream as a PDF.
    fn extract_page_text(&self, stream: &PageStream, page_index: usize) -> Result<String> {
        let doc = Document::load_mem(&stream.bytes)?;
        let page_number = u32::try_from(page_index).unwrap_or(u32::MAX).saturating_add(1);
        Ok(doc.extract_text(&[page_number])?)
    }
}

/// Wall-clock limits for one compose request.
///
/// Every engine call gets the smaller of the per-call timeout and whatever
/// remains of the total budget; once the budget is spent, further calls
/// fail instead of hanging.
#[derive(Debug, Clone, Copy)]
pub struct RenderBudget {
    deadline: Instant,
    per_call: Duration,
}

impl RenderBudget {
    pub fn new(per_call: Duration, total: Duration) -> Self {
        Self {
            deadline: Instant::now() + total,
            per_call,
        }
    }

    /// Timeout for the next engine call, or an error once the budget is
    /// exhausted.
    pub fn next_call(&self, kind: FragmentKind) -> Result<Duration> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::RenderTimeout { kind });
        }
        Ok(remaining.min(self.per_call))
    }
}

/// Render one fragment, attributing engine failures to its kind.
///
/// An engine error that arrives only after the granted timeout has fully
/// elapsed is reported as a timeout rather than a generic failure.
pub(crate) fn render_fragment<E: RenderEngine + ?Sized>(
    engine: &E,
    kind: FragmentKind,
    html: &str,
    css: &str,
    budget: &RenderBudget,
) -> Result<PageStream> {
    let timeout = budget.next_call(kind)?;
    let started = Instant::now();
    match engine.render(html, css, timeout) {
        Ok(stream) => {
            log::debug!("rendered {kind} fragment: {} page(s)", stream.page_count);
            Ok(stream)
        }
        Err(Error::Engine(_)) if started.elapsed() >= timeout => {
            Err(Error::RenderTimeout { kind })
        }
        Err(err) => Err(err.for_fragment(kind)),
    }
}
