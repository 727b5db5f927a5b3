//! # bindery
//!
//! Assembles a multi-chapter content tree into one paginated PDF whose
//! table of contents shows correct page numbers and whose pages carry a
//! running chapter-title header.
//!
//! The hard problem is circular: the table of contents occupies pages,
//! which shifts the numbers it has to print, which can in turn change its
//! own page count. [`compose`] resolves this with a bounded fixed-point
//! loop against an external [`RenderEngine`], recovering each chapter's
//! page position from invisible anchor tokens scanned back out of the
//! rendered text.
//!
//! ## Quick start
//!
//! ```no_run
//! use bindery::{BookSource, ComposeOptions, ContentNode, NodeKind, compose};
//!
//! # #[cfg(feature = "chrome")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = bindery::render::ChromiumEngine::launch()?;
//!
//! let mut source = BookSource::new("Field Notes")
//!     .with_node(ContentNode::new("intro", NodeKind::Chapter, "Introduction"));
//! source.templates.cover = Some("<h1>{{BOOK_TITLE}}</h1>".into());
//! source.templates.toc = Some("<h1>Contents</h1>{{TOC_ROWS}}".into());
//!
//! let book = compose(&engine, &source, &ComposeOptions::default())?;
//! std::fs::write("book.pdf", &book.bytes)?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "chrome"))]
//! # fn main() {}
//! ```
//!
//! The pipeline is a pure function of its input: no ambient state is kept,
//! and on failure no partial output survives. Recoverable
//! degradations (a chapter anchor the layout engine swallowed, a TOC that
//! never stabilized) are reported on [`ComposedBook`] instead of failing
//! the request.

pub mod anchor;
pub mod assemble;
pub mod error;
pub mod linearize;
pub mod model;
pub mod pipeline;
pub mod ranges;
pub mod render;
pub mod stamp;
pub mod synth;
pub mod toc;

pub use anchor::AnchorMap;
pub use assemble::PageCounts;
pub use error::{Error, Result};
pub use linearize::linearize;
pub use model::{BookSource, ContentNode, LinearNode, NodeKind, TemplateSet};
pub use pipeline::{ComposeOptions, ComposedBook, compose};
pub use ranges::ChapterRange;
pub use render::{FragmentKind, PageStream, RenderEngine, RenderedFragment};
pub use toc::TocEntry;
