//! Content model for book composition.
//!
//! [`BookSource`] is the input to the pipeline: an ordered content tree,
//! template markup for the independently rendered documents, and a TOC
//! depth. [`LinearNode`] is the flattened reading order every later stage
//! works from.

/// Kind of a node in the content tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "cli",
    derive(serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum NodeKind {
    Part,
    Chapter,
    Heading,
}

/// A node of the authored content tree.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(serde::Deserialize))]
pub struct ContentNode {
    /// Stable identifier. Restricted to `[A-Za-z0-9_-]+` so embedded anchor
    /// tokens can be parsed back out of extracted page text.
    pub id: String,
    #[cfg_attr(feature = "cli", serde(default))]
    pub parent_id: Option<String>,
    pub kind: NodeKind,
    pub title: String,
    /// Explicit sibling order key; ties are broken by id.
    #[cfg_attr(feature = "cli", serde(default))]
    pub order: i64,
    /// Authored body markup, inserted verbatim into the content document.
    #[cfg_attr(feature = "cli", serde(default))]
    pub body: String,
}

impl ContentNode {
    pub fn new(id: impl Into<String>, kind: NodeKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            kind,
            title: title.into(),
            order: 0,
            body: String::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// A node of the flattened reading order. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearNode {
    pub id: String,
    pub kind: NodeKind,
    pub title: String,
    /// 1-based depth in the tree.
    pub level: usize,
    /// Id of the nearest enclosing (or self) chapter, if any.
    pub chapter_id: Option<String>,
    /// Title of the nearest enclosing (or self) chapter; empty outside any
    /// chapter.
    pub chapter_title: String,
    pub body: String,
}

/// Template markup for the independently rendered documents.
///
/// Templates are body markup with `{{TOKEN}}` placeholders; the synthesizer
/// wraps them into complete HTML documents. Recognized tokens are
/// `{{BOOK_TITLE}}`, `{{BOOK_AUTHOR}}`, `{{YEAR}}`, and (TOC only)
/// `{{TOC_ROWS}}`.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "cli", derive(serde::Deserialize))]
pub struct TemplateSet {
    /// Cover page markup. Required; composition fails without it.
    #[cfg_attr(feature = "cli", serde(default))]
    pub cover: Option<String>,
    /// Front-matter markup.
    #[cfg_attr(feature = "cli", serde(default))]
    pub front: Option<String>,
    /// TOC skeleton markup containing a `{{TOC_ROWS}}` placeholder. Without
    /// it the book has no table of contents.
    #[cfg_attr(feature = "cli", serde(default))]
    pub toc: Option<String>,
}

/// Everything needed to compose one book.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(serde::Deserialize))]
pub struct BookSource {
    pub title: String,
    #[cfg_attr(feature = "cli", serde(default))]
    pub author: Option<String>,
    #[cfg_attr(feature = "cli", serde(default))]
    pub year: Option<String>,
    /// Maximum TOC entry depth; clamped to 1..=6.
    #[cfg_attr(feature = "cli", serde(default = "default_toc_depth"))]
    pub toc_depth: usize,
    pub nodes: Vec<ContentNode>,
    #[cfg_attr(feature = "cli", serde(default))]
    pub templates: TemplateSet,
    /// Stylesheet handed to the render engine with every document.
    #[cfg_attr(feature = "cli", serde(default))]
    pub css: String,
}

impl BookSource {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
            year: None,
            toc_depth: default_toc_depth(),
            nodes: Vec::new(),
            templates: TemplateSet::default(),
            css: String::new(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_node(mut self, node: ContentNode) -> Self {
        self.nodes.push(node);
        self
    }
}

fn default_toc_depth() -> usize {
    3
}
