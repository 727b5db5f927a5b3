//! Error types for bindery operations.

use thiserror::Error;

use crate::render::FragmentKind;

/// Errors that can occur while composing a book.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// A render-engine failure not yet attributed to a fragment. Engine
    /// implementations return this; the pipeline converts it to
    /// [`Error::RenderFailure`] or [`Error::RenderTimeout`] once the
    /// fragment being rendered is known.
    #[error("render engine failure: {0}")]
    Engine(String),

    #[error("missing required fragment: {0}")]
    MissingFragment(FragmentKind),

    #[error("invalid content tree: {0}")]
    InvalidTree(String),

    #[error("render engine failed for {kind} fragment: {message}")]
    RenderFailure { kind: FragmentKind, message: String },

    #[error("render engine exceeded the time budget for {kind} fragment")]
    RenderTimeout { kind: FragmentKind },
}

impl Error {
    /// Attribute an engine-level failure to the fragment being rendered.
    pub(crate) fn for_fragment(self, kind: FragmentKind) -> Self {
        match self {
            Error::Engine(message) => Error::RenderFailure { kind, message },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
