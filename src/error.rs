//! Error types for template definition, expansion and completion.

use thiserror::Error;

/// What kind of registry entry a failed lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Template,
    Scope,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Template => f.write_str("template"),
            Self::Scope => f.write_str("scope"),
        }
    }
}

/// Errors raised by the engine.
///
/// All of these are recoverable at the call site. A failed expansion leaves
/// whatever text was already inserted in place.
#[derive(Debug, Error)]
pub enum TempoError {
    /// Template or scope names must be non-empty.
    #[error("invalid name: {name:?}")]
    InvalidName { name: String },

    /// Lookup of an undefined template or scope.
    #[error("{kind} not found: {name}")]
    NotFound { kind: EntryKind, name: String },

    /// A symbol element no user-element handler claimed.
    #[error("unknown template element: {name}")]
    UnknownElement { name: String },

    /// Deferred or nested elements recursed past the configured depth.
    #[error("element nesting exceeded the limit of {limit}")]
    RecursionLimit { limit: usize },

    /// The user cancelled a prompt; the rest of the template was skipped.
    #[error("prompt cancelled: {prompt}")]
    PromptCancelled { prompt: String },

    /// `on_region` expansion was requested but the buffer has no region.
    #[error("no region is active in buffer {buffer}")]
    MissingRegion { buffer: u64 },

    /// A match-finder pattern failed to compile.
    #[error("invalid match-finder pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl TempoError {
    pub(crate) fn template_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntryKind::Template,
            name: name.into(),
        }
    }

    pub(crate) fn scope_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntryKind::Scope,
            name: name.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TempoError>;
