// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. scope::TagScope)
    clippy::module_name_repetitions
)]

//! # Tempo
//!
//! Template expansion for text buffers.
//!
//! Tempo inserts structured templates into a buffer with:
//! - Marks at interesting positions, navigable after insertion
//! - Prompts for user input, with named answers reusable later on
//! - Region wrapping around an existing selection
//! - Tag completion with per-buffer scopes falling back to a global one
//!
//! ## Architecture
//!
//! All state lives in an [`engine::Engine`]. The host supplies buffers by
//! implementing [`editor::Buffer`]; every edit the engine makes goes through
//! that trait, and marks are adjusted as text moves underneath them.
//!
//! ## Modules
//!
//! - [`template`]: Template elements and the named registry
//! - [`engine`]: Expansion, completion and per-buffer state
//! - [`marks`]: Ordered mark positions and edit tracking
//! - [`scope`]: Tag scopes and match finders
//! - [`editor`]: The buffer trait and a rope-backed implementation
//! - [`library`]: JSON5 template library files
//! - [`config`]: Saved command-line defaults
//! - [`error`]: Library error type

pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod library;
pub mod marks;
pub mod scope;
pub mod template;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::editor::{Buffer, EditorBuffer};
    pub use crate::engine::{Completion, Engine, Expansion, Settings};
    pub use crate::error::{Result, TempoError};
    pub use crate::marks::Edit;
    pub use crate::scope::MatchFinder;
    pub use crate::template::{Element, Prompt, TemplateRef};
}
