//! Host buffer interface and a rope-backed reference implementation.
//!
//! The engine never touches text directly. Everything goes through
//! [`Buffer`], so editors embed the engine by implementing that trait for
//! their own buffer type.

mod buffer;

pub use buffer::EditorBuffer;

use regex::Regex;

use crate::marks::Edit;

/// Identifies a buffer in the engine's per-buffer state.
pub type BufferId = u64;

/// A match-finder hit: the candidate text and where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub text: String,
    /// Char offset of the first char of `text`.
    pub start: usize,
}

/// A finder pattern compiled to match a candidate ending exactly at point.
///
/// The source pattern is wrapped as `^(?s:.*)((?:PAT))\z`. The greedy prefix
/// makes the candidate start as late as possible, so one search over the text
/// before point finds it.
#[derive(Debug, Clone)]
pub struct BackwardPattern {
    source: String,
    regex: Regex,
}

impl BackwardPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(r"^(?s:.*)((?:{pattern}))\z"))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written, before wrapping.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The candidate at the end of `haystack`. Capture group 1 of the source
    /// pattern is the candidate when it took part; otherwise the whole match.
    pub fn find_at_end(&self, haystack: &str) -> Option<MatchResult> {
        let caps = self.regex.captures(haystack)?;
        let found = caps.get(2).or_else(|| caps.get(1))?;
        Some(MatchResult {
            text: found.as_str().to_string(),
            start: haystack[..found.start()].chars().count(),
        })
    }
}

/// The narrow view of a text buffer the engine works through.
///
/// Positions are char offsets. `insert_text` inserts at point and leaves
/// point after the inserted text.
pub trait Buffer {
    fn id(&self) -> BufferId;

    fn position(&self) -> usize;

    fn set_position(&mut self, pos: usize);

    fn insert_text(&mut self, text: &str);

    /// Point and mark, in that order, when a region is active.
    fn region(&self) -> Option<(usize, usize)>;

    fn delete_range(&mut self, start: usize, end: usize);

    fn slice(&self, start: usize, end: usize) -> String;

    /// Start and end of the line containing point, excluding the newline.
    fn line_bounds(&self) -> (usize, usize);

    /// Reindent the current line and report the edits made.
    fn reindent_line(&mut self) -> Vec<Edit>;

    /// Ask the user for a string. `None` means the prompt was cancelled.
    fn prompt_user(&mut self, prompt: &str) -> Option<String>;

    /// Signal a failed or ambiguous completion.
    fn ding(&mut self) {}

    /// Search backward from point for `pattern`.
    fn search_backward(&self, pattern: &BackwardPattern) -> Option<MatchResult> {
        pattern.find_at_end(&self.slice(0, self.position()))
    }
}
