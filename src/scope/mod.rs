//! Tag scopes: tag vocabularies with the finder that locates a candidate.
//!
//! A scope maps short tags to templates. Its [`MatchFinder`] pulls the
//! candidate text out of the buffer just before point, and
//! [`TagScope::classify`] decides whether that text names a tag, completes
//! uniquely to one, or only extends to a longer shared prefix.

use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

use crate::editor::{BackwardPattern, Buffer, MatchResult};
use crate::error::Result;
use crate::template::TemplateRef;

/// Name of the scope every buffer falls back to.
pub const GLOBAL_SCOPE: &str = "global";

/// Finder used by the global scope: the word before point.
pub const DEFAULT_FINDER: &str = r"\b(\w+)";

static WORD_FINDER: LazyLock<BackwardPattern> = LazyLock::new(|| {
    BackwardPattern::new(DEFAULT_FINDER).expect("default finder pattern is valid")
});

type FinderFn = dyn Fn(&dyn Buffer) -> Option<MatchResult>;

/// Locates the completion candidate before point.
#[derive(Clone)]
pub enum MatchFinder {
    /// Backward search; the pattern is anchored at point.
    Pattern(BackwardPattern),
    Function(Rc<FinderFn>),
}

impl MatchFinder {
    /// Compile a backward-search pattern. Group 1, if any, is the candidate.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(Self::Pattern(BackwardPattern::new(pattern)?))
    }

    pub fn function(f: impl Fn(&dyn Buffer) -> Option<MatchResult> + 'static) -> Self {
        Self::Function(Rc::new(f))
    }

    pub fn word() -> Self {
        Self::Pattern(WORD_FINDER.clone())
    }

    pub fn find(&self, buffer: &dyn Buffer) -> Option<MatchResult> {
        match self {
            Self::Pattern(re) => buffer.search_backward(re),
            Self::Function(f) => f(buffer),
        }
    }
}

impl Default for MatchFinder {
    fn default() -> Self {
        Self::word()
    }
}

impl fmt::Debug for MatchFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// A tag and the template it expands to.
#[derive(Debug, Clone)]
pub struct TagEntry {
    pub tag: String,
    pub template: TemplateRef,
}

/// How a candidate string relates to a scope's tags.
#[derive(Debug, Clone)]
pub enum ScopeMatch<'a> {
    /// No tag starts with the candidate.
    None,
    /// The candidate is a tag.
    Exact(&'a TagEntry),
    /// Exactly one tag starts with the candidate.
    Unique(&'a TagEntry),
    /// Several tags share the candidate; this is their longest common prefix.
    Ambiguous(String),
}

/// A named, ordered tag vocabulary.
#[derive(Debug, Clone)]
pub struct TagScope {
    name: String,
    finder: MatchFinder,
    tags: Vec<TagEntry>,
}

impl TagScope {
    pub fn new(name: impl Into<String>, finder: MatchFinder) -> Self {
        Self {
            name: name.into(),
            finder,
            tags: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn finder(&self) -> &MatchFinder {
        &self.finder
    }

    pub fn set_finder(&mut self, finder: MatchFinder) {
        self.finder = finder;
    }

    /// Add a tag. Returns `false` when the tag already exists; the first
    /// registration is kept.
    pub fn add_tag(&mut self, tag: &str, template: TemplateRef) -> bool {
        if self.lookup(tag).is_some() {
            return false;
        }
        self.tags.push(TagEntry {
            tag: tag.to_string(),
            template,
        });
        true
    }

    pub fn lookup(&self, tag: &str) -> Option<&TagEntry> {
        self.tags.iter().find(|entry| entry.tag == tag)
    }

    pub fn candidates<'a>(&'a self, prefix: &str) -> impl Iterator<Item = &'a TagEntry> {
        self.tags.iter().filter(move |entry| entry.tag.starts_with(prefix))
    }

    pub fn classify(&self, candidate: &str) -> ScopeMatch<'_> {
        if let Some(entry) = self.lookup(candidate) {
            return ScopeMatch::Exact(entry);
        }
        let matches: Vec<&TagEntry> = self.candidates(candidate).collect();
        match matches.as_slice() {
            [] => ScopeMatch::None,
            [only] => ScopeMatch::Unique(*only),
            many => ScopeMatch::Ambiguous(common_prefix(many.iter().map(|e| e.tag.as_str()))),
        }
    }
}

/// Longest common prefix, compared char by char.
pub fn common_prefix<'a>(mut strings: impl Iterator<Item = &'a str>) -> String {
    let Some(first) = strings.next() else {
        return String::new();
    };
    let mut prefix_len = first.len();
    for s in strings {
        prefix_len = first
            .char_indices()
            .zip(s.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, a), _)| i + a.len_utf8())
            .min(prefix_len);
    }
    first[..prefix_len].to_string()
}
