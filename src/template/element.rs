use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A named, immutable element sequence.
#[derive(Debug)]
pub struct Template {
    name: String,
    elements: Vec<Element>,
}

/// Shared handle to a registered template.
///
/// Redefining a template replaces the registry entry; handles obtained earlier
/// keep pointing at the old sequence.
pub type TemplateRef = Rc<Template>;

impl Template {
    pub(crate) fn new(name: impl Into<String>, elements: Vec<Element>) -> Self {
        Self {
            name: name.into(),
            elements,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }
}

/// An interactive insertion point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Text shown to the user.
    pub prompt: String,
    /// Save the answer under this name for later `Saved` elements.
    pub name: Option<String>,
    /// Prompt even when interactive prompting is disabled.
    pub always: bool,
}

impl Prompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            name: None,
            always: false,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn always(mut self) -> Self {
        self.always = true;
        self
    }
}

/// What a deferred element sees when it is evaluated.
#[derive(Debug)]
pub struct EvalContext<'a> {
    /// Point at the time of evaluation.
    pub position: usize,
    /// Whether the enclosing expansion wraps a region.
    pub on_region: bool,
    named: &'a HashMap<String, String>,
}

impl<'a> EvalContext<'a> {
    pub(crate) const fn new(
        position: usize,
        on_region: bool,
        named: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            position,
            on_region,
            named,
        }
    }

    /// A value saved by an earlier named prompt in the same expansion.
    pub fn named(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }
}

/// Host-supplied expression evaluated at expansion time.
#[derive(Clone)]
pub struct Deferred(Rc<dyn Fn(&EvalContext<'_>) -> Element>);

impl Deferred {
    pub fn new(f: impl Fn(&EvalContext<'_>) -> Element + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub(crate) fn evaluate(&self, ctx: &EvalContext<'_>) -> Element {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}

/// One unit of a template.
#[derive(Debug, Clone)]
pub enum Element {
    /// Literal text, run through the text filters before insertion.
    Text(String),
    /// Mark the current position.
    Point,
    /// Prompt for text, or mark the position when not interactive.
    Prompt(Prompt),
    /// Jump to the far end of the wrapped region, or mark the position.
    /// With `indent`, the line is reindented after the jump.
    RegionPoint { indent: bool },
    /// Prompt when interactive, otherwise behave like `RegionPoint`.
    RegionPrompt { prompt: Prompt, indent: bool },
    /// Newline unless only whitespace precedes point on the line.
    ConditionalNewline,
    /// Newline unless only whitespace follows point on the line.
    ConditionalNewlineAfter,
    Newline,
    /// Newline, then reindent the new line.
    NewlineIndent,
    Reindent,
    /// Re-insert the answer saved under a name.
    Saved(String),
    List(Vec<Element>),
    /// Splice in another template's elements.
    Template(TemplateRef),
    /// Resolved by the engine's user-element handlers.
    Symbol(String),
    Empty,
    Deferred(Deferred),
}

impl Element {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self::Prompt(Prompt::new(prompt))
    }

    pub const fn region() -> Self {
        Self::RegionPoint { indent: false }
    }

    pub fn deferred(f: impl Fn(&EvalContext<'_>) -> Element + 'static) -> Self {
        Self::Deferred(Deferred::new(f))
    }

    /// Short kind name used in log output.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Point => "point",
            Self::Prompt(_) => "prompt",
            Self::RegionPoint { .. } => "region",
            Self::RegionPrompt { .. } => "region-prompt",
            Self::ConditionalNewline => "conditional-newline",
            Self::ConditionalNewlineAfter => "conditional-newline-after",
            Self::Newline => "newline",
            Self::NewlineIndent => "newline-indent",
            Self::Reindent => "reindent",
            Self::Saved(_) => "saved",
            Self::List(_) => "list",
            Self::Template(_) => "template",
            Self::Symbol(_) => "symbol",
            Self::Empty => "empty",
            Self::Deferred(_) => "deferred",
        }
    }
}

impl From<&str> for Element {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Element {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<TemplateRef> for Element {
    fn from(template: TemplateRef) -> Self {
        Self::Template(template)
    }
}
