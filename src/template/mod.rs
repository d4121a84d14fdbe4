//! Templates and the registry that stores them.
//!
//! A template is an ordered sequence of [`Element`]s: literal text, points of
//! interest, prompts, layout directives and deferred expressions the host
//! evaluates at expansion time.

mod element;
mod registry;

pub use element::{Deferred, Element, EvalContext, Prompt, Template, TemplateRef};
pub use registry::TemplateRegistry;
