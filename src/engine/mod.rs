//! The engine context: templates, tag scopes and per-buffer state.
//!
//! One [`Engine`] holds everything that would otherwise be process-wide
//! state. Hosts create it at startup, register templates and scopes, and pass
//! it to every entry point along with the buffer being edited:
//!
//! - [`Engine::insert_template`] expands a template at point
//! - [`Engine::complete_tag`] completes the tag before point
//! - [`Engine::forward_mark`] / [`Engine::backward_mark`] move between marks

mod complete;
mod expand;

pub use complete::Completion;
pub use expand::Expansion;

use std::collections::HashMap;

use tracing::debug;

use crate::editor::{Buffer, BufferId};
use crate::error::{Result, TempoError};
use crate::marks::{Edit, MarkList};
use crate::scope::{GLOBAL_SCOPE, MatchFinder, TagScope};
use crate::template::{Element, TemplateRef, TemplateRegistry};

/// Default bound on nested and deferred element evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Transforms literal text before it is inserted.
pub type TextFilter = Box<dyn Fn(&str) -> String>;

/// Resolves a [`Element::Symbol`] to a concrete element.
pub type UserElement = Box<dyn Fn(&str) -> Option<Element>>;

/// Engine-wide behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Prompted points ask the user instead of leaving a mark.
    pub interactive: bool,
    /// Limit for nested elements and deferred re-evaluation.
    pub max_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interactive: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// State owned by a single buffer.
#[derive(Debug, Default)]
pub struct BufferState {
    marks: MarkList,
    /// Installed scopes, most recent first. The global scope is implicit.
    scopes: Vec<String>,
}

impl BufferState {
    pub const fn marks(&self) -> &MarkList {
        &self.marks
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Template expansion and tag completion context.
pub struct Engine {
    settings: Settings,
    registry: TemplateRegistry,
    global: TagScope,
    scopes: HashMap<String, TagScope>,
    filters: Vec<TextFilter>,
    user_elements: Vec<UserElement>,
    buffers: HashMap<BufferId, BufferState>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            registry: TemplateRegistry::new(),
            global: TagScope::new(GLOBAL_SCOPE, MatchFinder::word()),
            scopes: HashMap::new(),
            filters: Vec::new(),
            user_elements: Vec::new(),
            buffers: HashMap::new(),
        }
    }

    /// Drop every template, scope, hook and buffer state. Settings are kept.
    pub fn reset(&mut self) {
        debug!(
            templates = self.registry.len(),
            buffers = self.buffers.len(),
            "resetting engine"
        );
        *self = Self::with_settings(self.settings.clone());
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub const fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub const fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    // --- Templates and tags ---

    /// Store a template and optionally register a tag for it.
    ///
    /// The tag goes into `scope` (the global scope when `None`) unless that
    /// scope already has the same tag.
    pub fn define_template(
        &mut self,
        name: &str,
        elements: Vec<Element>,
        tag: Option<&str>,
        scope: Option<&str>,
    ) -> Result<TemplateRef> {
        // Resolve the scope first so a bad scope name leaves the registry untouched.
        self.scope(scope.unwrap_or(GLOBAL_SCOPE))?;
        let template = self.registry.define(name, elements)?;
        debug!(template = name, tag, scope, "defined template");
        if let Some(tag) = tag {
            self.add_tag(tag, &template, scope)?;
        }
        Ok(template)
    }

    pub fn lookup(&self, name: &str) -> Result<TemplateRef> {
        self.registry.lookup(name)
    }

    /// Add a tag to a scope. Returns `false` if the tag was already taken.
    pub fn add_tag(
        &mut self,
        tag: &str,
        template: &TemplateRef,
        scope: Option<&str>,
    ) -> Result<bool> {
        if tag.is_empty() {
            return Err(TempoError::InvalidName {
                name: tag.to_string(),
            });
        }
        let scope = self.scope_mut(scope.unwrap_or(GLOBAL_SCOPE))?;
        let added = scope.add_tag(tag, TemplateRef::clone(template));
        if !added {
            debug!(tag, scope = scope.name(), "tag already registered, keeping first");
        }
        Ok(added)
    }

    // --- Scopes ---

    /// Create a named scope, or replace the finder of an existing one.
    ///
    /// Naming the global scope changes its finder.
    pub fn define_scope(&mut self, name: &str, finder: MatchFinder) -> Result<()> {
        if name.is_empty() {
            return Err(TempoError::InvalidName {
                name: name.to_string(),
            });
        }
        if name == GLOBAL_SCOPE {
            self.global.set_finder(finder);
            return Ok(());
        }
        self.scopes
            .entry(name.to_string())
            .and_modify(|scope| scope.set_finder(finder.clone()))
            .or_insert_with(|| TagScope::new(name, finder));
        Ok(())
    }

    pub fn scope(&self, name: &str) -> Result<&TagScope> {
        if name == GLOBAL_SCOPE {
            return Ok(&self.global);
        }
        self.scopes
            .get(name)
            .ok_or_else(|| TempoError::scope_not_found(name))
    }

    fn scope_mut(&mut self, name: &str) -> Result<&mut TagScope> {
        if name == GLOBAL_SCOPE {
            return Ok(&mut self.global);
        }
        self.scopes
            .get_mut(name)
            .ok_or_else(|| TempoError::scope_not_found(name))
    }

    /// Install a scope on a buffer, above the scopes installed before it.
    /// Installing a scope twice keeps its original position.
    pub fn use_scope(&mut self, buffer: BufferId, scope: &str) -> Result<()> {
        self.scope(scope)?;
        if scope == GLOBAL_SCOPE {
            return Ok(());
        }
        let state = self.buffers.entry(buffer).or_default();
        if !state.scopes.iter().any(|s| s == scope) {
            state.scopes.insert(0, scope.to_string());
        }
        Ok(())
    }

    /// Scopes in completion order for a buffer, global last.
    pub fn active_scopes(&self, buffer: BufferId) -> Vec<&TagScope> {
        let installed = self
            .buffers
            .get(&buffer)
            .map(|state| state.scopes.as_slice())
            .unwrap_or_default();
        installed
            .iter()
            .filter_map(|name| self.scopes.get(name))
            .chain(std::iter::once(&self.global))
            .collect()
    }

    // --- Hooks ---

    /// Append a filter to the chain literal text passes through.
    pub fn add_text_filter(&mut self, filter: impl Fn(&str) -> String + 'static) {
        self.filters.push(Box::new(filter));
    }

    /// Register a handler for symbol elements. Handlers are tried in order.
    pub fn add_user_element(&mut self, handler: impl Fn(&str) -> Option<Element> + 'static) {
        self.user_elements.push(Box::new(handler));
    }

    // --- Marks ---

    pub fn buffer_state(&self, buffer: BufferId) -> Option<&BufferState> {
        self.buffers.get(&buffer)
    }

    /// Mark positions for a buffer, ascending.
    pub fn marks(&self, buffer: BufferId) -> &[usize] {
        self.buffers
            .get(&buffer)
            .map(|state| state.marks.all())
            .unwrap_or_default()
    }

    pub fn clear_marks(&mut self, buffer: BufferId) {
        if let Some(state) = self.buffers.get_mut(&buffer) {
            state.marks.clear();
        }
    }

    /// Move point to the next mark. Point stays put when there is none.
    pub fn forward_mark(&self, buffer: &mut dyn Buffer) -> Option<usize> {
        let next = self
            .buffers
            .get(&buffer.id())?
            .marks
            .forward(buffer.position())?;
        buffer.set_position(next);
        Some(next)
    }

    /// Move point to the previous mark. Point stays put when there is none.
    pub fn backward_mark(&self, buffer: &mut dyn Buffer) -> Option<usize> {
        let prev = self
            .buffers
            .get(&buffer.id())?
            .marks
            .backward(buffer.position())?;
        buffer.set_position(prev);
        Some(prev)
    }

    /// Report an edit the host made so the buffer's marks follow it.
    pub fn notify_edit(&mut self, buffer: BufferId, edit: &Edit) {
        if let Some(state) = self.buffers.get_mut(&buffer) {
            state.marks.apply(edit);
        }
    }

    /// Drop all state for a closed buffer.
    pub fn forget_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_some() {
            debug!(buffer, "forgot buffer state");
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("templates", &self.registry.len())
            .field("scopes", &self.scopes.len())
            .field("filters", &self.filters.len())
            .field("user_elements", &self.user_elements.len())
            .field("buffers", &self.buffers.len())
            .finish()
    }
}
