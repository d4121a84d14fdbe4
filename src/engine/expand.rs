//! Template interpretation.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::{Engine, Settings, TextFilter, UserElement};
use crate::editor::Buffer;
use crate::error::{Result, TempoError};
use crate::marks::{Edit, MarkList};
use crate::template::{Element, EvalContext, Prompt, TemplateRef};

/// Where an expansion put its text and left point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expansion {
    pub start: usize,
    pub end: usize,
    pub cursor: usize,
}

impl Engine {
    /// Expand `template` at point.
    ///
    /// With `on_region`, the buffer's region is normalized so expansion starts
    /// at its beginning and region points jump to its far end. After the
    /// elements are processed, point moves to the first mark after the start.
    pub fn insert_template(
        &mut self,
        buffer: &mut dyn Buffer,
        template: &TemplateRef,
        on_region: bool,
    ) -> Result<Expansion> {
        let id = buffer.id();
        let region_end = if on_region {
            let (point, mark) = buffer
                .region()
                .ok_or(TempoError::MissingRegion { buffer: id })?;
            let (start, end) = if point <= mark {
                (point, mark)
            } else {
                (mark, point)
            };
            buffer.set_position(start);
            Some(end)
        } else {
            None
        };

        let start = buffer.position();
        debug!(template = template.name(), start, on_region, "expanding template");

        let state = self.buffers.entry(id).or_default();
        let mut expander = Expander {
            settings: &self.settings,
            filters: &self.filters,
            user_elements: &self.user_elements,
            marks: &mut state.marks,
            on_region,
            origin: start,
            region_end,
            named: HashMap::new(),
        };

        expander.marks.add(start);
        for element in template.elements() {
            if let Err(err) = expander.process(buffer, element, 0) {
                debug!(template = template.name(), %err, "expansion aborted");
                return Err(err);
            }
        }
        let end = buffer.position();
        expander.marks.add(end);

        let origin = expander.origin;
        let cursor = expander.marks.forward(origin).unwrap_or(origin);
        buffer.set_position(cursor);
        debug!(template = template.name(), start = origin, end, cursor, "expanded template");

        Ok(Expansion {
            start: origin,
            end,
            cursor,
        })
    }

    /// Look up a template by name and expand it.
    pub fn insert_named(
        &mut self,
        buffer: &mut dyn Buffer,
        name: &str,
        on_region: bool,
    ) -> Result<Expansion> {
        let template = self.lookup(name)?;
        self.insert_template(buffer, &template, on_region)
    }
}

/// Walks one template's elements against one buffer.
struct Expander<'a> {
    settings: &'a Settings,
    filters: &'a [TextFilter],
    user_elements: &'a [UserElement],
    marks: &'a mut MarkList,
    on_region: bool,
    /// Expansion start, kept in step with edits.
    origin: usize,
    /// Far end of the region while wrapping one.
    region_end: Option<usize>,
    /// Answers of named prompts, forgotten when the expansion ends.
    named: HashMap<String, String>,
}

impl Expander<'_> {
    fn process(&mut self, buffer: &mut dyn Buffer, element: &Element, depth: usize) -> Result<()> {
        if depth > self.settings.max_depth {
            return Err(TempoError::RecursionLimit {
                limit: self.settings.max_depth,
            });
        }
        trace!(kind = element.kind(), depth, pos = buffer.position(), "element");

        match element {
            Element::Text(text) => {
                let text = self
                    .filters
                    .iter()
                    .fold(text.clone(), |acc, filter| filter(&acc));
                self.insert(buffer, &text);
            }
            Element::Point => self.mark(buffer),
            Element::Prompt(prompt) => {
                if self.settings.interactive || prompt.always {
                    self.prompt(buffer, prompt)?;
                } else {
                    self.mark(buffer);
                }
            }
            Element::RegionPoint { indent } => {
                if self.on_region {
                    self.exchange_region(buffer);
                    if *indent {
                        self.reindent(buffer);
                    }
                } else {
                    self.mark(buffer);
                }
            }
            Element::RegionPrompt { prompt, indent } => {
                if self.settings.interactive {
                    self.prompt(buffer, prompt)?;
                } else if self.on_region {
                    self.exchange_region(buffer);
                    if *indent {
                        self.reindent(buffer);
                    }
                } else {
                    self.mark(buffer);
                }
            }
            Element::ConditionalNewline => {
                let (line_start, _) = buffer.line_bounds();
                let before = buffer.slice(line_start, buffer.position());
                if !before.trim().is_empty() {
                    self.insert(buffer, "\n");
                }
            }
            Element::ConditionalNewlineAfter => {
                let (_, line_end) = buffer.line_bounds();
                let after = buffer.slice(buffer.position(), line_end);
                if !after.trim().is_empty() {
                    self.insert(buffer, "\n");
                }
            }
            Element::Newline => self.insert(buffer, "\n"),
            Element::NewlineIndent => {
                self.insert(buffer, "\n");
                self.reindent(buffer);
            }
            Element::Reindent => self.reindent(buffer),
            Element::Saved(name) => {
                if let Some(value) = self.named.get(name).cloned() {
                    self.insert(buffer, &value);
                } else {
                    trace!(name = name.as_str(), "no saved insertion");
                }
            }
            Element::List(elements) => {
                for element in elements {
                    self.process(buffer, element, depth + 1)?;
                }
            }
            Element::Template(template) => {
                for element in template.elements() {
                    self.process(buffer, element, depth + 1)?;
                }
            }
            Element::Symbol(name) => {
                let resolved = self
                    .user_elements
                    .iter()
                    .find_map(|handler| handler(name))
                    .ok_or_else(|| TempoError::UnknownElement { name: name.clone() })?;
                self.process(buffer, &resolved, depth + 1)?;
            }
            Element::Empty => {}
            Element::Deferred(deferred) => {
                let ctx = EvalContext::new(buffer.position(), self.on_region, &self.named);
                let result = deferred.evaluate(&ctx);
                self.process(buffer, &result, depth + 1)?;
            }
        }
        Ok(())
    }

    fn insert(&mut self, buffer: &mut dyn Buffer, text: &str) {
        if text.is_empty() {
            return;
        }
        let at = buffer.position();
        buffer.insert_text(text);
        self.track(&Edit::Insert {
            at,
            len: text.chars().count(),
        });
    }

    fn mark(&mut self, buffer: &dyn Buffer) {
        self.marks.add(buffer.position());
    }

    fn prompt(&mut self, buffer: &mut dyn Buffer, prompt: &Prompt) -> Result<()> {
        let answer = buffer
            .prompt_user(&prompt.prompt)
            .ok_or_else(|| TempoError::PromptCancelled {
                prompt: prompt.prompt.clone(),
            })?;
        self.insert(buffer, &answer);
        if let Some(name) = &prompt.name {
            self.named.insert(name.clone(), answer);
        }
        Ok(())
    }

    /// Swap point with the far end of the region.
    fn exchange_region(&mut self, buffer: &mut dyn Buffer) {
        if let Some(end) = self.region_end {
            self.region_end = Some(buffer.position());
            buffer.set_position(end);
        }
    }

    fn reindent(&mut self, buffer: &mut dyn Buffer) {
        for edit in buffer.reindent_line() {
            self.track(&edit);
        }
    }

    fn track(&mut self, edit: &Edit) {
        self.marks.apply(edit);
        self.origin = edit.adjust(self.origin);
        self.region_end = self.region_end.map(|pos| edit.adjust(pos));
    }
}
