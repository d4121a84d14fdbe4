//! Tag completion across a buffer's scope stack.

use tracing::{debug, trace};

use super::{Engine, Expansion};
use crate::editor::{Buffer, MatchResult};
use crate::error::Result;
use crate::marks::Edit;
use crate::scope::ScopeMatch;
use crate::template::TemplateRef;

/// Result of [`Engine::complete_tag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The tag before point was replaced by its template.
    Expanded { tag: String, expansion: Expansion },
    /// Several tags matched; the candidate was replaced by their common
    /// prefix. `progressed` is false when that prefix added nothing.
    Partial { prefix: String, progressed: bool },
    NoMatch,
}

/// What to do once a scope has claimed the candidate.
enum Decision {
    Expand {
        tag: String,
        template: TemplateRef,
        found: MatchResult,
    },
    Extend {
        prefix: String,
        found: MatchResult,
    },
}

impl Engine {
    /// Complete the tag before point.
    ///
    /// Scopes are tried from the most recently installed down to the global
    /// scope. The first scope whose finder produces a candidate that is a tag,
    /// or a prefix of one or more tags, decides the outcome. Unless `silent`,
    /// the buffer dings on an ambiguous completion that made no progress and
    /// when no scope matches at all.
    pub fn complete_tag(&mut self, buffer: &mut dyn Buffer, silent: bool) -> Result<Completion> {
        let Some(decision) = self.decide(buffer) else {
            debug!(pos = buffer.position(), "no tag matched in any scope");
            if !silent {
                buffer.ding();
            }
            return Ok(Completion::NoMatch);
        };

        match decision {
            Decision::Expand {
                tag,
                template,
                found,
            } => {
                self.delete_candidate(buffer, &found);
                let expansion = self.insert_template(buffer, &template, false)?;
                Ok(Completion::Expanded { tag, expansion })
            }
            Decision::Extend { prefix, found } => {
                self.delete_candidate(buffer, &found);
                let at = buffer.position();
                buffer.insert_text(&prefix);
                self.notify_edit(
                    buffer.id(),
                    &Edit::Insert {
                        at,
                        len: prefix.chars().count(),
                    },
                );
                let progressed = prefix != found.text;
                if !progressed && !silent {
                    buffer.ding();
                }
                debug!(prefix = prefix.as_str(), progressed, "completed to common prefix");
                Ok(Completion::Partial { prefix, progressed })
            }
        }
    }

    /// Expand the tag before point only if it exactly names a tag in one of
    /// the active scopes. Returns whether an expansion happened.
    pub fn expand_if_complete(&mut self, buffer: &mut dyn Buffer) -> Result<bool> {
        let exact = self.active_scopes(buffer.id()).into_iter().find_map(|scope| {
            let found = scope.finder().find(&*buffer)?;
            let entry = scope.lookup(&found.text)?;
            Some((TemplateRef::clone(&entry.template), found))
        });
        let Some((template, found)) = exact else {
            return Ok(false);
        };
        self.delete_candidate(buffer, &found);
        self.insert_template(buffer, &template, false)?;
        Ok(true)
    }

    fn decide(&self, buffer: &dyn Buffer) -> Option<Decision> {
        for scope in self.active_scopes(buffer.id()) {
            let Some(found) = scope.finder().find(buffer) else {
                trace!(scope = scope.name(), "finder found no candidate");
                continue;
            };
            let decision = match scope.classify(&found.text) {
                ScopeMatch::None => {
                    trace!(
                        scope = scope.name(),
                        candidate = found.text.as_str(),
                        "no tag in scope, falling back"
                    );
                    continue;
                }
                ScopeMatch::Exact(entry) | ScopeMatch::Unique(entry) => Decision::Expand {
                    tag: entry.tag.clone(),
                    template: TemplateRef::clone(&entry.template),
                    found,
                },
                ScopeMatch::Ambiguous(prefix) => Decision::Extend { prefix, found },
            };
            debug!(scope = scope.name(), "scope claimed completion");
            return Some(decision);
        }
        None
    }

    fn delete_candidate(&mut self, buffer: &mut dyn Buffer, found: &MatchResult) {
        let end = buffer.position();
        if found.start >= end {
            return;
        }
        buffer.delete_range(found.start, end);
        self.notify_edit(
            buffer.id(),
            &Edit::Delete {
                start: found.start,
                end,
            },
        );
    }
}
