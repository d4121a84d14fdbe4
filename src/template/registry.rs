//! Registry of named templates.

use std::collections::HashMap;
use std::rc::Rc;

use super::{Element, Template, TemplateRef};
use crate::error::{Result, TempoError};

/// Stores templates by name.
///
/// Pure data storage: defining or looking up templates has no effect beyond
/// the registry itself. Tags live in scopes, not here.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateRef>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `elements` under `name`, replacing any earlier definition.
    pub fn define(&mut self, name: &str, elements: Vec<Element>) -> Result<TemplateRef> {
        if name.is_empty() {
            return Err(TempoError::InvalidName {
                name: name.to_string(),
            });
        }
        let template = Rc::new(Template::new(name, elements));
        self.templates.insert(name.to_string(), Rc::clone(&template));
        Ok(template)
    }

    pub fn lookup(&self, name: &str) -> Result<TemplateRef> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| TempoError::template_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// All template names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn clear(&mut self) {
        self.templates.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntryKind;

    #[test]
    fn test_define_and_lookup() {
        let mut registry = TemplateRegistry::new();
        registry
            .define("greet", vec!["Hello, ".into(), Element::Point, "!".into()])
            .unwrap();

        let template = registry.lookup("greet").unwrap();
        assert_eq!(template.name(), "greet");
        assert_eq!(template.elements().len(), 3);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let mut registry = TemplateRegistry::new();
        let err = registry.define("", vec![]).unwrap_err();
        assert!(matches!(err, TempoError::InvalidName { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lookup_missing_template() {
        let registry = TemplateRegistry::new();
        match registry.lookup("nope") {
            Err(TempoError::NotFound { kind, name }) => {
                assert_eq!(kind, EntryKind::Template);
                assert_eq!(name, "nope");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_redefinition_replaces_but_old_refs_survive() {
        let mut registry = TemplateRegistry::new();
        let old = registry.define("t", vec!["old".into()]).unwrap();
        registry.define("t", vec!["new".into(), "er".into()]).unwrap();

        assert_eq!(old.elements().len(), 1);
        assert_eq!(registry.lookup("t").unwrap().elements().len(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_are_sorted() {
        let mut registry = TemplateRegistry::new();
        for name in ["while", "for", "if"] {
            registry.define(name, vec![]).unwrap();
        }
        assert_eq!(registry.names(), vec!["for", "if", "while"]);
    }
}
