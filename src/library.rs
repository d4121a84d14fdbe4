//! Template library files.
//!
//! A library is a JSON5 document listing scopes and templates:
//!
//! ```json5
//! {
//!   scopes: [{ name: "html", finder: "(<\\w*)" }],
//!   templates: [
//!     { name: "greet", tag: "gr", elements: ["Hello, ", { kind: "point" }, "!"] },
//!   ],
//! }
//! ```
//!
//! Plain strings are literal text; objects carry a `kind`. Templates are
//! installed in file order, so `include` can only name templates defined
//! earlier.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::engine::Engine;
use crate::scope::MatchFinder;
use crate::template::{Element, Prompt};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Library {
    #[serde(default)]
    pub scopes: Vec<ScopeSpec>,
    #[serde(default)]
    pub templates: Vec<TemplateSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeSpec {
    pub name: String,
    /// Backward-search pattern; the word finder when absent.
    #[serde(default)]
    pub finder: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSpec {
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    pub elements: Vec<ElementSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ElementSpec {
    Text(String),
    Directive(Directive),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Directive {
    Point,
    Prompt {
        prompt: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        always: bool,
    },
    Region {
        #[serde(default)]
        prompt: Option<String>,
        /// Only meaningful with `prompt`.
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        always: bool,
        #[serde(default)]
        indent: bool,
    },
    Newline,
    NewlineIndent,
    ConditionalNewline,
    ConditionalNewlineAfter,
    Indent,
    Saved {
        name: String,
    },
    List {
        elements: Vec<ElementSpec>,
    },
    Symbol {
        name: String,
    },
    Empty,
    Include {
        template: String,
    },
}

impl ElementSpec {
    /// Build the engine element. `include` is resolved against templates
    /// already defined in `engine`.
    pub fn to_element(&self, engine: &Engine) -> crate::error::Result<Element> {
        let directive = match self {
            Self::Text(text) => return Ok(Element::text(text.clone())),
            Self::Directive(directive) => directive,
        };
        let element = match directive {
            Directive::Point => Element::Point,
            Directive::Prompt {
                prompt,
                name,
                always,
            } => Element::Prompt(Prompt {
                prompt: prompt.clone(),
                name: name.clone(),
                always: *always,
            }),
            Directive::Region {
                prompt: Some(prompt),
                name,
                always,
                indent,
            } => Element::RegionPrompt {
                prompt: Prompt {
                    prompt: prompt.clone(),
                    name: name.clone(),
                    always: *always,
                },
                indent: *indent,
            },
            Directive::Region {
                prompt: None,
                indent,
                ..
            } => Element::RegionPoint { indent: *indent },
            Directive::Newline => Element::Newline,
            Directive::NewlineIndent => Element::NewlineIndent,
            Directive::ConditionalNewline => Element::ConditionalNewline,
            Directive::ConditionalNewlineAfter => Element::ConditionalNewlineAfter,
            Directive::Indent => Element::Reindent,
            Directive::Saved { name } => Element::Saved(name.clone()),
            Directive::List { elements } => Element::List(
                elements
                    .iter()
                    .map(|spec| spec.to_element(engine))
                    .collect::<crate::error::Result<_>>()?,
            ),
            Directive::Symbol { name } => Element::Symbol(name.clone()),
            Directive::Empty => Element::Empty,
            Directive::Include { template } => Element::Template(engine.lookup(template)?),
        };
        Ok(element)
    }
}

impl Library {
    /// Define every scope, then every template, in file order.
    ///
    /// Returns the number of templates installed.
    pub fn install(&self, engine: &mut Engine) -> Result<usize> {
        for scope in &self.scopes {
            let finder = match &scope.finder {
                Some(pattern) => MatchFinder::pattern(pattern)
                    .with_context(|| format!("Invalid finder for scope {}", scope.name))?,
                None => MatchFinder::word(),
            };
            engine
                .define_scope(&scope.name, finder)
                .with_context(|| format!("Failed to define scope {:?}", scope.name))?;
        }
        for spec in &self.templates {
            let elements = spec
                .elements
                .iter()
                .map(|element| element.to_element(engine))
                .collect::<crate::error::Result<Vec<_>>>()
                .with_context(|| format!("Failed to build template {}", spec.name))?;
            engine
                .define_template(
                    &spec.name,
                    elements,
                    spec.tag.as_deref(),
                    spec.scope.as_deref(),
                )
                .with_context(|| format!("Failed to define template {:?}", spec.name))?;
        }
        Ok(self.templates.len())
    }
}

pub fn parse_library(source: &str) -> Result<Library> {
    json5::from_str(source).context("Failed to parse template library")
}

pub fn load_library(path: &Path) -> Result<Library> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read library {}", path.display()))?;
    parse_library(&content).with_context(|| format!("In library {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{Buffer, EditorBuffer};

    const SAMPLE: &str = r#"
    {
      // comments and trailing commas are fine in JSON5
      scopes: [{ name: "html", finder: "(<\\w*)" }],
      templates: [
        { name: "greet", tag: "gr", elements: ["Hello, ", { kind: "point" }, "!"] },
        {
          name: "bold", tag: "<b", scope: "html",
          elements: ["<b>", { kind: "region" }, "</b>"],
        },
        {
          name: "both", elements: [
            { kind: "include", template: "greet" },
            { kind: "list", elements: [{ kind: "newline" }, "bye"] },
          ],
        },
      ],
    }
    "#;

    #[test]
    fn test_parse_sample_library() {
        let library = parse_library(SAMPLE).unwrap();
        assert_eq!(library.scopes.len(), 1);
        assert_eq!(library.templates.len(), 3);
        assert_eq!(library.templates[1].scope.as_deref(), Some("html"));
    }

    #[test]
    fn test_install_and_expand() {
        let mut engine = Engine::new();
        let installed = parse_library(SAMPLE).unwrap().install(&mut engine).unwrap();
        assert_eq!(installed, 3);

        let mut buf = EditorBuffer::empty();
        engine.insert_named(&mut buf, "both", false).unwrap();
        assert_eq!(buf.text(), "Hello, !\nbye");
        assert_eq!(buf.position(), 7);
    }

    #[test]
    fn test_installed_tags_complete() {
        let mut engine = Engine::new();
        parse_library(SAMPLE).unwrap().install(&mut engine).unwrap();

        let mut buf = EditorBuffer::from_text("<b");
        buf.move_to(2);
        engine.use_scope(buf.id(), "html").unwrap();
        engine.complete_tag(&mut buf, true).unwrap();
        assert_eq!(buf.text(), "<b></b>");
    }

    #[test]
    fn test_directive_kinds_map_to_elements() {
        let library = parse_library(
            r#"{ templates: [{ name: "t", elements: [
                { kind: "prompt", prompt: "Name: ", name: "n", always: true },
                { kind: "region", prompt: "Body: " },
                { kind: "region", indent: true },
                { kind: "saved", name: "n" },
                { kind: "symbol", name: "date" },
                { kind: "newline_indent" },
                { kind: "conditional_newline_after" },
                { kind: "indent" },
                { kind: "empty" },
            ] }] }"#,
        )
        .unwrap();
        let engine = Engine::new();
        let kinds: Vec<&str> = library.templates[0]
            .elements
            .iter()
            .map(|spec| spec.to_element(&engine).unwrap().kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "prompt",
                "region-prompt",
                "region",
                "saved",
                "symbol",
                "newline-indent",
                "conditional-newline-after",
                "reindent",
                "empty",
            ]
        );
    }

    #[test]
    fn test_region_prompt_keeps_name_always_and_indent() {
        let library = parse_library(
            r#"{ templates: [{ name: "t", elements: [
                { kind: "region", prompt: "Body: ", name: "body", always: true, indent: true },
            ] }] }"#,
        )
        .unwrap();
        let element = library.templates[0].elements[0]
            .to_element(&Engine::new())
            .unwrap();
        match element {
            Element::RegionPrompt { prompt, indent } => {
                assert_eq!(prompt.prompt, "Body: ");
                assert_eq!(prompt.name.as_deref(), Some("body"));
                assert!(prompt.always);
                assert!(indent);
            }
            other => panic!("expected region prompt, got {other:?}"),
        }
    }

    #[test]
    fn test_indented_region_prompt_reindents_wrapped_region() {
        let mut engine = Engine::new();
        parse_library(
            r#"{ templates: [{ name: "block", elements: [
                "{", { kind: "newline_indent" },
                { kind: "region", prompt: "Body: ", indent: true },
                { kind: "newline_indent" }, "}", { kind: "indent" },
            ] }] }"#,
        )
        .unwrap()
        .install(&mut engine)
        .unwrap();

        let mut buf = EditorBuffer::from_text("x;");
        buf.set_mark(Some(0));
        buf.move_to(2);
        engine.insert_named(&mut buf, "block", true).unwrap();
        assert_eq!(buf.text(), "{\n    x;\n}");
    }

    #[test]
    fn test_include_of_later_template_fails() {
        let library = parse_library(
            r#"{ templates: [
                { name: "a", elements: [{ kind: "include", template: "b" }] },
                { name: "b", elements: ["b"] },
            ] }"#,
        )
        .unwrap();
        let mut engine = Engine::new();
        let err = library.install(&mut engine).unwrap_err();
        assert!(format!("{err:#}").contains("template not found: b"));
    }

    #[test]
    fn test_unknown_kind_is_parse_error() {
        let source = r#"{ templates: [{ name: "t", elements: [{ kind: "bogus" }] }] }"#;
        assert!(parse_library(source).is_err());
    }

    #[test]
    fn test_invalid_finder_is_reported() {
        let library = parse_library(r#"{ scopes: [{ name: "s", finder: "(" }] }"#).unwrap();
        let err = library.install(&mut Engine::new()).unwrap_err();
        assert!(err.to_string().contains("Invalid finder for scope s"));
    }

    #[test]
    fn test_load_library_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.json5");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(load_library(&path).unwrap().templates.len(), 3);
        assert!(load_library(&dir.path().join("missing.json5")).is_err());
    }
}
