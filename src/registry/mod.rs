//! Matcher → action dispatch.
//!
//! A [`Registry`] is an ordered list of entries plus a default action. The
//! first entry whose matcher accepts a node wins; the entry's position is its
//! priority. Registries are immutable once built and can be shared between
//! passes over different documents.

mod action;
mod loader;
mod matcher;

pub use action::Action;
pub use loader::{ACTION_MAP_VERSION, load_action_map, load_action_map_with};
pub use matcher::{Matcher, SelectorMatcher};

use std::collections::HashMap;

use crate::dom::{Document, NodeId};
use crate::error::ConfigError;
use crate::template::TemplateSet;

/// One registry entry. `priority` is the zero-based registration index.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub priority: usize,
    pub matcher: Matcher,
    pub action: Action,
}

#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<Entry>,
    default: Action,
    namespaces: HashMap<String, String>,
}

impl Registry {
    /// Start building a registry around its default action.
    pub fn builder(default: Action) -> RegistryBuilder {
        RegistryBuilder {
            entries: Vec::new(),
            default,
            namespaces: HashMap::new(),
        }
    }

    /// Load an action map, checking template names against the built-in
    /// templates.
    pub fn from_xml(source: &str) -> Result<Self, ConfigError> {
        load_action_map(source)
    }

    /// The action for a node: the first matching entry's, or the default.
    pub fn resolve(&self, doc: &Document, id: NodeId) -> &Action {
        self.resolve_entry(doc, id)
            .map_or(&self.default, |entry| &entry.action)
    }

    /// The first matching entry, if any.
    pub fn resolve_entry(&self, doc: &Document, id: NodeId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.matcher.matches(doc, id))
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn default_action(&self) -> &Action {
        &self.default
    }

    /// Prefix → namespace URI table used by qualified matchers.
    pub fn namespaces(&self) -> &HashMap<String, String> {
        &self.namespaces
    }

    /// Table names that block actions ask for, in entry order, without
    /// repeats.
    pub fn block_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        let actions = self.entries.iter().map(|e| &e.action).chain(std::iter::once(&self.default));
        for action in actions {
            if let Action::Block { tables: names } = action {
                for name in names {
                    if !tables.contains(&name.as_str()) {
                        tables.push(name);
                    }
                }
            }
        }
        tables
    }

    /// Check that every template action names a template in `templates`.
    pub fn check_templates(&self, templates: &TemplateSet) -> Result<(), ConfigError> {
        let actions = self
            .entries
            .iter()
            .map(|e| (e.priority, &e.action))
            .chain(std::iter::once((self.entries.len(), &self.default)));
        for (entry, action) in actions {
            if let Action::Template { template } = action
                && !templates.contains(template)
            {
                return Err(ConfigError::UnknownTemplate {
                    entry,
                    name: template.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Programmatic construction with the same validation as loading.
#[derive(Debug)]
pub struct RegistryBuilder {
    entries: Vec<(Matcher, Action)>,
    default: Action,
    namespaces: HashMap<String, String>,
}

impl RegistryBuilder {
    /// Declare a namespace prefix.
    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// Append an entry. Entries added earlier take priority.
    pub fn entry(mut self, matcher: Matcher, action: Action) -> Self {
        self.entries.push((matcher, action));
        self
    }

    /// Append a selector entry, resolving prefixes through the declared
    /// namespaces.
    pub fn selector(self, css: &str, action: Action) -> Result<Self, ConfigError> {
        let entry = self.entries.len();
        if let Some(prefix) = matcher::undeclared_selector_prefix(css, &self.namespaces) {
            return Err(ConfigError::UnknownPrefix { entry, prefix });
        }
        let matcher = Matcher::selector(css, &self.namespaces)
            .map_err(|message| ConfigError::InvalidMatcher { entry, message })?;
        Ok(self.entry(matcher, action))
    }

    pub fn build(self) -> Result<Registry, ConfigError> {
        let mut entries: Vec<Entry> = Vec::with_capacity(self.entries.len());
        for (priority, (matcher, action)) in self.entries.into_iter().enumerate() {
            if let Some(first) = entries.iter().find(|e| e.matcher == matcher) {
                return Err(ConfigError::DuplicateMatcher {
                    matcher: matcher.to_string(),
                    first: first.priority,
                    second: priority,
                });
            }
            entries.push(Entry {
                priority,
                matcher,
                action,
            });
        }
        Ok(Registry {
            entries,
            default: self.default,
            namespaces: self.namespaces,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_xml;

    fn emphasis(names: &str) -> Action {
        Action::Emphasis {
            emphasis: names.parse().unwrap(),
        }
    }

    #[test]
    fn test_first_match_wins() {
        let registry = Registry::builder(Action::Generic)
            .entry(Matcher::element("note"), emphasis("no-translate"))
            .entry(Matcher::attribute("class", Some("b")), emphasis("bold"))
            .build()
            .unwrap();

        let doc = parse_xml(r#"<p><note class="b">1</note><span class="b">2</span><i>3</i></p>"#).unwrap();
        let note = doc.find_by_tag("note").unwrap();
        let span = doc.find_by_tag("span").unwrap();
        let i = doc.find_by_tag("i").unwrap();

        assert_eq!(registry.resolve(&doc, note), &emphasis("no-translate"));
        assert_eq!(registry.resolve(&doc, span), &emphasis("bold"));
        assert_eq!(registry.resolve(&doc, i), &Action::Generic);
        assert_eq!(registry.resolve_entry(&doc, span).map(|e| e.priority), Some(1));
        assert!(registry.resolve_entry(&doc, i).is_none());
    }

    #[test]
    fn test_reordering_changes_behaviour() {
        let doc = parse_xml(r#"<p><note class="b">1</note></p>"#).unwrap();
        let note = doc.find_by_tag("note").unwrap();
        let registry = Registry::builder(Action::Generic)
            .entry(Matcher::attribute("class", Some("b")), emphasis("bold"))
            .entry(Matcher::element("note"), emphasis("no-translate"))
            .build()
            .unwrap();
        assert_eq!(registry.resolve(&doc, note), &emphasis("bold"));
    }

    #[test]
    fn test_duplicate_matchers_are_rejected() {
        let err = Registry::builder(Action::Generic)
            .entry(Matcher::element("note"), Action::Skip)
            .entry(Matcher::element("p"), Action::block())
            .entry(Matcher::element("note"), Action::Generic)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateMatcher { first: 0, second: 2, .. }
        ));
    }

    #[test]
    fn test_selector_entries_need_declared_prefixes() {
        let err = Registry::builder(Action::Generic)
            .selector("m|math", Action::Skip)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPrefix { entry: 0, ref prefix } if prefix == "m"));

        let registry = Registry::builder(Action::Generic)
            .namespace("m", "http://www.w3.org/1998/Math/MathML")
            .selector("m|math", Action::Skip)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(registry.entries().len(), 1);
    }

    #[test]
    fn test_block_tables() {
        let registry = Registry::builder(Action::Block {
            tables: vec!["a.ctb".into()],
        })
        .entry(
            Matcher::element("m"),
            Action::Block {
                tables: vec!["nemeth.ctb".into(), "a.ctb".into()],
            },
        )
        .entry(Matcher::element("p"), Action::block())
        .build()
        .unwrap();
        assert_eq!(registry.block_tables(), vec!["nemeth.ctb", "a.ctb"]);
    }

    #[test]
    fn test_check_templates() {
        let registry = Registry::builder(Action::Generic)
            .entry(
                Matcher::element("h1"),
                Action::Template {
                    template: "shout".into(),
                },
            )
            .build()
            .unwrap();
        assert!(matches!(
            registry.check_templates(&TemplateSet::builtin()),
            Err(ConfigError::UnknownTemplate { entry: 0, .. })
        ));
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
