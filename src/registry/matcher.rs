//! Node predicates used to select actions.

use std::collections::HashMap;
use std::fmt;

use html5ever::{LocalName, Namespace};
use selectors::parser::Selector;

use crate::dom::{Document, NodeId, TactusSelectors, matches_any, parse_selector_list};

/// A pure predicate over an element.
///
/// Text leaves and other non-element nodes never match. Equality is
/// structural; two entries with equal matchers are rejected when a registry
/// is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Element with the given local name (`*` for any) in `namespace`, or in
    /// any namespace when `namespace` is `None`.
    Element {
        namespace: Option<Namespace>,
        local: LocalName,
    },
    /// Element carrying the attribute, optionally with an exact value.
    Attribute {
        namespace: Namespace,
        local: LocalName,
        value: Option<String>,
    },
    /// CSS selector list.
    Selector(SelectorMatcher),
    All(Vec<Matcher>),
    Any(Vec<Matcher>),
    Not(Box<Matcher>),
}

impl Matcher {
    /// Element matcher for a local name in any namespace.
    pub fn element(local: &str) -> Self {
        Matcher::Element {
            namespace: None,
            local: LocalName::from(local),
        }
    }

    /// Element matcher for a local name in a specific namespace.
    pub fn element_ns(namespace: &str, local: &str) -> Self {
        Matcher::Element {
            namespace: Some(Namespace::from(namespace)),
            local: LocalName::from(local),
        }
    }

    /// Attribute matcher for an attribute in no namespace.
    pub fn attribute(local: &str, value: Option<&str>) -> Self {
        Matcher::Attribute {
            namespace: Namespace::from(""),
            local: LocalName::from(local),
            value: value.map(str::to_string),
        }
    }

    /// Selector matcher, resolving prefixes through `namespaces`.
    pub fn selector(source: &str, namespaces: &HashMap<String, String>) -> Result<Self, String> {
        SelectorMatcher::parse(source, namespaces).map(Matcher::Selector)
    }

    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(name) = doc.name(id) else {
            return false;
        };
        match self {
            Matcher::Element { namespace, local } => {
                namespace.as_ref().is_none_or(|ns| ns == &name.ns)
                    && (local.as_ref() == "*" || local == &name.local)
            }
            Matcher::Attribute {
                namespace,
                local,
                value,
            } => match doc.get_attr_ns(id, namespace, local) {
                Some(actual) => value.as_deref().is_none_or(|v| v == actual),
                None => false,
            },
            Matcher::Selector(selector) => selector.matches(doc, id),
            Matcher::All(all) => all.iter().all(|m| m.matches(doc, id)),
            Matcher::Any(any) => any.iter().any(|m| m.matches(doc, id)),
            Matcher::Not(inner) => !inner.matches(doc, id),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Element { namespace, local } => match namespace {
                Some(ns) if !ns.is_empty() => write!(f, "element({{{}}}{})", ns.as_ref(), local.as_ref()),
                _ => write!(f, "element({})", local.as_ref()),
            },
            Matcher::Attribute {
                namespace,
                local,
                value,
            } => {
                f.write_str("attribute(")?;
                if !namespace.is_empty() {
                    write!(f, "{{{}}}", namespace.as_ref())?;
                }
                f.write_str(local.as_ref())?;
                if let Some(value) = value {
                    write!(f, "={value:?}")?;
                }
                f.write_str(")")
            }
            Matcher::Selector(selector) => write!(f, "selector({})", selector.source()),
            Matcher::All(all) => write_group(f, "all", all),
            Matcher::Any(any) => write_group(f, "any", any),
            Matcher::Not(inner) => write!(f, "not({inner})"),
        }
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, label: &str, matchers: &[Matcher]) -> fmt::Result {
    write!(f, "{label}(")?;
    for (i, m) in matchers.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{m}")?;
    }
    f.write_str(")")
}

/// Parsed CSS selector list, compared by its normalized serialization.
#[derive(Clone)]
pub struct SelectorMatcher {
    normalized: String,
    selectors: Vec<Selector<TactusSelectors>>,
}

impl SelectorMatcher {
    pub fn parse(source: &str, namespaces: &HashMap<String, String>) -> Result<Self, String> {
        let (selectors, normalized) = parse_selector_list(source, namespaces)?;
        Ok(Self {
            normalized,
            selectors,
        })
    }

    /// Normalized CSS text.
    pub fn source(&self) -> &str {
        &self.normalized
    }

    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        matches_any(doc, id, &self.selectors)
    }
}

impl PartialEq for SelectorMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl fmt::Debug for SelectorMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SelectorMatcher").field(&self.normalized).finish()
    }
}

/// First `prefix|` in a selector whose prefix is not in `namespaces`.
pub(crate) fn undeclared_selector_prefix(
    source: &str,
    namespaces: &HashMap<String, String>,
) -> Option<String> {
    let bytes = source.as_bytes();
    let mut quote = None;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
        // Attribute values may hold any text, including `|`.
        if let Some(q) = quote {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                _ if b == q => quote = None,
                _ => {}
            }
            continue;
        }
        if b == b'"' || b == b'\'' {
            quote = Some(b);
            continue;
        }
        if b != b'|' || bytes.get(i + 1) == Some(&b'=') {
            continue;
        }
        let start = bytes[..i]
            .iter()
            .rposition(|c| !(c.is_ascii_alphanumeric() || *c == b'-' || *c == b'_'))
            .map_or(0, |p| p + 1);
        let prefix = &source[start..i];
        if !prefix.is_empty() && !namespaces.contains_key(prefix) {
            return Some(prefix.to_string());
        }
    }
    None
}
