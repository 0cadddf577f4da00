//! Named tree rewrites used by the `template` action.
//!
//! A template rewrites an element's subtree in place before its text is
//! translated. The engine marks rewritten elements with `rewritten="true"`
//! so a template never runs twice over the same element.

use std::collections::BTreeMap;
use std::fmt::{self, Debug};

use thiserror::Error;

use crate::dom::{Document, NodeId, is_annotation};

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("no template named '{0}'")]
    Unknown(String),

    #[error("template '{template}' failed: {message}")]
    Rewrite { template: String, message: String },
}

impl TemplateError {
    pub fn rewrite(template: &str, message: impl fmt::Display) -> Self {
        TemplateError::Rewrite {
            template: template.to_string(),
            message: message.to_string(),
        }
    }
}

/// An external tree rewrite.
pub trait Template: Send + Sync + Debug {
    /// Rewrite the subtree rooted at `node` in place.
    fn rewrite(&self, doc: &mut Document, node: NodeId) -> Result<(), TemplateError>;
}

/// Templates by name.
#[derive(Debug, Default)]
pub struct TemplateSet {
    templates: BTreeMap<String, Box<dyn Template>>,
}

impl TemplateSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in templates: `normalize-space` and `uppercase`.
    pub fn builtin() -> Self {
        let mut set = Self::new();
        set.insert("normalize-space", NormalizeSpace);
        set.insert("uppercase", Uppercase);
        set
    }

    pub fn insert(&mut self, name: impl Into<String>, template: impl Template + 'static) {
        self.templates.insert(name.into(), Box::new(template));
    }

    /// Register a closure as a template.
    pub fn insert_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut Document, NodeId) -> Result<(), TemplateError> + Send + Sync + 'static,
    {
        self.insert(name, FnTemplate(f));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Template> {
        self.templates.get(name).map(|t| t.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Run the template called `name` over `node`.
    pub fn apply(&self, name: &str, doc: &mut Document, node: NodeId) -> Result<(), TemplateError> {
        let template = self
            .get(name)
            .ok_or_else(|| TemplateError::Unknown(name.to_string()))?;
        template.rewrite(doc, node)
    }
}

struct FnTemplate<F>(F);

impl<F> Debug for FnTemplate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnTemplate")
    }
}

impl<F> Template for FnTemplate<F>
where
    F: Fn(&mut Document, NodeId) -> Result<(), TemplateError> + Send + Sync,
{
    fn rewrite(&self, doc: &mut Document, node: NodeId) -> Result<(), TemplateError> {
        (self.0)(doc, node)
    }
}

// ============================================================================
// Built-in Templates
// ============================================================================

/// Collapses runs of whitespace in every text leaf to a single space.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeSpace;

impl Template for NormalizeSpace {
    fn rewrite(&self, doc: &mut Document, node: NodeId) -> Result<(), TemplateError> {
        map_text_leaves(doc, node, "normalize-space", |text| {
            let mut out = String::with_capacity(text.len());
            let mut in_space = false;
            for c in text.chars() {
                if c.is_whitespace() {
                    if !in_space {
                        out.push(' ');
                    }
                    in_space = true;
                } else {
                    out.push(c);
                    in_space = false;
                }
            }
            out
        })
    }
}

/// ASCII upper-cases every text leaf.
#[derive(Debug, Clone, Copy)]
pub struct Uppercase;

impl Template for Uppercase {
    fn rewrite(&self, doc: &mut Document, node: NodeId) -> Result<(), TemplateError> {
        map_text_leaves(doc, node, "uppercase", |text| text.to_ascii_uppercase())
    }
}

/// Replace the text of every leaf under `node`, leaving annotations alone.
fn map_text_leaves(
    doc: &mut Document,
    node: NodeId,
    template: &str,
    f: impl Fn(&str) -> String,
) -> Result<(), TemplateError> {
    let leaves: Vec<NodeId> = doc
        .descendants(node)
        .filter(|&id| doc.is_text(id) && !inside_annotation(doc, id, node))
        .collect();

    for leaf in leaves {
        let Some(text) = doc.text(leaf) else { continue };
        let rewritten = f(text);
        doc.set_text(leaf, rewritten)
            .map_err(|e| TemplateError::rewrite(template, e))?;
    }
    Ok(())
}

fn inside_annotation(doc: &Document, mut id: NodeId, stop: NodeId) -> bool {
    while let Some(parent) = doc.parent(id) {
        if is_annotation(doc, parent) {
            return true;
        }
        if parent == stop {
            return false;
        }
        id = parent;
    }
    false
}
