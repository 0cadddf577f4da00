use super::batch::translate_spans;
use super::context::PassContext;
use super::walker::{self, TRANSLATED};
use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::registry::Registry;
use crate::template::TemplateSet;
use crate::translator::{DEFAULT_TABLE, Translator};

/// Per-engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Translation tables handed to the translator, in order.
    pub tables: Vec<String>,
    /// Stamp every element with the kind of action applied to it.
    pub stamp_trace: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tables: vec![DEFAULT_TABLE.to_string()],
            stamp_trace: true,
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stamp_trace(mut self, stamp: bool) -> Self {
        self.stamp_trace = stamp;
        self
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct PassReport {
    /// Batches formed, including empty ones and precomputed annotations.
    pub batches: usize,
    pub translator_calls: usize,
    pub annotations: usize,
    /// Spans produced by the walker.
    pub spans: usize,
}

/// Runs translation passes over documents.
#[derive(Debug)]
pub struct Engine<T> {
    registry: Registry,
    translator: T,
    templates: TemplateSet,
    options: EngineOptions,
}

impl<T: Translator> Engine<T> {
    /// Engine with default options and the built-in templates.
    pub fn new(registry: Registry, translator: T) -> Self {
        Self {
            registry,
            translator,
            templates: TemplateSet::builtin(),
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the template set. Fails if a template action in the registry
    /// names a template the set lacks.
    pub fn with_templates(mut self, templates: TemplateSet) -> Result<Self> {
        self.registry.check_templates(&templates)?;
        self.templates = templates;
        Ok(self)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn translator(&self) -> &T {
        &self.translator
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Translate the subtree rooted at `node`.
    ///
    /// An element runs its own registered action first, so a root mapped to
    /// a block or emphasis action behaves as it would as a child. Whatever
    /// is left untranslated is then translated with the engine's tables, and
    /// the node is marked `translated="true"`.
    pub fn translate(&self, doc: &mut Document, node: NodeId) -> Result<PassReport> {
        let mut cx = PassContext::new(&self.registry, &self.translator, &self.templates, &self.options);

        let spans = if doc.is_element(node) {
            walker::dispatch(doc, node, &mut cx)?
        } else {
            walker::walk(doc, node, &mut cx)?
        };
        translate_spans(doc, &spans, &self.options.tables, &mut cx)?;
        walker::mark(doc, node, TRANSLATED)?;

        let report = cx.into_report();
        log::debug!(
            "pass over {}: {} spans, {} batches, {} translator calls, {} annotations",
            doc.describe(node),
            report.spans,
            report.batches,
            report.translator_calls,
            report.annotations
        );
        Ok(report)
    }

    /// Translate the whole document, starting at its document element.
    pub fn translate_document(&self, doc: &mut Document) -> Result<PassReport> {
        match doc.document_element() {
            Some(root) => self.translate(doc, root),
            None => {
                log::info!("document has no element to translate");
                Ok(PassReport::default())
            }
        }
    }
}
