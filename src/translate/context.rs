use std::collections::HashMap;

use super::engine::{EngineOptions, PassReport};
use crate::dom::NodeId;
use crate::emphasis::EmphasisSet;
use crate::registry::Registry;
use crate::template::TemplateSet;
use crate::translator::Translator;

/// State for one pass over one tree.
///
/// Everything a pass learns about individual nodes is keyed by [`NodeId`]
/// here and dropped with the context, so passes over different documents
/// never see each other's state.
pub struct PassContext<'a> {
    pub registry: &'a Registry,
    pub translator: &'a dyn Translator,
    pub templates: &'a TemplateSet,
    pub options: &'a EngineOptions,
    /// Emphasis of the enclosing emphasis elements, applied to every text
    /// span collected below them, including spans of nested blocks.
    pub(crate) inherited: EmphasisSet,
    /// Batch that annotated each origin node.
    annotated: HashMap<NodeId, usize>,
    report: PassReport,
}

impl<'a> PassContext<'a> {
    pub fn new(
        registry: &'a Registry,
        translator: &'a dyn Translator,
        templates: &'a TemplateSet,
        options: &'a EngineOptions,
    ) -> Self {
        Self {
            registry,
            translator,
            templates,
            options,
            inherited: EmphasisSet::EMPTY,
            annotated: HashMap::new(),
            report: PassReport::default(),
        }
    }

    /// Allocate the index of the next batch.
    pub(crate) fn next_batch(&mut self) -> usize {
        let batch = self.report.batches;
        self.report.batches += 1;
        batch
    }

    pub(crate) fn count_call(&mut self) {
        self.report.translator_calls += 1;
    }

    pub(crate) fn count_spans(&mut self, n: usize) {
        self.report.spans += n;
    }

    /// Record that `origin` got an annotation in `batch`. Returns the earlier
    /// batch if the node was already annotated during this pass.
    pub(crate) fn record_annotation(&mut self, origin: NodeId, batch: usize) -> Option<usize> {
        self.report.annotations += 1;
        self.annotated.insert(origin, batch)
    }

    /// Batch that annotated `origin` during this pass.
    pub fn annotated_in(&self, origin: NodeId) -> Option<usize> {
        self.annotated.get(&origin).copied()
    }

    pub fn report(&self) -> &PassReport {
        &self.report
    }

    pub fn into_report(self) -> PassReport {
        self.report
    }
}
