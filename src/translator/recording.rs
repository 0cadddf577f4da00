use std::sync::Mutex;

use super::{TranslationResult, Translator, TranslatorError};
use crate::emphasis::EmphasisSet;

/// One call seen by a [`RecordingTranslator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub text: String,
    pub tables: Vec<String>,
    pub typeforms: Vec<EmphasisSet>,
}

/// Wraps another translator and keeps every call it forwards.
///
/// Used by tests and by `--trace-batches` in the CLI to see exactly how a pass
/// batched the document.
#[derive(Debug, Default)]
pub struct RecordingTranslator<T> {
    inner: T,
    calls: Mutex<Vec<RecordedCall>>,
}

impl<T: Translator> RecordingTranslator<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Snapshot of the calls made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Texts of the calls made so far.
    pub fn texts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.text).collect()
    }

    pub fn clear(&self) {
        match self.calls.lock() {
            Ok(mut calls) => calls.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl<T: Translator> Translator for RecordingTranslator<T> {
    fn translate(
        &self,
        text: &str,
        tables: &[String],
        typeforms: &[EmphasisSet],
    ) -> Result<TranslationResult, TranslatorError> {
        let call = RecordedCall {
            text: text.to_string(),
            tables: tables.to_vec(),
            typeforms: typeforms.to_vec(),
        };
        match self.calls.lock() {
            Ok(mut calls) => calls.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
        self.inner.translate(text, tables, typeforms)
    }

    fn can_represent(&self, c: char) -> bool {
        self.inner.can_represent(c)
    }
}
