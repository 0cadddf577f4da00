//! Boundary to the braille translator.
//!
//! The engine never transliterates text itself. It hands each batch to a
//! [`Translator`] together with one typeform per input character and gets
//! back the output plus an index map tying every output character to the
//! input character that produced it.

mod ascii;
mod recording;

pub use ascii::{AsciiBrailleTranslator, DEFAULT_TABLE};
pub use recording::{RecordedCall, RecordingTranslator};

use thiserror::Error;

use crate::emphasis::EmphasisSet;

/// Output of one translator call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TranslationResult {
    pub output: String,
    /// For each char of `output`, the char offset in the input that produced
    /// it. Non-decreasing; repeats are allowed.
    pub index_map: Vec<usize>,
}

/// Errors a translator reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslatorError {
    #[error("table error: {0}")]
    Table(String),

    #[error("cannot translate {ch:?} at offset {offset}")]
    Untranslatable { ch: char, offset: usize },

    #[error("typeform count {typeforms} does not match text length {chars}")]
    TypeformLength { typeforms: usize, chars: usize },

    #[error("{0}")]
    Backend(String),
}

/// A braille translator.
///
/// Implementations must be deterministic for a given input: the engine relies
/// on a second pass over unchanged text producing identical annotations.
pub trait Translator {
    /// Translate `text` using `tables`, with one typeform per char of `text`.
    fn translate(
        &self,
        text: &str,
        tables: &[String],
        typeforms: &[EmphasisSet],
    ) -> Result<TranslationResult, TranslatorError>;

    /// Whether `c` can be passed through verbatim.
    ///
    /// The compositor never asks for no-translate on a character this returns
    /// false for.
    fn can_represent(&self, c: char) -> bool {
        c.is_ascii() && !c.is_ascii_control()
    }
}

impl<T: Translator + ?Sized> Translator for &T {
    fn translate(
        &self,
        text: &str,
        tables: &[String],
        typeforms: &[EmphasisSet],
    ) -> Result<TranslationResult, TranslatorError> {
        (**self).translate(text, tables, typeforms)
    }

    fn can_represent(&self, c: char) -> bool {
        (**self).can_represent(c)
    }
}

impl<T: Translator + ?Sized> Translator for Box<T> {
    fn translate(
        &self,
        text: &str,
        tables: &[String],
        typeforms: &[EmphasisSet],
    ) -> Result<TranslationResult, TranslatorError> {
        (**self).translate(text, tables, typeforms)
    }

    fn can_represent(&self, c: char) -> bool {
        (**self).can_represent(c)
    }
}
