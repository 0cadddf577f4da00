//! Builds the translator input for one batch: the concatenated text and one
//! typeform per character.
//!
//! Offsets are counted in `char`s, which is also the unit of the
//! translator's index map.

use super::{EmphasisSet, EmphasisType};

/// Transcriber-note start marker.
pub const TN_START: char = '\u{E000}';
/// Transcriber-note end marker.
pub const TN_END: char = '\u{E001}';

/// Punctuation that trails a word without belonging to its style.
pub fn is_incidental_punctuation(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | ';' | ':' | '!' | '?' | '"' | '\'' | '’' | '”' | ')'
    )
}

fn is_tn_marker(c: char) -> bool {
    c == TN_START || c == TN_END
}

/// Translator input for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Composition {
    pub text: String,
    /// One mask per char of `text`.
    pub typeforms: Vec<EmphasisSet>,
    /// Cumulative end offset of each part.
    pub ends: Vec<usize>,
}

impl Composition {
    /// Length of `text` in chars.
    pub fn len(&self) -> usize {
        self.typeforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.typeforms.is_empty()
    }

    /// Start offset of part `i`.
    pub fn start(&self, i: usize) -> usize {
        if i == 0 { 0 } else { self.ends[i - 1] }
    }
}

/// Concatenate `(text, emphasis)` parts and smooth the per-character masks.
///
/// `can_represent` answers whether the target script can show a character
/// verbatim.
pub fn compose<'a, I, F>(parts: I, can_represent: F) -> Composition
where
    I: IntoIterator<Item = (&'a str, EmphasisSet)>,
    F: Fn(char) -> bool,
{
    let mut composition = Composition::default();
    let mut chars = Vec::new();

    for (text, emphasis) in parts {
        for c in text.chars() {
            chars.push(c);
            composition.typeforms.push(emphasis);
        }
        composition.text.push_str(text);
        composition.ends.push(chars.len());
    }

    smooth(&chars, &mut composition.typeforms, &can_represent);
    normalize_trailing_punctuation(&chars, &mut composition.typeforms);
    composition
}

/// One left-to-right pass with one character of look-behind and look-ahead.
fn smooth(chars: &[char], masks: &mut [EmphasisSet], can_represent: &impl Fn(char) -> bool) {
    for i in 0..chars.len() {
        let c = chars[i];

        // A marker carries only what both neighbours share.
        if is_tn_marker(c) {
            let prev = if i > 0 { masks[i - 1] } else { EmphasisSet::EMPTY };
            let next = masks.get(i + 1).copied().unwrap_or_default();
            masks[i] = prev & next;
        }

        if masks[i].contains(EmphasisType::NoTranslate) && !can_represent(c) {
            masks[i].remove(EmphasisType::NoTranslate);
        }
    }
}

/// Punctuation right after a word of three or more uniformly styled chars
/// takes the word's styling (minus verbatim flags) if it differs.
fn normalize_trailing_punctuation(chars: &[char], masks: &mut [EmphasisSet]) {
    let mut word_len = 0usize;
    let mut word_mask = EmphasisSet::EMPTY;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if is_incidental_punctuation(c) {
            let start = i;
            while i < chars.len() && is_incidental_punctuation(chars[i]) {
                i += 1;
            }
            if word_len > 2 {
                for mask in &mut masks[start..i] {
                    if *mask != word_mask {
                        *mask = word_mask.without_verbatim();
                    }
                }
            }
            word_len = 0;
            continue;
        }

        if c.is_whitespace() {
            word_len = 0;
        } else if word_len > 0 && masks[i] == word_mask {
            word_len += 1;
        } else {
            word_len = 1;
            word_mask = masks[i];
        }
        i += 1;
    }
}
