//! Built-in uncontracted (grade 1) UEB translator producing Unicode braille.
//!
//! It covers letters, digits, capitals, common punctuation, the bold, italic
//! and underline passage indicators, and transcriber-note markers. Enough to
//! run the engine end to end without liblouis; not a substitute for it.

use super::{TranslationResult, Translator, TranslatorError};
use crate::emphasis::{EmphasisSet, EmphasisType, TN_END, TN_START};

/// Table name understood by default.
pub const DEFAULT_TABLE: &str = "en-ueb-g1.ctb";

const CAPITAL: &str = "⠠";
const NUMBER: &str = "⠼";

/// Passage indicators, opened and closed in this order.
const STYLES: [(EmphasisType, &str, &str); 3] = [
    (EmphasisType::Bold, "⠘⠶", "⠘⠄"),
    (EmphasisType::Italic, "⠨⠶", "⠨⠄"),
    (EmphasisType::Underline, "⠸⠶", "⠸⠄"),
];

#[derive(Debug, Clone)]
pub struct AsciiBrailleTranslator {
    tables: Vec<String>,
    fallback: Option<char>,
}

impl Default for AsciiBrailleTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl AsciiBrailleTranslator {
    pub fn new() -> Self {
        Self {
            tables: vec![DEFAULT_TABLE.to_string()],
            fallback: None,
        }
    }

    /// Accept another table name.
    pub fn with_table(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.tables.contains(&name) {
            self.tables.push(name);
        }
        self
    }

    /// Accept several more table names.
    ///
    /// The built-in cells do not depend on the table; a name only has to be
    /// known for a call that lists it to succeed.
    pub fn with_tables<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(self, |t, name| t.with_table(name))
    }

    /// Emit `cell` for characters with no mapping instead of failing.
    pub fn with_fallback(mut self, cell: char) -> Self {
        self.fallback = Some(cell);
        self
    }

    fn check_tables(&self, tables: &[String]) -> Result<(), TranslatorError> {
        if tables.is_empty() {
            return Err(TranslatorError::Table("no translation table given".into()));
        }
        match tables.iter().find(|t| !self.tables.contains(t)) {
            Some(unknown) => Err(TranslatorError::Table(format!("unknown table '{unknown}'"))),
            None => Ok(()),
        }
    }
}

impl Translator for AsciiBrailleTranslator {
    fn translate(
        &self,
        text: &str,
        tables: &[String],
        typeforms: &[EmphasisSet],
    ) -> Result<TranslationResult, TranslatorError> {
        self.check_tables(tables)?;

        let chars: Vec<char> = text.chars().collect();
        if typeforms.len() != chars.len() {
            return Err(TranslatorError::TypeformLength {
                typeforms: typeforms.len(),
                chars: chars.len(),
            });
        }

        let mut out = Output::default();
        let mut open = [false; STYLES.len()];
        let mut in_number = false;

        for (offset, (&c, &typeform)) in chars.iter().zip(typeforms).enumerate() {
            for (slot, (style, begin, _)) in STYLES.iter().enumerate() {
                if typeform.contains(*style) && !open[slot] {
                    out.push(begin, offset);
                    open[slot] = true;
                }
            }

            if typeform.contains(EmphasisType::NoTranslate) {
                out.push_char(c, offset);
                in_number = false;
            } else {
                in_number = self.translate_char(&chars, offset, in_number, &mut out)?;
            }

            let next = typeforms.get(offset + 1).copied().unwrap_or_default();
            for (slot, (style, _, end)) in STYLES.iter().enumerate().rev() {
                if open[slot] && !next.contains(*style) {
                    out.push(end, offset);
                    open[slot] = false;
                }
            }
        }

        Ok(TranslationResult {
            output: out.text,
            index_map: out.map,
        })
    }
}

impl AsciiBrailleTranslator {
    /// Translate one char, returning whether a number is in progress.
    fn translate_char(
        &self,
        chars: &[char],
        offset: usize,
        in_number: bool,
        out: &mut Output,
    ) -> Result<bool, TranslatorError> {
        let c = chars[offset];

        if let Some(digit) = c.to_digit(10) {
            if !in_number {
                out.push(NUMBER, offset);
            }
            let letter = if digit == 0 { 'j' } else { (b'a' + digit as u8 - 1) as char };
            out.push_cell(letter_cell(letter), offset);
            return Ok(true);
        }

        // A period or comma between digits stays inside the number.
        if in_number && matches!(c, '.' | ',') && chars.get(offset + 1).is_some_and(|n| n.is_ascii_digit()) {
            out.push_cell(if c == '.' { 0x32 } else { 0x02 }, offset);
            return Ok(true);
        }

        if c.is_ascii_alphabetic() {
            if c.is_ascii_uppercase() {
                out.push(CAPITAL, offset);
            }
            out.push_cell(letter_cell(c.to_ascii_lowercase()), offset);
            return Ok(false);
        }

        let braille = match c {
            ' ' => "\u{2800}",
            '\n' | '\t' | '\r' => {
                out.push_char(c, offset);
                return Ok(false);
            }
            ',' => "⠂",
            '.' => "⠲",
            ';' => "⠆",
            ':' => "⠒",
            '!' => "⠖",
            '?' => "⠦",
            '\'' | '’' => "⠄",
            '-' => "⠤",
            '/' => "⠸⠌",
            '(' => "⠐⠣",
            ')' => "⠐⠜",
            '"' | '“' | '”' => {
                let opening = offset == 0 || chars[offset - 1].is_whitespace();
                if (c == '"' && opening) || c == '“' { "⠦" } else { "⠴" }
            }
            TN_START => "⠈⠨⠣",
            TN_END => "⠈⠨⠜",
            _ => match self.fallback {
                Some(cell) => {
                    out.push_char(cell, offset);
                    return Ok(false);
                }
                None => return Err(TranslatorError::Untranslatable { ch: c, offset }),
            },
        };
        out.push(braille, offset);
        Ok(false)
    }
}

/// Dot pattern of a lowercase letter as Unicode braille bits.
fn letter_cell(c: char) -> u32 {
    const DOTS: [u32; 26] = [
        0x01, 0x03, 0x09, 0x19, 0x11, 0x0B, 0x1B, 0x13, 0x0A, 0x1A, // a-j
        0x05, 0x07, 0x0D, 0x1D, 0x15, 0x0F, 0x1F, 0x17, 0x0E, 0x1E, // k-t
        0x25, 0x27, 0x3A, 0x2D, 0x3D, 0x35, // u-z
    ];
    DOTS[(c as u8 - b'a') as usize]
}

#[derive(Default)]
struct Output {
    text: String,
    map: Vec<usize>,
}

impl Output {
    fn push(&mut self, cells: &str, offset: usize) {
        for c in cells.chars() {
            self.push_char(c, offset);
        }
    }

    fn push_cell(&mut self, dots: u32, offset: usize) {
        if let Some(c) = char::from_u32(0x2800 + dots) {
            self.push_char(c, offset);
        }
    }

    fn push_char(&mut self, c: char, offset: usize) {
        self.text.push(c);
        self.map.push(offset);
    }
}
