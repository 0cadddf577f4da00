//! Emphasis/typeform flags and the per-character compositor.
//!
//! An [`EmphasisSet`] is the bitmask handed to the translator for each input
//! character. The bit layout follows liblouis typeforms for the first three
//! styles so a liblouis-backed [`Translator`](crate::translator::Translator)
//! can pass the values straight through.

mod compositor;

pub use compositor::{Composition, TN_END, TN_START, compose, is_incidental_punctuation};

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};
use std::str::FromStr;

/// A single emphasis or verbatim flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmphasisType {
    Italic,
    Underline,
    Bold,
    Script,
    TranscriberNote,
    Trans1,
    Trans2,
    Trans3,
    Trans4,
    Trans5,
    /// Pass the characters through as-is.
    NoTranslate,
    /// Translate without contractions.
    NoContract,
}

impl EmphasisType {
    pub const ALL: [EmphasisType; 12] = [
        EmphasisType::Italic,
        EmphasisType::Underline,
        EmphasisType::Bold,
        EmphasisType::Script,
        EmphasisType::TranscriberNote,
        EmphasisType::Trans1,
        EmphasisType::Trans2,
        EmphasisType::Trans3,
        EmphasisType::Trans4,
        EmphasisType::Trans5,
        EmphasisType::NoTranslate,
        EmphasisType::NoContract,
    ];

    pub const fn bit(self) -> u32 {
        match self {
            EmphasisType::Italic => 0x0001,
            EmphasisType::Underline => 0x0002,
            EmphasisType::Bold => 0x0004,
            EmphasisType::Script => 0x0008,
            EmphasisType::TranscriberNote => 0x0010,
            EmphasisType::Trans1 => 0x0020,
            EmphasisType::Trans2 => 0x0040,
            EmphasisType::Trans3 => 0x0080,
            EmphasisType::Trans4 => 0x0100,
            EmphasisType::Trans5 => 0x0200,
            EmphasisType::NoTranslate => 0x0800,
            EmphasisType::NoContract => 0x1000,
        }
    }

    /// Name used in action maps.
    pub const fn name(self) -> &'static str {
        match self {
            EmphasisType::Italic => "italic",
            EmphasisType::Underline => "underline",
            EmphasisType::Bold => "bold",
            EmphasisType::Script => "script",
            EmphasisType::TranscriberNote => "transcriber-note",
            EmphasisType::Trans1 => "trans-1",
            EmphasisType::Trans2 => "trans-2",
            EmphasisType::Trans3 => "trans-3",
            EmphasisType::Trans4 => "trans-4",
            EmphasisType::Trans5 => "trans-5",
            EmphasisType::NoTranslate => "no-translate",
            EmphasisType::NoContract => "no-contract",
        }
    }

    /// Verbatim flags change how text is translated rather than how it is
    /// styled.
    pub const fn is_verbatim(self) -> bool {
        matches!(self, EmphasisType::NoTranslate | EmphasisType::NoContract)
    }
}

impl FromStr for EmphasisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmphasisType::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for EmphasisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bitmask of [`EmphasisType`] flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EmphasisSet(pub u32);

impl EmphasisSet {
    pub const EMPTY: EmphasisSet = EmphasisSet(0);

    /// Every verbatim bit.
    pub const VERBATIM: EmphasisSet =
        EmphasisSet(EmphasisType::NoTranslate.bit() | EmphasisType::NoContract.bit());

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, e: EmphasisType) -> bool {
        self.0 & e.bit() != 0
    }

    pub fn insert(&mut self, e: EmphasisType) {
        self.0 |= e.bit();
    }

    pub fn remove(&mut self, e: EmphasisType) {
        self.0 &= !e.bit();
    }

    /// The same set with the verbatim bits cleared.
    pub const fn without_verbatim(self) -> EmphasisSet {
        EmphasisSet(self.0 & !Self::VERBATIM.0)
    }

    pub fn iter(self) -> impl Iterator<Item = EmphasisType> {
        EmphasisType::ALL.into_iter().filter(move |e| self.contains(*e))
    }
}

impl From<EmphasisType> for EmphasisSet {
    fn from(e: EmphasisType) -> Self {
        EmphasisSet(e.bit())
    }
}

impl FromIterator<EmphasisType> for EmphasisSet {
    fn from_iter<I: IntoIterator<Item = EmphasisType>>(iter: I) -> Self {
        iter.into_iter().fold(EmphasisSet::EMPTY, |set, e| set | EmphasisSet::from(e))
    }
}

impl BitOr for EmphasisSet {
    type Output = EmphasisSet;

    fn bitor(self, rhs: Self) -> Self::Output {
        EmphasisSet(self.0 | rhs.0)
    }
}

impl BitOrAssign for EmphasisSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for EmphasisSet {
    type Output = EmphasisSet;

    fn bitand(self, rhs: Self) -> Self::Output {
        EmphasisSet(self.0 & rhs.0)
    }
}

impl BitAndAssign for EmphasisSet {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

/// Parses a whitespace-separated list of emphasis names, e.g. `"bold italic"`.
/// The error is the first unknown name.
impl FromStr for EmphasisSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace()
            .map(EmphasisType::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(|types| types.into_iter().collect())
    }
}

impl fmt::Display for EmphasisSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(EmphasisType::name).collect();
        f.write_str(&names.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let set: EmphasisSet = "italic bold".parse().unwrap();
        assert!(set.contains(EmphasisType::Bold));
        assert!(set.contains(EmphasisType::Italic));
        assert!(!set.contains(EmphasisType::Underline));
        assert_eq!(set.to_string(), "italic bold");
        assert_eq!("".parse::<EmphasisSet>().unwrap(), EmphasisSet::EMPTY);
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        assert_eq!("bold sparkly".parse::<EmphasisSet>(), Err("sparkly".to_string()));
    }

    #[test]
    fn test_without_verbatim_keeps_styles() {
        let set: EmphasisSet = "bold no-translate no-contract".parse().unwrap();
        assert_eq!(set.without_verbatim(), EmphasisType::Bold.into());
    }

    #[test]
    fn test_bits_are_distinct() {
        let mut seen = 0u32;
        for e in EmphasisType::ALL {
            assert_eq!(seen & e.bit(), 0, "{e} overlaps");
            seen |= e.bit();
        }
    }
}
