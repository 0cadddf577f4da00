use std::fmt;

use html5ever::QualName;

use crate::dom::qualified;
use crate::emphasis::EmphasisSet;

/// What the walker does with a node.
///
/// Actions carry only the configuration fixed when the registry was built.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Recurse into the children with no translation boundary.
    Generic,
    /// Recurse, then translate the whole subtree as one unit. `tables`
    /// overrides the engine's tables when non-empty.
    Block { tables: Vec<String> },
    /// Contribute nothing and do not recurse.
    Skip,
    /// Translate the value of an attribute instead of the children.
    Attribute { name: QualName },
    /// Recurse like [`Action::Generic`] and add `emphasis` to every span.
    Emphasis { emphasis: EmphasisSet },
    /// Rewrite the subtree with a named template, then translate it like
    /// [`Action::Block`].
    Template { template: String },
    /// The element's text is already braille.
    Pretranslated,
}

impl Action {
    /// Block action using the engine's tables.
    pub fn block() -> Self {
        Action::Block { tables: Vec::new() }
    }

    /// Name of the action kind, as written in action maps and trace
    /// attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Generic => "generic",
            Action::Block { .. } => "block",
            Action::Skip => "skip",
            Action::Attribute { .. } => "attribute",
            Action::Emphasis { .. } => "emphasis",
            Action::Template { .. } => "template",
            Action::Pretranslated => "pretranslated",
        }
    }

    /// Whether the walker stamps the trace attribute after running this
    /// action.
    pub fn stamps_trace(&self) -> bool {
        !matches!(self, Action::Skip)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Block { tables } if !tables.is_empty() => {
                write!(f, "block[{}]", tables.join(" "))
            }
            Action::Attribute { name } => write!(f, "attribute[{}]", qualified(name)),
            Action::Emphasis { emphasis } => write!(f, "emphasis[{emphasis}]"),
            Action::Template { template } => write!(f, "template[{template}]"),
            other => f.write_str(other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::qual_name;

    #[test]
    fn test_kind_names() {
        assert_eq!(Action::Generic.kind(), "generic");
        assert_eq!(Action::block().kind(), "block");
        assert_eq!(Action::Pretranslated.kind(), "pretranslated");
        assert!(!Action::Skip.stamps_trace());
        assert!(Action::Generic.stamps_trace());
    }

    #[test]
    fn test_display() {
        let emphasis = Action::Emphasis {
            emphasis: "bold italic".parse().unwrap(),
        };
        assert_eq!(emphasis.to_string(), "emphasis[italic bold]");
        let attr = Action::Attribute {
            name: qual_name(None, "", "alt"),
        };
        assert_eq!(attr.to_string(), "attribute[alt]");
        assert_eq!(Action::block().to_string(), "block");
    }
}
