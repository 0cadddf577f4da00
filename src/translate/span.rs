use crate::dom::{Attribute, BRL, Document, NodeId, is_annotation, utd_name};
use crate::emphasis::EmphasisSet;
use crate::error::{Error, Result};

/// Local name of the attribute holding an annotation's index array.
pub const INDEX_ATTR: &str = "index";

/// A run of readable text and where it came from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextSpan {
    /// Node the annotation for this span is attached after.
    pub origin: Option<NodeId>,
    pub text: String,
    pub emphasis: EmphasisSet,
    /// Already in final form; never sent to the translator.
    pub translated: bool,
    /// Annotation to write for a translated span when none exists yet.
    pub annotation: Option<AnnotationFragment>,
}

impl TextSpan {
    /// Untranslated span with no emphasis.
    pub fn new(origin: Option<NodeId>, text: impl Into<String>) -> Self {
        Self {
            origin,
            text: text.into(),
            ..Default::default()
        }
    }

    /// Span whose text is already braille.
    pub fn translated(origin: Option<NodeId>, text: impl Into<String>) -> Self {
        Self {
            origin,
            text: text.into(),
            translated: true,
            ..Default::default()
        }
    }

    pub fn with_emphasis(mut self, emphasis: EmphasisSet) -> Self {
        self.emphasis = emphasis;
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationFragment) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Translated text for one span, with an index into the span's own text for
/// every output char.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnnotationFragment {
    pub text: String,
    pub indices: Vec<usize>,
}

impl AnnotationFragment {
    pub fn new(text: impl Into<String>, indices: Vec<usize>) -> Self {
        Self {
            text: text.into(),
            indices,
        }
    }

    /// Fragment mapping every char of `text` to itself.
    pub fn identity(text: &str) -> Self {
        Self {
            text: text.to_string(),
            indices: (0..text.chars().count()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Create a detached `brl` element holding this fragment.
    pub fn to_node(&self, doc: &mut Document) -> NodeId {
        let indices = self
            .indices
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let brl = doc.create_element(utd_name(BRL), vec![Attribute::new(INDEX_ATTR, indices)]);
        if !self.text.is_empty() {
            let text = doc.create_text(self.text.as_str());
            doc.append(brl, text);
        }
        brl
    }

    /// Read a fragment back from a `brl` element.
    pub fn from_node(doc: &Document, id: NodeId) -> Result<Self> {
        if !is_annotation(doc, id) {
            return Err(Error::Tree(format!("{} is not an annotation", doc.describe(id))));
        }
        let indices = doc
            .get_attr(id, INDEX_ATTR)
            .unwrap_or_default()
            .split_whitespace()
            .map(|i| {
                i.parse()
                    .map_err(|_| Error::Tree(format!("bad annotation index '{i}'")))
            })
            .collect::<Result<Vec<usize>>>()?;
        Ok(Self {
            text: doc.text_content(id),
            indices,
        })
    }
}

/// The annotation written for `origin`, if its next sibling is one.
pub fn annotation_after(doc: &Document, origin: NodeId) -> Option<NodeId> {
    doc.next_sibling(origin).filter(|&next| is_annotation(doc, next))
}
