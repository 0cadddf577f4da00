//! HTML input: html5ever builds a [`Document`] through [`HtmlSink`].

use std::borrow::Cow;
use std::cell::RefCell;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute as HtmlAttribute, QualName};

use super::arena::{Attribute, Document, NodeData, NodeId};

/// Parse an HTML string into a [`Document`].
///
/// Parsing is lenient the way browsers are; it never fails.
pub fn parse_html(html: &str) -> Document {
    parse_document(HtmlSink::default(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
}

/// Tree builder target. html5ever only hands out `&self`, so the document
/// lives in a RefCell until parsing finishes.
#[derive(Default)]
pub(crate) struct HtmlSink {
    doc: RefCell<Document>,
}

fn convert_attrs(attrs: Vec<HtmlAttribute>) -> impl Iterator<Item = Attribute> {
    attrs.into_iter().map(|a| Attribute {
        name: a.name,
        value: a.value.to_string(),
    })
}

impl TreeSink for HtmlSink {
    type Handle = NodeId;
    type Output = Document;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Document {
        self.doc.into_inner()
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        log::trace!("html: {msg}");
    }

    fn get_document(&self) -> NodeId {
        self.doc.borrow().root()
    }

    fn elem_name<'a>(&'a self, target: &'a NodeId) -> &'a QualName {
        static NONE: QualName = QualName {
            prefix: None,
            ns: html5ever::ns!(),
            local: html5ever::local_name!(""),
        };
        match self.doc.borrow().name(*target) {
            // SAFETY: the arena only grows while parsing and element names are
            // never replaced, so the name outlives the RefCell borrow.
            Some(name) => unsafe { &*(name as *const QualName) },
            None => &NONE,
        }
    }

    fn create_element(&self, name: QualName, attrs: Vec<HtmlAttribute>, _: ElementFlags) -> NodeId {
        self.doc
            .borrow_mut()
            .create_element(name, convert_attrs(attrs).collect())
    }

    fn create_comment(&self, text: StrTendril) -> NodeId {
        self.doc.borrow_mut().create_comment(text.to_string())
    }

    // Processing instructions only occur in foreign content; keep their place.
    fn create_pi(&self, _: StrTendril, _: StrTendril) -> NodeId {
        self.doc.borrow_mut().create_comment(String::new())
    }

    fn append(&self, parent: &NodeId, child: NodeOrText<NodeId>) {
        let mut doc = self.doc.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => doc.append(*parent, node),
            NodeOrText::AppendText(text) => doc.append_text(*parent, &text),
        }
    }

    fn append_before_sibling(&self, sibling: &NodeId, child: NodeOrText<NodeId>) {
        let mut doc = self.doc.borrow_mut();
        let node = match child {
            NodeOrText::AppendNode(node) => node,
            NodeOrText::AppendText(text) => doc.create_text(text.to_string()),
        };
        doc.insert_before(*sibling, node);
    }

    /// Foster parenting: content misplaced in a table goes before the table
    /// when it is attached, inside the previous element otherwise.
    fn append_based_on_parent_node(&self, table: &NodeId, prev: &NodeId, child: NodeOrText<NodeId>) {
        let attached = self.doc.borrow().parent(*table).is_some();
        if attached {
            self.append_before_sibling(table, child);
        } else {
            self.append(prev, child);
        }
    }

    fn append_doctype_to_document(&self, name: StrTendril, public_id: StrTendril, system_id: StrTendril) {
        let mut doc = self.doc.borrow_mut();
        let doctype = doc.create_doctype(name.to_string(), public_id.to_string(), system_id.to_string());
        let root = doc.root();
        doc.append(root, doctype);
    }

    fn get_template_contents(&self, target: &NodeId) -> NodeId {
        *target
    }

    fn same_node(&self, x: &NodeId, y: &NodeId) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        log::trace!("html: quirks mode {mode:?}");
    }

    fn add_attrs_if_missing(&self, target: &NodeId, attrs: Vec<HtmlAttribute>) {
        let mut doc = self.doc.borrow_mut();
        if let Some(NodeData::Element { attrs: existing, .. }) = doc.get_mut(*target).map(|n| &mut n.data) {
            for attr in convert_attrs(attrs) {
                if !existing.iter().any(|a| a.name == attr.name) {
                    existing.push(attr);
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &NodeId) {
        self.doc.borrow_mut().detach(*target);
    }

    fn reparent_children(&self, node: &NodeId, new_parent: &NodeId) {
        let mut doc = self.doc.borrow_mut();
        for child in doc.child_ids(*node) {
            doc.detach(child);
            doc.append(*new_parent, child);
        }
    }
}
