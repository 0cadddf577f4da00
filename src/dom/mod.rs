//! Document tree the engine reads and annotates.
//!
//! The tree is an arena ([`Document`]) addressed by [`NodeId`]. It can be
//! built programmatically, parsed from XML with [`parse_xml`], or parsed from
//! HTML with [`parse_html`].

mod arena;
mod element_ref;
mod tree_sink;
mod xml;

pub use arena::{
    Attribute, ChildrenIter, Descendants, Document, Node, NodeData, NodeId, qual_name, qualified,
};
pub use element_ref::{
    ElementRef, SelectorParser, TactusSelectors, matches_any, parse_selector_list,
};
pub use tree_sink::parse_html;
pub use xml::{node_to_xml_string, parse_xml, to_xml_string};

use html5ever::{LocalName, Namespace, Prefix, QualName};

/// Namespace of everything the engine writes into a document: annotation
/// elements and marker attributes.
pub const UTD_NS: &str = "urn:tactus:utd";

/// Prefix used when serializing [`UTD_NS`].
pub const UTD_PREFIX: &str = "utd";

/// Local name of annotation elements.
pub const BRL: &str = "brl";

/// Qualified name in the engine namespace.
pub fn utd_name(local: &str) -> QualName {
    QualName::new(
        Some(Prefix::from(UTD_PREFIX)),
        Namespace::from(UTD_NS),
        LocalName::from(local),
    )
}

/// Whether a node is an annotation element written by a pass.
pub fn is_annotation(doc: &Document, id: NodeId) -> bool {
    doc.name(id)
        .is_some_and(|n| n.ns.as_ref() == UTD_NS && n.local.as_ref() == BRL)
}

/// Decode raw document bytes and parse them as XML.
pub fn parse_xml_bytes(bytes: &[u8]) -> crate::Result<Document> {
    let text = crate::util::decode_text(bytes, crate::util::sniff_xml_encoding(bytes));
    parse_xml(&text)
}

/// Decode raw document bytes and parse them as HTML.
pub fn parse_html_bytes(bytes: &[u8]) -> Document {
    parse_html(&crate::util::decode_text(bytes, crate::util::sniff_html_charset(bytes)))
}
