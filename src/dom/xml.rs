//! XML reading and writing for [`Document`].
//!
//! Namespace prefixes are resolved with a scope stack built from `xmlns`
//! declarations as the reader descends; the declarations themselves are kept
//! as ordinary attributes so a document round-trips unchanged.

use std::borrow::Cow;
use std::collections::HashMap;

use html5ever::{LocalName, Namespace, Prefix, QualName};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use super::arena::{Attribute, Document, NodeData, NodeId, qualified};
use crate::error::{Error, Result};

const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Parse XML text into a [`Document`].
pub fn parse_xml(content: &str) -> Result<Document> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut doc = Document::new();
    let mut stack: Vec<NodeId> = vec![doc.root()];
    let mut scopes = ScopeStack::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let parent = current(&stack)?;
                let id = open_element(&mut doc, &mut scopes, &e)?;
                doc.append(parent, id);
                stack.push(id);
            }
            Ok(Event::Empty(e)) => {
                let parent = current(&stack)?;
                let id = open_element(&mut doc, &mut scopes, &e)?;
                doc.append(parent, id);
                scopes.pop();
            }
            Ok(Event::End(_)) => {
                if stack.len() <= 1 {
                    return Err(Error::Tree("unbalanced end tag".into()));
                }
                stack.pop();
                scopes.pop();
            }
            Ok(Event::Text(e)) => {
                let parent = current(&stack)?;
                if parent != doc.root() {
                    doc.append_text(parent, &String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                let parent = current(&stack)?;
                doc.append_text(parent, &String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::GeneralRef(e)) => {
                let parent = current(&stack)?;
                let entity = String::from_utf8_lossy(e.as_ref());
                if let Some(resolved) = resolve_entity(&entity) {
                    doc.append_text(parent, &resolved);
                }
            }
            Ok(Event::Comment(e)) => {
                let parent = current(&stack)?;
                let comment = doc.create_comment(String::from_utf8_lossy(e.as_ref()).into_owned());
                doc.append(parent, comment);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(Error::Tree("unclosed element at end of document".into()));
    }
    Ok(doc)
}

fn current(stack: &[NodeId]) -> Result<NodeId> {
    stack
        .last()
        .copied()
        .ok_or_else(|| Error::Tree("element stack underflow".into()))
}

/// Resolve a named or numeric character reference.
fn resolve_entity(entity: &str) -> Option<Cow<'static, str>> {
    let resolved = match entity {
        "apos" => "'",
        "quot" => "\"",
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "nbsp" => "\u{00A0}",
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x").or(entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            return char::from_u32(code).map(|c| Cow::Owned(c.to_string()));
        }
    };
    Some(Cow::Borrowed(resolved))
}

fn open_element(doc: &mut Document, scopes: &mut ScopeStack, e: &BytesStart<'_>) -> Result<NodeId> {
    let mut raw_attrs = Vec::new();
    let mut declared = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.into()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = unescape(&raw)
            .map(|v| v.into_owned())
            .unwrap_or(raw);
        if key == "xmlns" {
            declared.insert(String::new(), value.clone());
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declared.insert(prefix.to_string(), value.clone());
        }
        raw_attrs.push((key, value));
    }
    scopes.push(declared);

    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let name = scopes.element_name(&tag)?;

    let attrs = raw_attrs
        .into_iter()
        .map(|(key, value)| {
            Ok(Attribute {
                name: scopes.attribute_name(&key)?,
                value,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(doc.create_element(name, attrs))
}

struct ScopeStack {
    scopes: Vec<HashMap<String, String>>,
}

impl ScopeStack {
    fn new() -> Self {
        let mut base = HashMap::new();
        base.insert("xml".to_string(), XML_NS.to_string());
        base.insert("xmlns".to_string(), XMLNS.to_string());
        Self { scopes: vec![base] }
    }

    fn push(&mut self, declared: HashMap<String, String>) {
        self.scopes.push(declared);
    }

    fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(prefix))
            .map(String::as_str)
    }

    fn element_name(&self, tag: &str) -> Result<QualName> {
        match tag.split_once(':') {
            Some((prefix, local)) => {
                let ns = self
                    .lookup(prefix)
                    .ok_or_else(|| Error::Tree(format!("undeclared namespace prefix '{prefix}'")))?;
                Ok(QualName::new(
                    Some(Prefix::from(prefix)),
                    Namespace::from(ns),
                    LocalName::from(local),
                ))
            }
            None => Ok(QualName::new(
                None,
                Namespace::from(self.lookup("").unwrap_or("")),
                LocalName::from(tag),
            )),
        }
    }

    fn attribute_name(&self, key: &str) -> Result<QualName> {
        if key == "xmlns" {
            return Ok(QualName::new(None, Namespace::from(XMLNS), LocalName::from("xmlns")));
        }
        match key.split_once(':') {
            Some((prefix, local)) => {
                let ns = self
                    .lookup(prefix)
                    .ok_or_else(|| Error::Tree(format!("undeclared namespace prefix '{prefix}'")))?;
                Ok(QualName::new(
                    Some(Prefix::from(prefix)),
                    Namespace::from(ns),
                    LocalName::from(local),
                ))
            }
            // Unprefixed attributes are in no namespace.
            None => Ok(QualName::new(None, Namespace::from(""), LocalName::from(key))),
        }
    }
}

/// Serialize a document to an XML string.
///
/// Elements whose prefix is not declared in scope (for example annotations
/// inserted by a pass) get an `xmlns:prefix` declaration added on output.
pub fn to_xml_string(doc: &Document) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    let mut scopes = ScopeStack::new();
    for child in doc.children(doc.root()) {
        write_node(doc, child, &mut writer, &mut scopes)?;
    }
    Ok(String::from_utf8(writer.into_inner())?)
}

/// Serialize the subtree rooted at `id`.
pub fn node_to_xml_string(doc: &Document, id: NodeId) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    let mut scopes = ScopeStack::new();
    write_node(doc, id, &mut writer, &mut scopes)?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_node(
    doc: &Document,
    id: NodeId,
    writer: &mut Writer<Vec<u8>>,
    scopes: &mut ScopeStack,
) -> Result<()> {
    let Some(node) = doc.get(id) else {
        return Ok(());
    };
    match &node.data {
        NodeData::Document => {
            for child in doc.children(id) {
                write_node(doc, child, writer, scopes)?;
            }
        }
        NodeData::Text(text) => {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        NodeData::Comment(text) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
        }
        NodeData::Doctype { .. } => {}
        NodeData::Element { name, attrs } => {
            let tag = qualified(name);
            let mut start = BytesStart::new(tag.as_str());
            let mut declared = HashMap::new();

            for attr in attrs {
                let key = if attr.name.local.as_ref() == "xmlns" && attr.name.prefix.is_none() {
                    declared.insert(String::new(), attr.value.clone());
                    "xmlns".to_string()
                } else {
                    let key = qualified(&attr.name);
                    if let Some(prefix) = key.strip_prefix("xmlns:") {
                        declared.insert(prefix.to_string(), attr.value.clone());
                    }
                    key
                };
                start.push_attribute((key.as_str(), attr.value.as_str()));
            }

            scopes.push(declared);
            for missing in missing_declarations(name, attrs, scopes) {
                let (prefix, uri) = missing;
                let key = if prefix.is_empty() {
                    "xmlns".to_string()
                } else {
                    format!("xmlns:{prefix}")
                };
                start.push_attribute((key.as_str(), uri.as_str()));
                if let Some(scope) = scopes.scopes.last_mut() {
                    scope.insert(prefix, uri);
                }
            }

            if node.first_child.is_none() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for child in doc.children(id) {
                    write_node(doc, child, writer, scopes)?;
                }
                writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
            }
            scopes.pop();
        }
    }
    Ok(())
}

/// Prefix declarations an element needs that are not already in scope.
fn missing_declarations(
    name: &QualName,
    attrs: &[Attribute],
    scopes: &ScopeStack,
) -> Vec<(String, String)> {
    let mut missing: Vec<(String, String)> = Vec::new();
    let mut require = |prefix: &str, ns: &str| {
        if ns.is_empty() || ns == XMLNS || ns == XML_NS {
            return;
        }
        if scopes.lookup(prefix) != Some(ns) && !missing.iter().any(|(p, _)| p == prefix) {
            missing.push((prefix.to_string(), ns.to_string()));
        }
    };

    let element_prefix = name.prefix.as_ref().map(|p| p.as_ref()).unwrap_or("");
    require(element_prefix, name.ns.as_ref());
    for attr in attrs {
        if let Some(prefix) = &attr.name.prefix {
            require(prefix.as_ref(), attr.name.ns.as_ref());
        }
    }
    missing
}
