//! Arena-based document tree.
//!
//! All nodes live in one vector and link to each other through [`NodeId`]
//! indices. Detaching or inserting a node only rewrites links, so ids held
//! elsewhere (by a walker's child snapshot, or by a span's origin) stay valid
//! for the lifetime of the document.

use html5ever::{LocalName, Namespace, Prefix, QualName};

use crate::error::{Error, Result};

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this is a valid node ID.
    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    /// Check if this is the sentinel value.
    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }

    fn into_option(self) -> Option<NodeId> {
        self.is_some().then_some(self)
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with name and ordered attributes.
    Element { name: QualName, attrs: Vec<Attribute> },
    /// Text leaf.
    Text(String),
    /// Comment. Carries no readable text.
    Comment(String),
    /// Document type declaration.
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
}

/// Element attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    /// Attribute with no namespace.
    pub fn new(local: &str, value: impl Into<String>) -> Self {
        Self {
            name: QualName::new(None, Namespace::from(""), LocalName::from(local)),
            value: value.into(),
        }
    }
}

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Arena-based document tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Create a new empty document with a document root.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId::NONE,
        };
        doc.root = doc.alloc(Node::new(NodeData::Document));
        doc
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// The document root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The first element child of the root, if any.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root).find(|&id| self.is_element(id))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id)
            .ok_or_else(|| Error::Tree(format!("no node with id {}", id.0)))
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        self.alloc(Node::new(NodeData::Element { name, attrs }))
    }

    /// Create a detached element with no namespace and no attributes.
    pub fn create_local_element(&mut self, local: &str) -> NodeId {
        self.create_element(
            QualName::new(None, Namespace::from(""), LocalName::from(local)),
            Vec::new(),
        )
    }

    /// Create a detached text leaf.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text.into())))
    }

    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Comment(text)))
    }

    pub fn create_doctype(&mut self, name: String, public_id: String, system_id: String) -> NodeId {
        self.alloc(Node::new(NodeData::Doctype {
            name,
            public_id,
            system_id,
        }))
    }

    /// Append a child to a parent node.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
            child_node.next_sibling = NodeId::NONE;
        }

        if let Some(last_node) = self.get_mut(last_child) {
            last_node.next_sibling = child;
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert a node before a sibling.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let parent = self.get(sibling).map(|n| n.parent).unwrap_or(NodeId::NONE);
        let prev = self.get(sibling).map(|n| n.prev_sibling).unwrap_or(NodeId::NONE);

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Insert a node immediately after a sibling.
    pub fn insert_after(&mut self, sibling: NodeId, new_node: NodeId) {
        let (parent, next) = match self.get(sibling) {
            Some(n) => (n.parent, n.next_sibling),
            None => return,
        };
        if next.is_some() {
            self.insert_before(next, new_node);
        } else {
            self.append(parent, new_node);
        }
    }

    /// Insert a child at a position among the parent's children.
    ///
    /// Indexes past the end append.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.node(parent)?;
        match self.children(parent).nth(index) {
            Some(at) => self.insert_before(at, child),
            None => self.append(parent, child),
        }
        Ok(())
    }

    /// Unlink a node from its parent. The node and its subtree stay in the
    /// arena and can be re-inserted.
    pub fn detach(&mut self, target: NodeId) {
        let (parent, prev, next) = match self.get(target) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(target) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Put `replacement` where `target` is and detach `target`.
    pub fn replace(&mut self, target: NodeId, replacement: NodeId) -> Result<()> {
        if self.node(target)?.parent.is_none() {
            return Err(Error::Tree(format!("node {} has no parent", target.0)));
        }
        self.detach(replacement);
        self.insert_before(target, replacement);
        self.detach(target);
        Ok(())
    }

    /// Parent of a node, if attached.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.into_option())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.into_option())
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.into_option())
    }

    /// Position of a node among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).position(|c| c == id)
    }

    /// Number of nodes allocated in the arena, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the document has nothing but its root.
    pub fn is_empty(&self) -> bool {
        self.get(self.root).is_none_or(|n| n.first_child.is_none())
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        let first = self.get(parent).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        ChildrenIter {
            doc: self,
            current: first,
        }
    }

    /// Snapshot of a node's child ids, safe to hold across mutation.
    pub fn child_ids(&self, parent: NodeId) -> Vec<NodeId> {
        self.children(parent).collect()
    }

    /// Iterate over a subtree in document order, starting with `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: if self.get(id).is_some() { vec![id] } else { Vec::new() },
        }
    }

    /// Find the first node in document order matching a predicate.
    pub fn find<F>(&self, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        self.descendants(self.root)
            .find(|&id| self.get(id).is_some_and(&predicate))
    }

    /// Find element by local name (first match).
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find(|node| match &node.data {
            NodeData::Element { name, .. } => name.local.as_ref() == tag,
            _ => false,
        })
    }

    /// Concatenated text of all leaves under a node, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|d| self.text(d))
            .collect()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over children of a node.
pub struct ChildrenIter<'a> {
    doc: &'a Document,
    current: NodeId,
}

impl Iterator for ChildrenIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .doc
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Depth-first pre-order iterator.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let mut children: Vec<_> = self.doc.children(id).collect();
        children.reverse();
        self.stack.extend(children);
        Some(id)
    }
}

/// Convenience accessors for elements and text leaves.
impl Document {
    pub fn name(&self, id: NodeId) -> Option<&QualName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        })
    }

    /// Element's local name (tag).
    pub fn element_name(&self, id: NodeId) -> Option<&LocalName> {
        self.name(id).map(|n| &n.local)
    }

    pub fn element_namespace(&self, id: NodeId) -> Option<&Namespace> {
        self.name(id).map(|n| &n.ns)
    }

    /// Rename an element.
    pub fn set_name(&mut self, id: NodeId, new_name: QualName) -> Result<()> {
        match self.get_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Element { name, .. }) => {
                *name = new_name;
                Ok(())
            }
            _ => Err(Error::Tree(format!("node {} is not an element", id.0))),
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Element { attrs, .. }) => attrs,
            _ => &[],
        }
    }

    /// Attribute value by local name, ignoring namespace.
    pub fn get_attr(&self, id: NodeId, local: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name.local.as_ref() == local)
            .map(|a| a.value.as_str())
    }

    /// Attribute value by namespace and local name.
    pub fn get_attr_ns(&self, id: NodeId, ns: &Namespace, local: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| &a.name.ns == ns && a.name.local.as_ref() == local)
            .map(|a| a.value.as_str())
    }

    /// Set (or add) an attribute on an element.
    pub fn set_attr(&mut self, id: NodeId, name: QualName, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        match self.get_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Element { attrs, .. }) => {
                match attrs
                    .iter_mut()
                    .find(|a| a.name.ns == name.ns && a.name.local == name.local)
                {
                    Some(existing) => existing.value = value,
                    None => attrs.push(Attribute { name, value }),
                }
                Ok(())
            }
            _ => Err(Error::Tree(format!("node {} is not an element", id.0))),
        }
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attr(&mut self, id: NodeId, ns: &Namespace, local: &str) -> Option<String> {
        match self.get_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Element { attrs, .. }) => {
                let pos = attrs
                    .iter()
                    .position(|a| &a.name.ns == ns && a.name.local.as_ref() == local)?;
                Some(attrs.remove(pos).value)
            }
            _ => None,
        }
    }

    /// Element's id attribute.
    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.get_attr(id, "id")
    }

    /// Whitespace-separated class list.
    pub fn element_classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.get_attr(id, "class")
            .unwrap_or_default()
            .split_whitespace()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| matches!(n.data, NodeData::Text(_)))
    }

    /// Value of a text leaf.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Replace the value of a text leaf.
    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) -> Result<()> {
        match self.get_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Text(s)) => {
                *s = value.into();
                Ok(())
            }
            _ => Err(Error::Tree(format!("node {} is not a text leaf", id.0))),
        }
    }

    /// Append text to the last text child, or create a new leaf.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(last) = self.get_mut(last_child)
            && let NodeData::Text(ref mut existing) = last.data
        {
            existing.push_str(text);
            return;
        }

        let text_node = self.create_text(text);
        self.append(parent, text_node);
    }

    /// Short description of a node for error messages: tag or node kind,
    /// arena index and the path of element names from the root.
    pub fn describe(&self, id: NodeId) -> String {
        let label = match self.get(id).map(|n| &n.data) {
            Some(NodeData::Element { name, .. }) => format!("<{}>", qualified(name)),
            Some(NodeData::Text(_)) => "#text".to_string(),
            Some(NodeData::Comment(_)) => "#comment".to_string(),
            Some(NodeData::Doctype { .. }) => "#doctype".to_string(),
            Some(NodeData::Document) => "#document".to_string(),
            None => return format!("#{} (missing)", id.0),
        };

        let mut path = Vec::new();
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if let Some(name) = self.element_name(ancestor) {
                let pos = self.index_in_parent(ancestor).unwrap_or(0);
                path.push(format!("{}[{}]", name.as_ref(), pos));
            }
            current = self.parent(ancestor);
        }
        path.reverse();

        if path.is_empty() {
            format!("{label} #{}", id.0)
        } else {
            format!("{label} #{} at /{}", id.0, path.join("/"))
        }
    }
}

/// `prefix:local` (or just `local`) for a qualified name.
pub fn qualified(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix.as_ref(), name.local.as_ref()),
        _ => name.local.to_string(),
    }
}

/// Build a qualified name from parts.
pub fn qual_name(prefix: Option<&str>, ns: &str, local: &str) -> QualName {
    QualName::new(prefix.map(Prefix::from), Namespace::from(ns), LocalName::from(local))
}
