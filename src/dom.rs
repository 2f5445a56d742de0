//! The document tree and the operations for navigating and editing it.

use std::borrow::Cow;

use tracing::debug;

use super::raw::{self, AttributeId, LeafKind, NodeId, NodeKind, PoolStats, Storage};
use super::span::StrSpan;
use super::{Config, DomError, Error};

static DEFAULT_DECLARATION: &str = r#"xml version="1.0" encoding="UTF-8""#;

/// An XML document.
///
/// The document owns every node in it, the buffer that parsed text
/// lives in, and the error left by the last parse, load, or save.
pub struct Document {
    pub(crate) storage: Storage,
    pub(crate) buffer: Vec<u8>,
    pub(crate) error: Option<Error>,
    pub(crate) bom: bool,
    pub(crate) config: Config,
}

impl Default for Document {
    fn default() -> Document {
        Document::new()
    }
}

impl Document {
    pub fn new() -> Document {
        Document::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Document {
        Document {
            storage: Storage::new(),
            buffer: Vec::new(),
            error: None,
            bom: false,
            config,
        }
    }

    pub fn config(&self) -> Config { self.config }

    /// The document node. Its children are the top-level nodes.
    pub fn root(&self) -> NodeId { NodeId::DOCUMENT }

    /// The first top-level element.
    pub fn root_element(&self) -> Option<NodeId> {
        self.first_child_element(self.root(), None)
    }

    /// The error recorded by the last parse, load, or save, if it
    /// failed.
    pub fn error(&self) -> Option<&Error> { self.error.as_ref() }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub(crate) fn fail(&mut self, error: Error) -> Error {
        debug!(%error, "document operation failed");
        self.error = Some(error.clone());
        error
    }

    pub fn has_bom(&self) -> bool { self.bom }

    pub fn set_bom(&mut self, bom: bool) {
        self.bom = bom;
    }

    /// Deletes every node, drops the parse buffer, and forgets any
    /// error.
    pub fn clear(&mut self) {
        self.storage.clear();
        self.buffer.clear();
        self.error = None;
        self.bom = false;
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.storage.stats()
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.storage.kind(node)
    }

    /// True if the handle still refers to a node of this document.
    pub fn contains(&self, node: NodeId) -> bool {
        self.storage.contains(node)
    }

    pub fn new_element(&mut self, name: &str) -> NodeId {
        self.storage.create_element(StrSpan::owned(name), None)
    }

    pub fn new_text(&mut self, text: &str) -> NodeId {
        self.storage.create_text(StrSpan::owned(text), false, None)
    }

    pub fn new_comment(&mut self, comment: &str) -> NodeId {
        self.storage.create_leaf(LeafKind::Comment, StrSpan::owned(comment), None)
    }

    /// A declaration; without text it declares XML 1.0 in UTF-8.
    pub fn new_declaration(&mut self, text: Option<&str>) -> NodeId {
        let value = match text {
            Some(text) => StrSpan::owned(text),
            None => StrSpan::interned(DEFAULT_DECLARATION),
        };
        self.storage.create_leaf(LeafKind::Declaration, value, None)
    }

    pub fn new_unknown(&mut self, text: &str) -> NodeId {
        self.storage.create_leaf(LeafKind::Unknown, StrSpan::owned(text), None)
    }

    /// The name of an element, or the content of any other node.
    /// Decodes the text on first read.
    pub fn value(&mut self, node: NodeId) -> Option<&str> {
        let core = self.storage.core_mut(node)?;
        Some(core.value.get(&mut self.buffer))
    }

    /// Like `value`, but never touches the buffer. Text that has not
    /// been read yet is decoded into a copy.
    pub fn peek_value(&self, node: NodeId) -> Option<Cow<str>> {
        let core = self.storage.core(node)?;
        Some(core.value.peek(&self.buffer))
    }

    /// The name of an element.
    pub fn name(&self, element: NodeId) -> Option<&str> {
        let element = self.storage.element(element)?;
        element.core.value.as_str(&self.buffer)
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) -> Result<(), DomError> {
        self.replace_value(node, StrSpan::owned(value))
    }

    /// Sets the value without copying it.
    pub fn set_value_static(&mut self, node: NodeId, value: &'static str) -> Result<(), DomError> {
        self.replace_value(node, StrSpan::interned(value))
    }

    fn replace_value(&mut self, node: NodeId, value: StrSpan) -> Result<(), DomError> {
        if node == NodeId::DOCUMENT {
            return Err(DomError::NoValue);
        }
        let core = self.storage.core_mut(node).ok_or(DomError::StaleNode)?;
        core.value = value;
        Ok(())
    }

    /// The line the node started on, for parsed nodes.
    pub fn line(&self, node: NodeId) -> Option<usize> {
        self.storage.core(node).and_then(|c| c.line)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.storage.parent(node)
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.storage.children(node).and_then(|l| l.first)
    }

    pub fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.storage.children(node).and_then(|l| l.last)
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.storage.next(node)
    }

    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.storage.prev(node)
    }

    pub fn children(&self, node: NodeId) -> Children {
        Children {
            storage: &self.storage,
            next: self.first_child(node),
        }
    }

    fn is_element_named(&self, node: NodeId, name: Option<&str>) -> bool {
        match name {
            None => self.storage.element(node).is_some(),
            Some(name) => self.name(node) == Some(name),
        }
    }

    fn scan<F>(&self, start: Option<NodeId>, name: Option<&str>, step: F) -> Option<NodeId>
        where F: Fn(&Storage, NodeId) -> Option<NodeId>
    {
        let mut current = start;
        while let Some(node) = current {
            if self.is_element_named(node, name) {
                return Some(node);
            }
            current = step(&self.storage, node);
        }
        None
    }

    /// The first child element, optionally restricted to one name.
    pub fn first_child_element(&self, node: NodeId, name: Option<&str>) -> Option<NodeId> {
        self.scan(self.first_child(node), name, Storage::next)
    }

    pub fn last_child_element(&self, node: NodeId, name: Option<&str>) -> Option<NodeId> {
        self.scan(self.last_child(node), name, Storage::prev)
    }

    pub fn next_sibling_element(&self, node: NodeId, name: Option<&str>) -> Option<NodeId> {
        self.scan(self.next_sibling(node), name, Storage::next)
    }

    pub fn previous_sibling_element(&self, node: NodeId, name: Option<&str>) -> Option<NodeId> {
        self.scan(self.previous_sibling(node), name, Storage::prev)
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(DomError::StaleNode);
        }
        if self.storage.children(parent).is_none() {
            return Err(DomError::NotAContainer);
        }
        if child == NodeId::DOCUMENT {
            return Err(DomError::InvalidChild);
        }
        if self.storage.is_ancestor_or_self(child, parent) {
            return Err(DomError::WouldCycle);
        }
        Ok(())
    }

    /// Makes `child` the last child of `parent`, moving it from
    /// wherever it was.
    pub fn insert_end_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        self.check_insert(parent, child)?;
        self.storage.unlink(child);
        self.storage.link_last(parent, child);
        Ok(child)
    }

    pub fn insert_first_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        self.check_insert(parent, child)?;
        self.storage.unlink(child);
        self.storage.link_first(parent, child);
        Ok(child)
    }

    /// Places `child` directly after `after`, which must already be a
    /// child of `parent`. Inserting a node after itself changes
    /// nothing.
    pub fn insert_after_child(&mut self, parent: NodeId, after: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        self.check_insert(parent, child)?;
        if self.parent(after) != Some(parent) {
            return Err(DomError::NotAChild);
        }
        if after == child {
            return Ok(child);
        }
        if self.next_sibling(after).is_none() {
            return self.insert_end_child(parent, child);
        }

        self.storage.unlink(child);
        self.storage.link_after(parent, after, child);
        Ok(child)
    }

    /// Detaches the node from its parent without deleting it.
    pub fn unlink(&mut self, node: NodeId) -> Result<(), DomError> {
        if !self.contains(node) {
            return Err(DomError::StaleNode);
        }
        self.storage.unlink(node);
        Ok(())
    }

    /// Deletes the node, all of its descendants, and their attributes.
    /// Deleting the document node deletes its children.
    pub fn delete_node(&mut self, node: NodeId) -> Result<(), DomError> {
        if !self.contains(node) {
            return Err(DomError::StaleNode);
        }
        self.storage.destroy(node);
        Ok(())
    }

    pub fn delete_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild);
        }
        self.delete_node(child)
    }

    pub fn delete_children(&mut self, parent: NodeId) -> Result<(), DomError> {
        if !self.contains(parent) {
            return Err(DomError::StaleNode);
        }
        self.storage.destroy_children(parent);
        Ok(())
    }

    pub fn first_attribute(&self, element: NodeId) -> Option<AttributeId> {
        self.storage.first_attribute(element)
    }

    pub fn next_attribute(&self, attribute: AttributeId) -> Option<AttributeId> {
        self.storage.next_attribute(attribute)
    }

    pub fn attributes(&self, element: NodeId) -> Attributes {
        Attributes {
            storage: &self.storage,
            next: self.first_attribute(element),
        }
    }

    pub fn find_attribute(&self, element: NodeId, name: &str) -> Option<AttributeId> {
        self.storage.find_attribute(element, name, &self.buffer)
    }

    pub fn attribute_name(&self, attribute: AttributeId) -> Option<&str> {
        self.storage.attribute(attribute)?.name.as_str(&self.buffer)
    }

    pub fn attribute_value(&mut self, attribute: AttributeId) -> Option<&str> {
        let attribute = self.storage.attribute_mut(attribute)?;
        Some(attribute.value.get(&mut self.buffer))
    }

    pub fn peek_attribute_value(&self, attribute: AttributeId) -> Option<Cow<str>> {
        let attribute = self.storage.attribute(attribute)?;
        Some(attribute.value.peek(&self.buffer))
    }

    /// The decoded value of the named attribute.
    pub fn attribute(&mut self, element: NodeId, name: &str) -> Option<&str> {
        let id = self.find_attribute(element, name)?;
        self.attribute_value(id)
    }

    /// Replaces the value of the named attribute, or appends a new
    /// attribute if there is none.
    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Result<AttributeId, DomError> {
        if self.storage.element(element).is_none() {
            return Err(self.not_an_element(element));
        }

        match self.find_attribute(element, name) {
            Some(id) => {
                let attribute = self.storage.attribute_mut(id).ok_or(DomError::StaleNode)?;
                attribute.value = StrSpan::owned(value);
                Ok(id)
            }
            None => {
                self.storage.append_attribute(element, StrSpan::owned(name), StrSpan::owned(value))
                    .ok_or(DomError::StaleNode)
            }
        }
    }

    /// Returns false if there was no such attribute.
    pub fn delete_attribute(&mut self, element: NodeId, name: &str) -> bool {
        match self.find_attribute(element, name) {
            Some(id) => self.storage.remove_attribute(element, id),
            None => false,
        }
    }

    fn not_an_element(&self, node: NodeId) -> DomError {
        if self.contains(node) { DomError::NotAContainer } else { DomError::StaleNode }
    }

    /// The text of the element's first child, if that child is text.
    pub fn text(&mut self, element: NodeId) -> Option<&str> {
        self.storage.element(element)?;
        let first = self.first_child(element)?;
        let text = self.storage.text_mut(first)?;
        Some(text.core.value.get(&mut self.buffer))
    }

    /// Replaces the text of the element's first child if that child is
    /// text, otherwise inserts a new text node in front of the others.
    pub fn set_text(&mut self, element: NodeId, text: &str) -> Result<NodeId, DomError> {
        if self.storage.element(element).is_none() {
            return Err(self.not_an_element(element));
        }

        if let Some(first) = self.first_child(element) {
            if let Some(existing) = self.storage.text_mut(first) {
                existing.core.value = StrSpan::owned(text);
                return Ok(first);
            }
        }

        let node = self.new_text(text);
        self.insert_first_child(element, node)
    }

    pub fn is_cdata(&self, node: NodeId) -> bool {
        self.storage.text(node).map_or(false, |t| t.cdata)
    }

    pub fn set_cdata(&mut self, node: NodeId, cdata: bool) -> Result<(), DomError> {
        if !self.contains(node) {
            return Err(DomError::StaleNode);
        }

        match self.storage.text_mut(node) {
            Some(text) => {
                text.cdata = cdata;
                Ok(())
            }
            None => Err(DomError::InvalidChild),
        }
    }

    /// Compares kind and value and, for elements, the attributes in
    /// order. Children are not compared. The nodes may belong to
    /// different documents.
    pub fn shallow_equal(&self, node: NodeId, other: &Document, other_node: NodeId) -> bool {
        let kind = self.kind(node);
        if kind.is_none() || kind != other.kind(other_node) {
            return false;
        }
        if self.peek_value(node) != other.peek_value(other_node) {
            return false;
        }
        if self.is_cdata(node) != other.is_cdata(other_node) {
            return false;
        }

        let mut ours = self.attributes(node);
        let mut theirs = other.attributes(other_node);
        loop {
            match (ours.next(), theirs.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) => {
                    if self.attribute_name(a) != other.attribute_name(b)
                        || self.peek_attribute_value(a) != other.peek_attribute_value(b)
                    {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }

    /// A detached copy of the node and its descendants.
    pub fn deep_clone(&mut self, node: NodeId) -> Result<NodeId, DomError> {
        if node == NodeId::DOCUMENT {
            return Err(DomError::InvalidChild);
        }
        let snapshot = self.snapshot(node).ok_or(DomError::StaleNode)?;
        Ok(self.materialize(&snapshot))
    }

    /// Copies the node and its descendants into `target`, detached.
    /// Copying the document node replaces all of `target`'s children
    /// instead.
    pub fn deep_copy_to(&self, node: NodeId, target: &mut Document) -> Result<NodeId, DomError> {
        let snapshot = self.snapshot(node).ok_or(DomError::StaleNode)?;

        if node != NodeId::DOCUMENT {
            return Ok(target.materialize(&snapshot));
        }

        let root = target.root();
        target.storage.destroy_children(root);
        for child in &snapshot.children {
            let copy = target.materialize(child);
            target.storage.link_last(root, copy);
        }
        Ok(root)
    }

    fn snapshot(&self, node: NodeId) -> Option<Snapshot> {
        let kind = self.kind(node)?;
        let value = self.peek_value(node).map(Cow::into_owned).unwrap_or_default();

        let attributes = self.attributes(node)
            .map(|a| {
                let name = self.attribute_name(a).unwrap_or_default().to_owned();
                let value = self.peek_attribute_value(a).map(Cow::into_owned).unwrap_or_default();
                (name, value)
            })
            .collect();

        let children = self.children(node)
            .filter_map(|c| self.snapshot(c))
            .collect();

        Some(Snapshot {
            kind,
            value,
            cdata: self.is_cdata(node),
            attributes,
            children,
        })
    }

    fn materialize(&mut self, snapshot: &Snapshot) -> NodeId {
        let value = StrSpan::Owned(snapshot.value.clone());
        let node = match snapshot.kind {
            NodeKind::Element | NodeKind::Document => self.storage.create_element(value, None),
            NodeKind::Text => self.storage.create_text(value, snapshot.cdata, None),
            NodeKind::Comment => self.storage.create_leaf(LeafKind::Comment, value, None),
            NodeKind::Declaration => self.storage.create_leaf(LeafKind::Declaration, value, None),
            NodeKind::Unknown => self.storage.create_leaf(LeafKind::Unknown, value, None),
        };

        for (name, value) in &snapshot.attributes {
            self.storage.append_attribute(node, StrSpan::owned(name), StrSpan::owned(value));
        }

        for child in &snapshot.children {
            let copy = self.materialize(child);
            self.storage.link_last(node, copy);
        }

        node
    }

    /// Performs the owed decoding of the node's value and its
    /// attributes, so they can be read through `&self`.
    pub(crate) fn flush(&mut self, node: NodeId) {
        let Document { storage, buffer, .. } = self;

        if let Some(core) = storage.core_mut(node) {
            core.value.flush(buffer);
        }

        let mut current = storage.first_attribute(node);
        while let Some(id) = current {
            current = match storage.attribute_mut(id) {
                Some(attribute) => {
                    attribute.name.flush(buffer);
                    attribute.value.flush(buffer);
                    attribute.next
                }
                None => None,
            };
        }
    }
}

struct Snapshot {
    kind: NodeKind,
    value: String,
    cdata: bool,
    attributes: Vec<(String, String)>,
    children: Vec<Snapshot>,
}

/// The children of a node, in document order.
pub struct Children<'d> {
    storage: &'d raw::Storage,
    next: Option<NodeId>,
}

impl<'d> Iterator for Children<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.next?;
        self.next = self.storage.next(node);
        Some(node)
    }
}

/// The attributes of an element, in the order they were added.
pub struct Attributes<'d> {
    storage: &'d raw::Storage,
    next: Option<AttributeId>,
}

impl<'d> Iterator for Attributes<'d> {
    type Item = AttributeId;

    fn next(&mut self) -> Option<AttributeId> {
        let attribute = self.next?;
        self.next = self.storage.next_attribute(attribute);
        Some(attribute)
    }
}
