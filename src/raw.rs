//! Node records and the links between them.
//!
//! Every record lives in a pool for its size class. Parent, sibling,
//! and child links are plain handles; the tree shape is maintained
//! here and nowhere else.

use crate::pool::{Pool, Slot};
use crate::span::StrSpan;

use tracing::trace;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Handle {
    Document,
    Element(Slot),
    Text(Slot),
    Leaf(Slot),
}

/// A node of a document.
///
/// Handles are cheap to copy and stay valid until the node is
/// deleted; after that they no longer resolve.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Handle);

impl NodeId {
    pub(crate) const DOCUMENT: NodeId = NodeId(Handle::Document);
}

/// An attribute of an element.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AttributeId(pub(crate) Slot);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Comment,
    Declaration,
    Unknown,
}

/// The kinds that share the leaf pool.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum LeafKind {
    Comment,
    Declaration,
    Unknown,
}

#[derive(Debug, Default)]
pub(crate) struct Core {
    pub value: StrSpan,
    pub line: Option<usize>,
    pub parent: Option<NodeId>,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
}

#[derive(Debug, Default, Copy, Clone)]
pub(crate) struct ChildLinks {
    pub first: Option<NodeId>,
    pub last: Option<NodeId>,
}

#[derive(Debug)]
pub(crate) struct Element {
    pub core: Core,
    pub children: ChildLinks,
    pub first_attribute: Option<AttributeId>,
}

#[derive(Debug)]
pub(crate) struct Text {
    pub core: Core,
    pub cdata: bool,
}

#[derive(Debug)]
pub(crate) struct Leaf {
    pub core: Core,
    pub kind: LeafKind,
}

#[derive(Debug)]
pub(crate) struct Attribute {
    pub name: StrSpan,
    pub value: StrSpan,
    pub next: Option<AttributeId>,
}

/// Live slot counts per size class.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub elements: usize,
    pub attributes: usize,
    pub texts: usize,
    pub leaves: usize,
}

impl PoolStats {
    pub fn total(&self) -> usize {
        self.elements + self.attributes + self.texts + self.leaves
    }
}

#[derive(Default)]
pub(crate) struct Storage {
    elements: Pool<Element>,
    attributes: Pool<Attribute>,
    texts: Pool<Text>,
    leaves: Pool<Leaf>,
    root: ChildLinks,
}

impl Storage {
    pub fn new() -> Storage {
        Storage::default()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            elements: self.elements.live(),
            attributes: self.attributes.live(),
            texts: self.texts.live(),
            leaves: self.leaves.live(),
        }
    }

    /// Drops every node, linked or not.
    ///
    /// The tree is torn down node by node first so the live counts can
    /// be checked: whatever is still live afterwards was detached.
    pub fn clear(&mut self) {
        self.destroy_children(NodeId::DOCUMENT);
        debug_assert!(self.root.first.is_none() && self.root.last.is_none());

        let detached = self.stats();
        if detached.total() > 0 {
            trace!(?detached, "dropping detached nodes");
        }

        self.elements.clear();
        self.attributes.clear();
        self.texts.clear();
        self.leaves.clear();
        self.root = ChildLinks::default();
        debug_assert_eq!(0, self.stats().total(), "pool accounting leaked slots");
    }

    pub fn create_element(&mut self, name: StrSpan, line: Option<usize>) -> NodeId {
        let slot = self.elements.alloc(Element {
            core: Core { value: name, line, ..Core::default() },
            children: ChildLinks::default(),
            first_attribute: None,
        });
        NodeId(Handle::Element(slot))
    }

    pub fn create_text(&mut self, text: StrSpan, cdata: bool, line: Option<usize>) -> NodeId {
        let slot = self.texts.alloc(Text {
            core: Core { value: text, line, ..Core::default() },
            cdata,
        });
        NodeId(Handle::Text(slot))
    }

    pub fn create_leaf(&mut self, kind: LeafKind, value: StrSpan, line: Option<usize>) -> NodeId {
        let slot = self.leaves.alloc(Leaf {
            core: Core { value, line, ..Core::default() },
            kind,
        });
        NodeId(Handle::Leaf(slot))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        match id.0 {
            Handle::Document => true,
            Handle::Element(s) => self.elements.contains(s),
            Handle::Text(s) => self.texts.contains(s),
            Handle::Leaf(s) => self.leaves.contains(s),
        }
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        match id.0 {
            Handle::Document => Some(NodeKind::Document),
            Handle::Element(s) => self.elements.get(s).map(|_| NodeKind::Element),
            Handle::Text(s) => self.texts.get(s).map(|_| NodeKind::Text),
            Handle::Leaf(s) => self.leaves.get(s).map(|l| match l.kind {
                LeafKind::Comment => NodeKind::Comment,
                LeafKind::Declaration => NodeKind::Declaration,
                LeafKind::Unknown => NodeKind::Unknown,
            }),
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match id.0 {
            Handle::Element(s) => self.elements.get(s),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match id.0 {
            Handle::Element(s) => self.elements.get_mut(s),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&Text> {
        match id.0 {
            Handle::Text(s) => self.texts.get(s),
            _ => None,
        }
    }

    pub fn text_mut(&mut self, id: NodeId) -> Option<&mut Text> {
        match id.0 {
            Handle::Text(s) => self.texts.get_mut(s),
            _ => None,
        }
    }

    pub fn core(&self, id: NodeId) -> Option<&Core> {
        match id.0 {
            Handle::Document => None,
            Handle::Element(s) => self.elements.get(s).map(|n| &n.core),
            Handle::Text(s) => self.texts.get(s).map(|n| &n.core),
            Handle::Leaf(s) => self.leaves.get(s).map(|n| &n.core),
        }
    }

    pub fn core_mut(&mut self, id: NodeId) -> Option<&mut Core> {
        match id.0 {
            Handle::Document => None,
            Handle::Element(s) => self.elements.get_mut(s).map(|n| &mut n.core),
            Handle::Text(s) => self.texts.get_mut(s).map(|n| &mut n.core),
            Handle::Leaf(s) => self.leaves.get_mut(s).map(|n| &mut n.core),
        }
    }

    pub fn children(&self, id: NodeId) -> Option<&ChildLinks> {
        match id.0 {
            Handle::Document => Some(&self.root),
            Handle::Element(s) => self.elements.get(s).map(|n| &n.children),
            _ => None,
        }
    }

    fn children_mut(&mut self, id: NodeId) -> Option<&mut ChildLinks> {
        match id.0 {
            Handle::Document => Some(&mut self.root),
            Handle::Element(s) => self.elements.get_mut(s).map(|n| &mut n.children),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.core(id).and_then(|c| c.parent)
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.core(id).and_then(|c| c.next)
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.core(id).and_then(|c| c.prev)
    }

    /// True if `ancestor` is `node` or lies on the path from `node` up
    /// to its topmost parent.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    fn set_next(&mut self, id: NodeId, next: Option<NodeId>) {
        if let Some(c) = self.core_mut(id) {
            c.next = next;
        }
    }

    fn set_prev(&mut self, id: NodeId, prev: Option<NodeId>) {
        if let Some(c) = self.core_mut(id) {
            c.prev = prev;
        }
    }

    /// Removes `child` from its parent's chain. The node itself is
    /// left alive and detached.
    pub fn unlink(&mut self, child: NodeId) {
        let (parent, prev, next) = match self.core_mut(child) {
            Some(c) => (c.parent.take(), c.prev.take(), c.next.take()),
            None => return,
        };

        let parent = match parent {
            Some(p) => p,
            None => return,
        };

        match prev {
            Some(p) => self.set_next(p, next),
            None => {
                if let Some(links) = self.children_mut(parent) {
                    links.first = next;
                }
            }
        }

        match next {
            Some(n) => self.set_prev(n, prev),
            None => {
                if let Some(links) = self.children_mut(parent) {
                    links.last = prev;
                }
            }
        }
    }

    // The link_* functions expect `child` to be detached.

    pub fn link_last(&mut self, parent: NodeId, child: NodeId) {
        let last = match self.children(parent) {
            Some(links) => links.last,
            None => return,
        };

        if let Some(c) = self.core_mut(child) {
            c.parent = Some(parent);
            c.prev = last;
            c.next = None;
        }

        match last {
            Some(l) => self.set_next(l, Some(child)),
            None => {
                if let Some(links) = self.children_mut(parent) {
                    links.first = Some(child);
                }
            }
        }

        if let Some(links) = self.children_mut(parent) {
            links.last = Some(child);
        }
    }

    pub fn link_first(&mut self, parent: NodeId, child: NodeId) {
        let first = match self.children(parent) {
            Some(links) => links.first,
            None => return,
        };

        if let Some(c) = self.core_mut(child) {
            c.parent = Some(parent);
            c.prev = None;
            c.next = first;
        }

        match first {
            Some(f) => self.set_prev(f, Some(child)),
            None => {
                if let Some(links) = self.children_mut(parent) {
                    links.last = Some(child);
                }
            }
        }

        if let Some(links) = self.children_mut(parent) {
            links.first = Some(child);
        }
    }

    /// Links `child` directly after `after`, which must be a child of
    /// `parent` other than its last.
    pub fn link_after(&mut self, parent: NodeId, after: NodeId, child: NodeId) {
        let next = self.next(after);

        if let Some(c) = self.core_mut(child) {
            c.parent = Some(parent);
            c.prev = Some(after);
            c.next = next;
        }

        self.set_next(after, Some(child));
        match next {
            Some(n) => self.set_prev(n, Some(child)),
            None => {
                if let Some(links) = self.children_mut(parent) {
                    links.last = Some(child);
                }
            }
        }
    }

    /// Unlinks `id` and frees it along with all of its descendants and
    /// attributes.
    pub fn destroy(&mut self, id: NodeId) {
        if id == NodeId::DOCUMENT {
            self.destroy_children(id);
            return;
        }

        self.unlink(id);

        let mut pending = vec![id];
        while let Some(node) = pending.pop() {
            let mut child = self.children(node).and_then(|l| l.first);
            while let Some(c) = child {
                pending.push(c);
                child = self.next(c);
            }
            self.free(node);
        }
    }

    pub fn destroy_children(&mut self, parent: NodeId) {
        while let Some(child) = self.children(parent).and_then(|l| l.first) {
            self.destroy(child);
        }
    }

    fn free(&mut self, id: NodeId) {
        match id.0 {
            Handle::Document => {}
            Handle::Element(s) => {
                if let Some(element) = self.elements.free(s) {
                    let mut attribute = element.first_attribute;
                    while let Some(a) = attribute {
                        attribute = self.attributes.free(a.0).and_then(|a| a.next);
                    }
                }
            }
            Handle::Text(s) => { self.texts.free(s); }
            Handle::Leaf(s) => { self.leaves.free(s); }
        }
    }

    pub fn attribute(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.get(id.0)
    }

    pub fn attribute_mut(&mut self, id: AttributeId) -> Option<&mut Attribute> {
        self.attributes.get_mut(id.0)
    }

    pub fn first_attribute(&self, element: NodeId) -> Option<AttributeId> {
        self.element(element).and_then(|e| e.first_attribute)
    }

    pub fn next_attribute(&self, attribute: AttributeId) -> Option<AttributeId> {
        self.attribute(attribute).and_then(|a| a.next)
    }

    /// Finds an attribute by name, compared against the undecoded name
    /// text; names never owe decoding.
    pub fn find_attribute(&self, element: NodeId, name: &str, buffer: &[u8]) -> Option<AttributeId> {
        let mut current = self.first_attribute(element);
        while let Some(a) = current {
            let attribute = self.attribute(a)?;
            if attribute.name.peek(buffer) == name {
                return Some(a);
            }
            current = attribute.next;
        }
        None
    }

    /// Appends a new attribute to the end of the element's list.
    pub fn append_attribute(&mut self, element: NodeId, name: StrSpan, value: StrSpan) -> Option<AttributeId> {
        if self.element(element).is_none() {
            return None;
        }

        let id = AttributeId(self.attributes.alloc(Attribute { name, value, next: None }));

        let mut last = None;
        let mut current = self.first_attribute(element);
        while let Some(a) = current {
            last = Some(a);
            current = self.next_attribute(a);
        }

        match last {
            Some(l) => {
                if let Some(a) = self.attribute_mut(l) {
                    a.next = Some(id);
                }
            }
            None => {
                if let Some(e) = self.element_mut(element) {
                    e.first_attribute = Some(id);
                }
            }
        }

        Some(id)
    }

    /// Unlinks and frees the attribute.
    pub fn remove_attribute(&mut self, element: NodeId, target: AttributeId) -> bool {
        let mut prev = None;
        let mut current = self.first_attribute(element);

        while let Some(a) = current {
            if a == target {
                let next = self.next_attribute(a);
                match prev {
                    Some(p) => {
                        if let Some(p) = self.attribute_mut(p) {
                            p.next = next;
                        }
                    }
                    None => {
                        if let Some(e) = self.element_mut(element) {
                            e.first_attribute = next;
                        }
                    }
                }
                self.attributes.free(a.0);
                return true;
            }
            prev = Some(a);
            current = self.next_attribute(a);
        }

        false
    }
}
