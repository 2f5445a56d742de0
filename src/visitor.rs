//! Depth-first traversal of a document.

use super::dom::Document;
use super::raw::{NodeId, NodeKind};

/// Hooks called while walking a tree with [`Document::accept`].
///
/// Returning `false` from a hook stops the walk over the remaining
/// siblings at that level and everything below them. The exit hook of
/// each enclosing element is still called.
#[allow(unused_variables)]
pub trait Visitor {
    fn visit_enter_document(&mut self, doc: &Document) -> bool { true }
    fn visit_exit_document(&mut self, doc: &Document) -> bool { true }

    fn visit_enter_element(&mut self, doc: &Document, element: NodeId) -> bool { true }
    fn visit_exit_element(&mut self, doc: &Document, element: NodeId) -> bool { true }

    fn visit_text(&mut self, doc: &Document, text: NodeId) -> bool { true }
    fn visit_comment(&mut self, doc: &Document, comment: NodeId) -> bool { true }
    fn visit_declaration(&mut self, doc: &Document, declaration: NodeId) -> bool { true }
    fn visit_unknown(&mut self, doc: &Document, unknown: NodeId) -> bool { true }
}

impl Document {
    /// Walks `node` and its descendants in document order.
    ///
    /// Each node's text is decoded before its hook is called, so
    /// visitors can read values through `peek_value` without copying.
    pub fn accept<V>(&mut self, node: NodeId, visitor: &mut V) -> bool
        where V: Visitor + ?Sized
    {
        self.flush(node);

        let kind = match self.kind(node) {
            Some(kind) => kind,
            None => return true,
        };

        match kind {
            NodeKind::Document => {
                if visitor.visit_enter_document(self) {
                    self.accept_children(node, visitor);
                }
                visitor.visit_exit_document(self)
            }
            NodeKind::Element => {
                if visitor.visit_enter_element(self, node) {
                    self.accept_children(node, visitor);
                }
                visitor.visit_exit_element(self, node)
            }
            NodeKind::Text => visitor.visit_text(self, node),
            NodeKind::Comment => visitor.visit_comment(self, node),
            NodeKind::Declaration => visitor.visit_declaration(self, node),
            NodeKind::Unknown => visitor.visit_unknown(self, node),
        }
    }

    fn accept_children<V>(&mut self, node: NodeId, visitor: &mut V)
        where V: Visitor + ?Sized
    {
        let mut child = self.first_child(node);
        while let Some(c) = child {
            if !self.accept(c, visitor) {
                break;
            }
            child = self.next_sibling(c);
        }
    }
}
