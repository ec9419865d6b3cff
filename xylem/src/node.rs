//! Node records and the intrusive links that form the tree.
//!
//! Every entity in a document (element, attribute, or processing
//! instruction) is one [`NodeRecord`] stored in the owning document's
//! arena and addressed by a [`NodeId`]. Links are ids, not references,
//! so the tree is freely traversable while the document is borrowed.

/// What a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A named element; may carry attributes, child elements, and content.
    Element,
    /// A `name="value"` pair, stored as a pseudo-child of its owner.
    Attribute,
    /// A `<?name …?>` processing instruction, a sibling of the root.
    Instruction,
}

/// Handle to one node inside a [`crate::Document`].
///
/// Ids are only meaningful for the document that produced them; using an
/// id from another document yields nonsense (or a panic on out-of-range
/// access), never memory unsafety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A slice of arena text storage: fragment number plus byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Span {
    pub frag: u32,
    pub start: u32,
    pub len: u32,
}

impl Span {
    pub(crate) fn new(frag: usize, start: usize, len: usize) -> Self {
        Self {
            frag: frag as u32,
            start: start as u32,
            len: len as u32,
        }
    }
}

/// One stored entity.
///
/// `content.len` is the logical size; `full_size` remembers the capacity
/// originally allocated for the content, so in-place overwrites can shrink
/// without giving storage back.
#[derive(Debug, Clone)]
pub(crate) struct NodeRecord {
    pub kind: NodeKind,
    pub name: Span,
    pub content: Span,
    pub full_size: u32,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub modcount: u32,
}

impl NodeRecord {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: Span::default(),
            content: Span::default(),
            full_size: 0,
            parent: None,
            first_child: None,
            next_sibling: None,
            modcount: 0,
        }
    }
}
