//! The document: one arena, one tree, and every operation on it.
//!
//! A [`Document`] owns the node and text stores produced by a parse and
//! grown by later mutation. Nodes are addressed by [`NodeId`]; all
//! path-taking operations are thin wrappers over [`Document::resolve`],
//! so "not found" behaves identically everywhere.
//!
//! The type parameter `T` is the caller-attached user-tag payload; the
//! engine stores tags in a side table keyed by node id and never looks
//! inside them.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use smallvec::SmallVec;

use crate::error::{ParseError, TreeError};
use crate::node::{NodeId, NodeKind, NodeRecord, Span};
use crate::parser::{Build, Measure, Parser};
use crate::store::{NodeStore, TextStore};
use crate::tracing_macros::debug;

/// An XML document tree and the arena that owns it.
pub struct Document<T = ()> {
    pub(crate) nodes: NodeStore,
    pub(crate) text: TextStore,
    root: NodeId,
    /// Root element and its sibling processing instructions, in document
    /// order.
    top_level: SmallVec<[NodeId; 4]>,
    tags: HashMap<NodeId, T>,
}

fn strip_bom(input: &[u8]) -> &[u8] {
    input.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(input)
}

/// Line/column of a byte offset, for reporting failures that happen
/// before the state machine ever runs.
fn position_of(bytes: &[u8], offset: usize) -> (u32, u32) {
    let prefix = &bytes[..offset];
    let line = prefix.iter().filter(|&&b| b == b'\n').count() as u32 + 1;
    let column = prefix.iter().rev().take_while(|&&b| b != b'\n').count() as u32 + 1;
    (line, column)
}

impl<T> Document<T> {
    /// Parse XML from memory.
    ///
    /// A UTF-8 byte order mark is skipped if present. The input is parsed
    /// twice: a measuring pass sizes the arena exactly, then a building
    /// pass fills it, so the happy path allocates once for nodes and once
    /// for text no matter how large the document is.
    pub fn parse(input: &[u8]) -> Result<Self, ParseError> {
        let input = strip_bom(input);
        let input = match std::str::from_utf8(input) {
            Ok(s) => s,
            Err(e) => {
                let (line, column) = position_of(input, e.valid_up_to());
                return Err(ParseError::new("input is not valid UTF-8", line, column));
            }
        };

        let mut pass1 = Parser::new(input, Measure::new());
        pass1.parse_document()?;
        let measured = pass1.into_sink();
        debug!("measured {} nodes, {} text bytes", measured.nodes, measured.bytes);

        let mut pass2 = Parser::new(input, Build::with_capacity(measured.nodes, measured.bytes));
        let shape = pass2.parse_document()?;
        let built = pass2.into_sink();
        debug_assert_eq!(built.nodes.len(), measured.nodes);
        debug_assert_eq!(built.text.len(), measured.bytes);

        let mut records = built.nodes;
        // Instructions and the root element form one sibling chain.
        for pair in shape.top_level.windows(2) {
            records[pair[0]].next_sibling = Some(NodeId::from_index(pair[1]));
        }

        Ok(Self {
            nodes: NodeStore::exact(records),
            text: TextStore::exact(built.text),
            root: NodeId::from_index(shape.root),
            top_level: shape
                .top_level
                .iter()
                .map(|&index| NodeId::from_index(index))
                .collect(),
            tags: HashMap::new(),
        })
    }

    /// Read a whole file and parse it. I/O failures surface as a
    /// [`ParseError`] with line and column 0.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| ParseError::external(format!("failed to read {}: {e}", path.display())))?;
        Self::parse(&bytes)
    }

    // -----------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, node: NodeId) -> NodeKind {
        self.nodes.get(node).kind
    }

    pub fn name(&self, node: NodeId) -> &str {
        self.text.str(self.nodes.get(node).name)
    }

    /// The node's content: collapsed text for elements, the value for
    /// attributes, empty for instructions.
    pub fn content(&self, node: NodeId) -> &str {
        self.text.str(self.nodes.get(node).content)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).parent
    }

    /// First child in document order; attributes come before element
    /// children.
    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).first_child
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).next_sibling
    }

    /// Previous sibling. There is no back link, so this scans from the
    /// parent's first child: O(children).
    pub fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        let first = match self.parent(node) {
            Some(parent) => self.nodes.get(parent).first_child,
            None => self.top_level.first().copied(),
        }?;
        if first == node {
            return None;
        }
        let mut current = first;
        while let Some(next) = self.nodes.get(current).next_sibling {
            if next == node {
                return Some(current);
            }
            current = next;
        }
        None
    }

    pub fn first_attribute(&self, node: NodeId) -> Option<NodeId> {
        self.attributes(node).next()
    }

    /// Next sibling of attribute kind.
    pub fn next_attribute(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.nodes.get(node).next_sibling;
        while let Some(c) = current {
            if self.kind(c) == NodeKind::Attribute {
                return Some(c);
            }
            current = self.nodes.get(c).next_sibling;
        }
        None
    }

    /// First child of element kind, skipping attributes.
    pub fn first_element_child(&self, node: NodeId) -> Option<NodeId> {
        self.elements(node).next()
    }

    /// Iterate all children (attributes and elements alike).
    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes.get(node).first_child, move |&c| {
            self.nodes.get(c).next_sibling
        })
    }

    /// Iterate attribute children.
    pub fn attributes(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(node)
            .filter(|&c| self.kind(c) == NodeKind::Attribute)
    }

    /// Iterate element children.
    pub fn elements(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(node)
            .filter(|&c| self.kind(c) == NodeKind::Element)
    }

    /// Top-level nodes: the root element and any processing instructions,
    /// in document order.
    pub fn top_level(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.top_level.iter().copied()
    }

    /// Total number of nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // -----------------------------------------------------------------
    // Path-based queries
    // -----------------------------------------------------------------

    /// Content at `path`, or `None` if it does not resolve.
    pub fn get(&self, node: NodeId, path: &str) -> Option<&str> {
        self.resolve(node, path).map(|id| self.content(id))
    }

    /// Content at `path` converted to an integer: leading whitespace and
    /// sign accepted, `0x` prefix switches to hexadecimal, conversion
    /// stops at the first non-digit. Unresolved paths and junk yield 0.
    pub fn get_i64(&self, node: NodeId, path: &str) -> i64 {
        self.get(node, path).map_or(0, parse_i64_prefix)
    }

    /// Content at `path` converted to a float; unresolved paths and junk
    /// yield 0.0.
    pub fn get_f64(&self, node: NodeId, path: &str) -> f64 {
        self.get(node, path).map_or(0.0, parse_f64_prefix)
    }

    /// Logical content size in bytes at `path`, 0 if unresolved.
    pub fn content_size(&self, node: NodeId, path: &str) -> usize {
        self.resolve(node, path)
            .map_or(0, |id| self.nodes.get(id).content.len as usize)
    }

    /// Modification count at `path`, 0 if unresolved.
    pub fn modcount(&self, node: NodeId, path: &str) -> u32 {
        self.resolve(node, path)
            .map_or(0, |id| self.nodes.get(id).modcount)
    }

    /// Copy content at `path` into `buffer`, truncating to the buffer's
    /// length. Returns the number of bytes written (0 if unresolved).
    pub fn copy_content(&self, node: NodeId, path: &str, buffer: &mut [u8]) -> usize {
        let Some(id) = self.resolve(node, path) else {
            return 0;
        };
        let content = self.text.slice(self.nodes.get(id).content);
        let n = content.len().min(buffer.len());
        buffer[..n].copy_from_slice(&content[..n]);
        n
    }

    /// The caller-attached tag at `path`, if any.
    pub fn user_tag(&self, node: NodeId, path: &str) -> Option<&T> {
        self.resolve(node, path).and_then(|id| self.tags.get(&id))
    }

    /// Attach a tag at `path`, returning the previous one.
    pub fn set_user_tag(&mut self, node: NodeId, path: &str, tag: T) -> Result<Option<T>, TreeError> {
        let id = self
            .resolve(node, path)
            .ok_or_else(|| TreeError::PathNotFound(path.to_string()))?;
        Ok(self.tags.insert(id, tag))
    }

    // -----------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------

    /// Replace the content at `path`.
    ///
    /// Values that fit the node's original allocation are overwritten in
    /// place; larger values move the content into the newest arena
    /// fragment. The modification count increments either way.
    pub fn set(&mut self, node: NodeId, path: &str, value: &str) -> Result<(), TreeError> {
        let id = self
            .resolve(node, path)
            .ok_or_else(|| TreeError::PathNotFound(path.to_string()))?;
        let bytes = value.as_bytes();
        let record = self.nodes.get(id);
        if bytes.len() <= record.full_size as usize {
            let (frag, start) = (record.content.frag, record.content.start);
            self.text.overwrite(frag, start, bytes);
            self.nodes.get_mut(id).content.len = bytes.len() as u32;
        } else {
            let span = self.text.append(bytes)?;
            let record = self.nodes.get_mut(id);
            record.content = span;
            record.full_size = span.len;
        }
        self.nodes.get_mut(id).modcount += 1;
        Ok(())
    }

    /// Create a new element as the last child of `parent`.
    pub fn create_element(
        &mut self,
        parent: NodeId,
        name: &str,
        content: Option<&str>,
    ) -> Result<NodeId, TreeError> {
        self.create(parent, NodeKind::Element, name, content)
    }

    /// Create a new attribute as the last child of `parent`.
    pub fn create_attribute(
        &mut self,
        parent: NodeId,
        name: &str,
        value: &str,
    ) -> Result<NodeId, TreeError> {
        self.create(parent, NodeKind::Attribute, name, Some(value))
    }

    fn create(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: &str,
        content: Option<&str>,
    ) -> Result<NodeId, TreeError> {
        let needed = name.len() + content.map_or(0, str::len);
        self.text.reserve(needed)?;
        self.nodes.reserve(1)?;

        let name_span = self.text.append(name.as_bytes())?;
        let mut record = NodeRecord::new(kind);
        record.name = name_span;
        record.parent = Some(parent);
        if let Some(content) = content {
            let span = self.text.append(content.as_bytes())?;
            record.content = span;
            record.full_size = span.len;
        }
        let id = self.nodes.alloc(record)?;
        self.append_child(parent, id);
        Ok(id)
    }

    /// Deep-copy `subtree` (from `source`, which may be another document)
    /// into this arena and append it as the last child of `dest`. The
    /// source is left untouched; sizes are measured first so the copy
    /// grows each store at most once.
    pub fn graft<U>(
        &mut self,
        dest: NodeId,
        source: &Document<U>,
        subtree: NodeId,
    ) -> Result<NodeId, TreeError> {
        let mut text_bytes = 0usize;
        let mut node_count = 0usize;
        source.measure_subtree(subtree, &mut text_bytes, &mut node_count);
        debug!("graft: {node_count} nodes, {text_bytes} text bytes");
        self.text.reserve(text_bytes)?;
        self.nodes.reserve(node_count)?;
        self.graft_copy(dest, source, subtree)
    }

    fn measure_subtree(&self, node: NodeId, text_bytes: &mut usize, node_count: &mut usize) {
        let record = self.nodes.get(node);
        *text_bytes += record.name.len as usize + record.full_size as usize;
        *node_count += 1;
        let mut child = record.first_child;
        while let Some(c) = child {
            self.measure_subtree(c, text_bytes, node_count);
            child = self.nodes.get(c).next_sibling;
        }
    }

    fn graft_copy<U>(
        &mut self,
        parent: NodeId,
        source: &Document<U>,
        node: NodeId,
    ) -> Result<NodeId, TreeError> {
        let src = source.nodes.get(node);
        let name_span = self.text.append(source.text.slice(src.name))?;
        // The full capacity region is copied so in-place growth room
        // survives the move between arenas.
        let full = Span {
            len: src.full_size,
            ..src.content
        };
        let content_span = self.text.append(source.text.slice(full))?;

        let mut record = NodeRecord::new(src.kind);
        record.name = name_span;
        record.content = Span {
            len: src.content.len,
            ..content_span
        };
        record.full_size = src.full_size;
        record.modcount = src.modcount;
        record.parent = Some(parent);
        let id = self.nodes.alloc(record)?;
        self.append_child(parent, id);

        let mut child = source.nodes.get(node).first_child;
        while let Some(c) = child {
            self.graft_copy(id, source, c)?;
            child = source.nodes.get(c).next_sibling;
        }
        Ok(id)
    }

    /// Link `child` as the last child of `parent`: O(children), since
    /// only the first-child link is stored.
    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        match self.nodes.get(parent).first_child {
            None => self.nodes.get_mut(parent).first_child = Some(child),
            Some(first) => {
                let mut current = first;
                while let Some(next) = self.nodes.get(current).next_sibling {
                    current = next;
                }
                self.nodes.get_mut(current).next_sibling = Some(child);
            }
        }
    }
}

impl<T> fmt::Debug for Document<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// `strtol`-style prefix conversion: optional sign, optional `0x`, stop
/// at the first non-digit, 0 when no digits at all.
fn parse_i64_prefix(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (radix, digits) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(rest) => (16u32, rest),
        None => (10u32, s),
    };
    let mut value: i64 = 0;
    let mut any = false;
    for ch in digits.chars() {
        let Some(d) = ch.to_digit(radix) else { break };
        any = true;
        value = value.saturating_mul(i64::from(radix)).saturating_add(i64::from(d));
    }
    if !any {
        0
    } else if negative {
        -value
    } else {
        value
    }
}

/// `strtod`-style prefix conversion: longest numeric prefix, 0.0 when
/// nothing parses.
fn parse_f64_prefix(s: &str) -> f64 {
    let s = s.trim_start();
    let mut end = s
        .bytes()
        .take_while(|b| matches!(b, b'0'..=b'9' | b'+' | b'-' | b'.' | b'e' | b'E'))
        .count();
    while end > 0 {
        if let Ok(value) = s[..end].parse::<f64>() {
            return value;
        }
        end -= 1;
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(input: &str) -> Document {
        Document::parse(input.as_bytes()).expect("parse failed")
    }

    #[test]
    fn test_parse_simple_document() {
        let d = doc("<root><child>hello</child></root>");
        assert_eq!(d.name(d.root()), "root");
        let child = d.first_child(d.root()).expect("root has a child");
        assert_eq!(d.kind(child), NodeKind::Element);
        assert_eq!(d.name(child), "child");
        assert_eq!(d.content(child), "hello");
        assert_eq!(d.next_sibling(child), None);
        assert_eq!(d.parent(child), Some(d.root()));
    }

    #[test]
    fn test_attributes_precede_element_children() {
        let d = doc("<root a='1' b='2'><c/></root>");
        let kinds: Vec<_> = d.children(d.root()).map(|id| d.kind(id)).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Attribute, NodeKind::Attribute, NodeKind::Element]
        );
        let names: Vec<_> = d.children(d.root()).map(|id| d.name(id)).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(d.first_element_child(d.root()).map(|id| d.name(id)), Some("c"));
        let a = d.first_attribute(d.root()).expect("has attributes");
        assert_eq!(d.content(a), "1");
        let b = d.next_attribute(a).expect("second attribute");
        assert_eq!(d.content(b), "2");
        assert_eq!(d.next_attribute(b), None);
    }

    #[test]
    fn test_prev_sibling_scans() {
        let d = doc("<r><a/><b/><c/></r>");
        let a = d.first_child(d.root()).unwrap();
        let b = d.next_sibling(a).unwrap();
        let c = d.next_sibling(b).unwrap();
        assert_eq!(d.prev_sibling(a), None);
        assert_eq!(d.prev_sibling(b), Some(a));
        assert_eq!(d.prev_sibling(c), Some(b));
    }

    #[test]
    fn test_top_level_chain_includes_instructions() {
        let d = doc("<?xml version='1.0'?><r/>");
        let top: Vec<_> = d.top_level().collect();
        assert_eq!(top.len(), 2);
        assert_eq!(d.kind(top[0]), NodeKind::Instruction);
        assert_eq!(d.name(top[0]), "xml");
        assert_eq!(d.next_sibling(top[0]), Some(d.root()));
        assert_eq!(d.prev_sibling(d.root()), Some(top[0]));
    }

    #[test]
    fn test_numeric_prefix_conversion() {
        assert_eq!(parse_i64_prefix("42"), 42);
        assert_eq!(parse_i64_prefix("  -17"), -17);
        assert_eq!(parse_i64_prefix("0x1f"), 31);
        assert_eq!(parse_i64_prefix("12abc"), 12);
        assert_eq!(parse_i64_prefix("abc"), 0);
        assert_eq!(parse_i64_prefix(""), 0);
        assert_eq!(parse_f64_prefix("3.5"), 3.5);
        assert_eq!(parse_f64_prefix("-2e3"), -2000.0);
        assert_eq!(parse_f64_prefix("1.5x"), 1.5);
        assert_eq!(parse_f64_prefix("nope"), 0.0);
    }

    #[test]
    fn test_bom_is_skipped() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(b"<r>x</r>");
        let d: Document = Document::parse(&bytes).unwrap();
        assert_eq!(d.get(d.root(), ""), Some("x"));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let err = Document::<()>::parse(b"<r>\xFF</r>").unwrap_err();
        assert_eq!(err.message, "input is not valid UTF-8");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Document::<()>::load("/nonexistent/xylem-test.xml").unwrap_err();
        assert_eq!(err.line, 0);
        assert_eq!(err.column, 0);
    }
}
