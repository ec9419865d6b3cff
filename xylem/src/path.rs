//! Filesystem-style path resolution over the tree.
//!
//! Grammar: segments separated by `/`; a leading `/` starts at the
//! document root regardless of the starting node; empty segments are
//! skipped; `..` climbs to the parent; a plain segment matches the first
//! child of any kind with that exact name (so attributes resolve like
//! children); `name[N]` and `*[N]` select the N-th (0-based) matching
//! child counting Element-kind children only; `*` alone is `*[0]`.
//! Malformed bracket syntax is a resolution failure, not an error.

use crate::document::Document;
use crate::node::{NodeId, NodeKind};

/// One parsed path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    /// `..`
    Up,
    /// `name`: first child of any kind with this name.
    Name(&'a str),
    /// `name[N]`: N-th element child with this name.
    Indexed(&'a str, usize),
    /// `*` or `*[N]`: N-th element child, any name.
    Wild(usize),
}

/// Parse one segment; `None` means malformed (and the whole resolution
/// fails quietly).
fn parse_segment(segment: &str) -> Option<Segment<'_>> {
    if segment == ".." {
        return Some(Segment::Up);
    }
    let Some(open) = segment.find('[') else {
        if segment == "*" {
            return Some(Segment::Wild(0));
        }
        return Some(Segment::Name(segment));
    };
    if !segment.ends_with(']') {
        return None;
    }
    let base = &segment[..open];
    let digits = &segment[open + 1..segment.len() - 1];
    if base.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index = digits.parse().ok()?;
    if base == "*" {
        Some(Segment::Wild(index))
    } else {
        Some(Segment::Indexed(base, index))
    }
}

impl<T> Document<T> {
    /// Resolve `path` starting from `node`. An empty path returns `node`
    /// itself. Returns `None` when any segment fails to match.
    pub fn resolve(&self, node: NodeId, path: &str) -> Option<NodeId> {
        let (mut current, rest) = match path.strip_prefix('/') {
            Some(rest) => (self.root(), rest),
            None => (node, path),
        };
        for segment in rest.split('/') {
            if segment.is_empty() {
                continue;
            }
            current = self.resolve_segment(current, segment)?;
        }
        Some(current)
    }

    fn resolve_segment(&self, node: NodeId, segment: &str) -> Option<NodeId> {
        match parse_segment(segment)? {
            Segment::Up => self.parent(node),
            Segment::Name(name) => self.children(node).find(|&c| self.name(c) == name),
            Segment::Indexed(name, index) => self
                .children(node)
                .filter(|&c| self.kind(c) == NodeKind::Element && self.name(c) == name)
                .nth(index),
            Segment::Wild(index) => self
                .children(node)
                .filter(|&c| self.kind(c) == NodeKind::Element)
                .nth(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segment_grammar() {
        assert_eq!(parse_segment(".."), Some(Segment::Up));
        assert_eq!(parse_segment("node"), Some(Segment::Name("node")));
        assert_eq!(parse_segment("*"), Some(Segment::Wild(0)));
        assert_eq!(parse_segment("node[3]"), Some(Segment::Indexed("node", 3)));
        assert_eq!(parse_segment("*[2]"), Some(Segment::Wild(2)));
    }

    #[test]
    fn test_parse_segment_malformed() {
        assert_eq!(parse_segment("node["), None);
        assert_eq!(parse_segment("node[]"), None);
        assert_eq!(parse_segment("node[x]"), None);
        assert_eq!(parse_segment("[1]"), None);
        assert_eq!(parse_segment("node[1"), None);
        assert_eq!(parse_segment("node[1]x"), None);
    }
}
