//! Per-node debug listing.
//!
//! A diagnostic aid, not a serialization format: one line per node record
//! in arena order, showing kind, name, content, sizes, and raw linkage.

use std::fmt;

use crate::document::Document;
use crate::node::{NodeId, NodeKind};

/// Helper for pretty-printing every node record of a document.
///
/// Obtained from [`Document::tree_dump`]; renders via [`fmt::Display`].
pub struct TreeDump<'a, T> {
    doc: &'a Document<T>,
}

impl<T> Document<T> {
    /// A [`Display`](fmt::Display) wrapper listing every node record.
    pub fn tree_dump(&self) -> TreeDump<'_, T> {
        TreeDump { doc: self }
    }
}

fn kind_label(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Element => "elem",
        NodeKind::Attribute => "attr",
        NodeKind::Instruction => "inst",
    }
}

fn link(target: Option<NodeId>) -> String {
    match target {
        Some(id) => id.index().to_string(),
        None => "-".to_string(),
    }
}

impl<T> fmt::Display for TreeDump<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, record) in self.doc.nodes.iter() {
            writeln!(
                f,
                "{}: {} name={:?} content={:?} size={}/{} parent={} child={} next={} modcount={}",
                id.index(),
                kind_label(record.kind),
                self.doc.text.str(record.name),
                self.doc.text.str(record.content),
                record.content.len,
                record.full_size,
                link(record.parent),
                link(record.first_child),
                link(record.next_sibling),
                record.modcount,
            )?;
        }
        writeln!(f, "total nodes: {}", self.doc.node_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_lists_every_node() {
        let doc: Document = Document::parse(b"<r a='1'><b>x</b></r>").unwrap();
        let dump = doc.tree_dump().to_string();
        let lines: Vec<_> = dump.lines().collect();
        // r, a, b, plus the totals line.
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("elem name=\"r\""));
        assert!(lines[1].contains("attr name=\"a\" content=\"1\""));
        assert!(lines[2].contains("elem name=\"b\" content=\"x\""));
        assert!(lines[3].starts_with("total nodes: 3"));
    }
}
