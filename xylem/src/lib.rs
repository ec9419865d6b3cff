//! In-memory XML engine with an arena-backed DOM.
//!
//! xylem turns a byte buffer into a navigable, mutable document tree,
//! answers filesystem-style path queries over it, supports incremental
//! mutation, and serializes the tree back to XML text:
//!
//! - **Two-pass parsing**: a measuring pass sizes the arena exactly, so
//!   the read-only happy path allocates once for nodes and once for text
//! - **Arena ownership**: every node of a tree lives in one arena,
//!   addressed by [`NodeId`]; mutation grows the arena in bounded,
//!   doubling fragments
//! - **Path queries**: `resolve("/config/servers/host[2]/port")`-style
//!   lookup beneath every get/set/copy operation
//! - **Serialization**: measure-then-render output with proper escaping
//!
//! # Example
//!
//! ```rust
//! let doc = xylem::parse(b"<config debug='1'><port>8080</port></config>").unwrap();
//! let root = doc.root();
//! assert_eq!(doc.get(root, "/port"), Some("8080"));
//! assert_eq!(doc.get_i64(root, "port"), 8080);
//! assert_eq!(doc.get(root, "debug"), Some("1"));
//!
//! let mut doc = doc;
//! doc.set(root, "port", "9090").unwrap();
//! assert_eq!(doc.modcount(root, "port"), 1);
//! ```

mod tracing_macros;

mod base64;
mod document;
mod error;
mod node;
mod parser;
mod path;
mod reader;
mod serializer;
mod store;
mod tree_dump;

pub use self::base64::{DecodeError, decode64, encode64};
pub use document::Document;
pub use error::{ParseError, TreeError};
pub use node::{NodeId, NodeKind};
pub use store::MAX_FRAGMENTS;
pub use tree_dump::TreeDump;

/// Parse XML from memory. See [`Document::parse`].
pub fn parse(input: &[u8]) -> Result<Document, ParseError> {
    Document::parse(input)
}

/// Read a whole file and parse it. See [`Document::load`].
pub fn load(path: impl AsRef<std::path::Path>) -> Result<Document, ParseError> {
    Document::load(path)
}
