//! XML serialization.
//!
//! Rendering follows the same two-pass discipline as parsing: a counting
//! pass computes the exact output length, then the real pass writes into
//! a buffer sized to match. Output rules:
//!
//! - Two-space indentation per depth level
//! - Attribute values double-quoted
//! - `< > & ' "` escaped as named entities, control bytes below 0x20 as
//!   decimal character references
//! - Elements with no element children and no content self-close
//! - Processing instructions render as `<?name attr="value"?>` in
//!   document order around the root

use crate::document::Document;
use crate::node::{NodeId, NodeKind};

/// Output target; the counting pass and the fill pass run identical code.
trait Out {
    fn put_char(&mut self, ch: char);
    fn put_str(&mut self, s: &str);
}

/// Pass 1: counts bytes.
struct Count(usize);

impl Out for Count {
    fn put_char(&mut self, ch: char) {
        self.0 += ch.len_utf8();
    }

    fn put_str(&mut self, s: &str) {
        self.0 += s.len();
    }
}

impl Out for String {
    fn put_char(&mut self, ch: char) {
        self.push(ch);
    }

    fn put_str(&mut self, s: &str) {
        self.push_str(s);
    }
}

struct Serializer<'a, T, W> {
    doc: &'a Document<T>,
    out: &'a mut W,
    depth: usize,
}

impl<'a, T, W: Out> Serializer<'a, T, W> {
    fn new(doc: &'a Document<T>, out: &'a mut W) -> Self {
        Self { doc, out, depth: 0 }
    }

    fn write_document(&mut self) {
        let doc = self.doc;
        for id in doc.top_level() {
            self.write_node(id);
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.depth {
            self.out.put_str("  ");
        }
    }

    fn write_escaped(&mut self, text: &str) {
        for ch in text.chars() {
            match ch {
                '<' => self.out.put_str("&lt;"),
                '>' => self.out.put_str("&gt;"),
                '&' => self.out.put_str("&amp;"),
                '\'' => self.out.put_str("&apos;"),
                '"' => self.out.put_str("&quot;"),
                c if (c as u32) < 0x20 => {
                    let v = c as u32;
                    self.out.put_str("&#");
                    if v >= 10 {
                        self.out.put_char((b'0' + (v / 10) as u8) as char);
                    }
                    self.out.put_char((b'0' + (v % 10) as u8) as char);
                    self.out.put_char(';');
                }
                c => self.out.put_char(c),
            }
        }
    }

    fn write_node(&mut self, id: NodeId) {
        let doc = self.doc;
        let instruction = doc.kind(id) == NodeKind::Instruction;

        self.write_indent();
        self.out.put_char('<');
        if instruction {
            self.out.put_char('?');
        }
        self.out.put_str(doc.name(id));

        for attr in doc.attributes(id) {
            self.out.put_char(' ');
            self.out.put_str(doc.name(attr));
            self.out.put_str("=\"");
            self.write_escaped(doc.content(attr));
            self.out.put_char('"');
        }

        if instruction {
            self.out.put_str("?>\n");
            return;
        }

        let content = doc.content(id);
        let has_elements = doc.first_element_child(id).is_some();
        if !has_elements && content.is_empty() {
            self.out.put_str("/>\n");
            return;
        }

        self.out.put_str(">\n");
        self.depth += 1;
        if !content.is_empty() {
            self.write_indent();
            self.write_escaped(content);
            self.out.put_char('\n');
        }
        for child in doc.elements(id) {
            self.write_node(child);
        }
        self.depth -= 1;
        self.write_indent();
        self.out.put_str("</");
        self.out.put_str(doc.name(id));
        self.out.put_str(">\n");
    }
}

impl<T> Document<T> {
    /// Exact length in bytes of [`Document::to_xml`]'s output.
    pub fn xml_len(&self) -> usize {
        let mut count = Count(0);
        Serializer::new(self, &mut count).write_document();
        count.0
    }

    /// Render the tree to XML text. The output buffer is sized from a
    /// measuring pass, so rendering allocates exactly once.
    pub fn to_xml(&self) -> String {
        let len = self.xml_len();
        let mut out = String::with_capacity(len);
        Serializer::new(self, &mut out).write_document();
        debug_assert_eq!(out.len(), len);
        out
    }

    /// Render into a caller-supplied buffer, appending to its contents.
    pub fn write_xml(&self, out: &mut String) {
        Serializer::new(self, out).write_document();
    }
}
