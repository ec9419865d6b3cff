//! Two-pass parsing state machine.
//!
//! Three cooperating loops (document level, element, processing
//! instruction) consume glyphs from a [`Reader`] and emit nodes and text
//! into a [`Sink`]. Every parse runs twice over the same input: pass 1
//! with [`Measure`], which only counts nodes and text bytes, and pass 2
//! with [`Build`], which fills vectors sized exactly from the first
//! pass. The happy path therefore performs one node allocation and one
//! text allocation regardless of document size.
//!
//! Errors freeze at the first failure: `Result` propagation up through
//! the recursive element parser guarantees no later state overwrites the
//! line/column of the original report.

use crate::error::ParseError;
use crate::node::{NodeId, NodeKind, NodeRecord, Span};
use crate::reader::Reader;
use crate::tracing_macros::debug;

/// Parser state across all three loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    Name,
    Tag,
    AttrName,
    AttrEq,
    AttrEqFound,
    AttrValueDq,
    AttrValueSq,
    ContentTrim,
    Content,
    EndTag,
    InstName,
    InstTag,
    InstAttrName,
    InstAttrEq,
    InstAttrEqFound,
    InstAttrValueDq,
    InstAttrValueSq,
    Comment,
}

impl State {
    /// Entity references are live only while reading content or a quoted
    /// attribute value; everywhere else `&` is an ordinary character.
    fn decodes_escapes(self) -> bool {
        matches!(
            self,
            State::Content
                | State::ContentTrim
                | State::AttrValueDq
                | State::AttrValueSq
                | State::InstAttrValueDq
                | State::InstAttrValueSq
        )
    }
}

/// Receiver for everything the state machine produces.
///
/// The machine is written once and run against two implementations:
/// [`Measure`] counts, [`Build`] stores. Record mutations through
/// [`Sink::node`] hit a scratch record during measuring, so the control
/// flow is byte-for-byte identical across passes.
pub(crate) trait Sink {
    /// Allocate the next node record and return its index.
    fn alloc(&mut self, kind: NodeKind) -> usize;
    /// Mutable access to an allocated record.
    fn node(&mut self, index: usize) -> &mut NodeRecord;
    /// Current text write position.
    fn pos(&self) -> usize;
    /// Append one character to text storage.
    fn push(&mut self, ch: char);
    /// Re-append `len` bytes starting at `start`, keeping a content run
    /// contiguous after a child element interrupted it.
    fn copy_forward(&mut self, start: usize, len: usize);
}

/// Pass-1 sink: counts nodes and text bytes, stores nothing.
pub(crate) struct Measure {
    pub nodes: usize,
    pub bytes: usize,
    scratch: NodeRecord,
}

impl Measure {
    pub(crate) fn new() -> Self {
        Self {
            nodes: 0,
            bytes: 0,
            scratch: NodeRecord::new(NodeKind::Element),
        }
    }
}

impl Sink for Measure {
    fn alloc(&mut self, _kind: NodeKind) -> usize {
        let index = self.nodes;
        self.nodes += 1;
        index
    }

    fn node(&mut self, _index: usize) -> &mut NodeRecord {
        &mut self.scratch
    }

    fn pos(&self) -> usize {
        self.bytes
    }

    fn push(&mut self, ch: char) {
        self.bytes += ch.len_utf8();
    }

    fn copy_forward(&mut self, _start: usize, len: usize) {
        self.bytes += len;
    }
}

/// Pass-2 sink: fills exactly pre-sized node and text vectors.
pub(crate) struct Build {
    pub nodes: Vec<NodeRecord>,
    pub text: Vec<u8>,
}

impl Build {
    pub(crate) fn with_capacity(nodes: usize, bytes: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            text: Vec::with_capacity(bytes),
        }
    }
}

impl Sink for Build {
    fn alloc(&mut self, kind: NodeKind) -> usize {
        self.nodes.push(NodeRecord::new(kind));
        self.nodes.len() - 1
    }

    fn node(&mut self, index: usize) -> &mut NodeRecord {
        &mut self.nodes[index]
    }

    fn pos(&self) -> usize {
        self.text.len()
    }

    fn push(&mut self, ch: char) {
        let mut buf = [0u8; 4];
        self.text
            .extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    }

    fn copy_forward(&mut self, start: usize, len: usize) {
        self.text.extend_from_within(start..start + len);
    }
}

/// What the document-level loop found: every top-level node in document
/// order, and which of them is the root element.
#[derive(Debug)]
pub(crate) struct DocShape {
    pub top_level: Vec<usize>,
    pub root: usize,
}

pub(crate) struct Parser<'a, S: Sink> {
    r: Reader<'a>,
    sink: S,
    state: State,
}

impl<'a, S: Sink> Parser<'a, S> {
    pub(crate) fn new(input: &'a str, sink: S) -> Self {
        Self {
            r: Reader::new(input),
            sink,
            state: State::Outside,
        }
    }

    pub(crate) fn into_sink(self) -> S {
        self.sink
    }

    fn advance(&mut self) -> Result<bool, ParseError> {
        self.r.next(self.state.decodes_escapes())
    }

    /// Document level: whitespace, comments, processing instructions, and
    /// exactly one root element.
    pub(crate) fn parse_document(&mut self) -> Result<DocShape, ParseError> {
        let mut root: Option<usize> = None;
        let mut top_level = Vec::new();

        while self.advance()? {
            let c0 = self.r.cur();
            let c1 = self.r.back(1);
            let c2 = self.r.back(2);
            let c3 = self.r.back(3);
            match self.state {
                State::Outside => {
                    if c1.is('<') && c0.ch.is_ascii_alphabetic() && !c0.escaped {
                        if root.is_some() {
                            return Err(self.r.err("multiple root elements"));
                        }
                        let index = self.parse_element(None)?;
                        root = Some(index);
                        top_level.push(index);
                    } else if c1.is('<') && c0.is('?') {
                        top_level.push(self.parse_instruction()?);
                    } else if c3.is('<') && c2.is('!') && c1.is('-') && c0.is('-') {
                        self.state = State::Comment;
                    } else if !(c0.is('<')
                        || (c1.is('<') && c0.is('!'))
                        || (c2.is('<') && c1.is('!') && c0.is('-')))
                        && !c0.is_space()
                    {
                        return Err(self.r.err("unrelated character outside root element"));
                    }
                }
                State::Comment => {
                    if c2.is('-') && c1.is('-') && c0.is('>') {
                        self.state = State::Outside;
                    }
                }
                _ => unreachable!("document loop in state {:?}", self.state),
            }
        }

        if self.state == State::Comment {
            return Err(self.r.err("unterminated comment"));
        }
        // A trailing "<", "<!" or "<!-" was waiting for more input that
        // never came; the transient-prefix checks above let it through.
        let c0 = self.r.cur();
        let c1 = self.r.back(1);
        let c2 = self.r.back(2);
        if c0.is('<')
            || (c1.is('<') && c0.is('!'))
            || (c2.is('<') && c1.is('!') && c0.is('-'))
        {
            return Err(self.r.err("unterminated tag"));
        }
        match root {
            Some(root) => Ok(DocShape { top_level, root }),
            None => Err(self.r.err("no root element")),
        }
    }

    /// Element loop. Entered with the current glyph being the first name
    /// character; returns with the outer state restored.
    fn parse_element(&mut self, parent: Option<usize>) -> Result<usize, ParseError> {
        let outer_state = self.state;
        let index = self.sink.alloc(NodeKind::Element);

        // The name is compared against the end tag using raw input bytes,
        // which works identically in both passes.
        let name_input_start = self.r.current_start();
        let name_text_start = self.sink.pos();
        {
            let n = self.sink.node(index);
            n.parent = parent.map(NodeId::from_index);
            n.name = Span::new(0, name_text_start, 0);
        }
        let first = self.r.cur().ch;
        self.sink.push(first);
        self.sink.node(index).name.len += first.len_utf8() as u32;
        let mut name_bytes = first.len_utf8();

        let mut last_child: Option<usize> = None;
        let mut cur_attr: Option<usize> = None;
        let mut value_start = 0usize;
        let mut content_begin: Option<usize> = None;
        let mut content_end = 0usize;
        let mut comment_return = self.state;
        let mut end_name_start: Option<usize> = None;

        self.state = State::Name;
        while self.advance()? {
            let c0 = self.r.cur();
            let c1 = self.r.back(1);
            match self.state {
                State::Name => {
                    if c1.is('/') && c0.is('>') {
                        // `<name/>`: empty element, no attributes.
                        self.state = outer_state;
                        return Ok(index);
                    } else if c0.is('/') {
                        // Waiting for the closing '>'.
                    } else if c0.is('>') {
                        self.state = State::ContentTrim;
                    } else if !c0.is_space() {
                        self.sink.push(c0.ch);
                        self.sink.node(index).name.len += c0.ch.len_utf8() as u32;
                        name_bytes += c0.ch.len_utf8();
                    } else {
                        self.state = State::Tag;
                    }
                }
                State::Tag => {
                    if c0.ch.is_ascii_alphabetic() && !c0.escaped {
                        let attr = self.begin_attribute(index, &mut last_child, c0.ch);
                        cur_attr = Some(attr);
                        self.state = State::AttrName;
                    } else if c1.is('/') && c0.is('>') {
                        self.state = outer_state;
                        return Ok(index);
                    } else if c0.is('>') {
                        self.state = State::ContentTrim;
                    } else if !c0.is_space() && !c0.is('/') {
                        return Err(self.r.err("invalid character in tag"));
                    }
                }
                State::AttrName => {
                    if c0.is_space() {
                        self.state = State::AttrEq;
                    } else if c0.is('=') {
                        self.state = State::AttrEqFound;
                    } else {
                        let attr = cur_attr.expect("attribute name state without attribute");
                        self.sink.push(c0.ch);
                        self.sink.node(attr).name.len += c0.ch.len_utf8() as u32;
                    }
                }
                State::AttrEq => {
                    if c0.is('=') {
                        self.state = State::AttrEqFound;
                    } else if !c0.is_space() {
                        return Err(self.r.err("expected '=' after attribute name"));
                    }
                }
                State::AttrEqFound => {
                    if c0.is('"') {
                        value_start = self.sink.pos();
                        self.state = State::AttrValueDq;
                    } else if c0.is('\'') {
                        value_start = self.sink.pos();
                        self.state = State::AttrValueSq;
                    } else if !c0.is_space() {
                        return Err(self.r.err("attribute value must be quoted"));
                    }
                }
                State::AttrValueDq | State::AttrValueSq => {
                    let quote = if self.state == State::AttrValueDq { '"' } else { '\'' };
                    if c0.is(quote) {
                        let attr = cur_attr.expect("attribute value state without attribute");
                        let len = self.sink.pos() - value_start;
                        let a = self.sink.node(attr);
                        a.content = Span::new(0, value_start, len);
                        a.full_size = len as u32;
                        self.state = State::Tag;
                    } else {
                        self.sink.push(c0.ch);
                    }
                }
                State::ContentTrim | State::Content => {
                    let c2 = self.r.back(2);
                    let c3 = self.r.back(3);
                    if (c1.is('<') && c0.is('!')) || (c2.is('<') && c1.is('!') && c0.is('-')) {
                        // Possibly a comment opener; decided on the next glyph.
                    } else if c1.is('<') {
                        if c0.ch.is_ascii_alphabetic() && !c0.escaped {
                            let run = content_begin.map_or(0, |begin| content_end - begin);
                            let child = self.parse_element(Some(index))?;
                            if self.sink.node(index).first_child.is_none() {
                                self.sink.node(index).first_child =
                                    Some(NodeId::from_index(child));
                            }
                            if let Some(prev) = last_child {
                                self.sink.node(prev).next_sibling =
                                    Some(NodeId::from_index(child));
                            }
                            last_child = Some(child);
                            if run != 0 {
                                // Move the accumulated run past the child's
                                // text so content stays one contiguous slice.
                                let begin = content_begin.expect("non-empty content run");
                                let new_begin = self.sink.pos();
                                debug!("content splice: {run} bytes forward");
                                self.sink.copy_forward(begin, run);
                                content_begin = Some(new_begin);
                                content_end = new_begin + run;
                            }
                        } else if c0.is('/') {
                            end_name_start = None;
                            self.state = State::EndTag;
                        } else {
                            return Err(self.r.err("invalid character after '<'"));
                        }
                    } else if c3.is('<') && c2.is('!') && c1.is('-') && c0.is('-') {
                        comment_return = self.state;
                        self.state = State::Comment;
                    } else if !c0.is('<') {
                        if self.state == State::ContentTrim {
                            if !(c0.is_space() && !c0.escaped) {
                                self.state = State::Content;
                                if content_begin.is_some() {
                                    // One space stands in for the collapsed run.
                                    self.sink.push(' ');
                                } else {
                                    content_begin = Some(self.sink.pos());
                                }
                                self.sink.push(c0.ch);
                                content_end = self.sink.pos();
                            }
                        } else if c0.is_space() && !c0.escaped {
                            self.state = State::ContentTrim;
                        } else {
                            self.sink.push(c0.ch);
                            content_end = self.sink.pos();
                        }
                    }
                }
                State::Comment => {
                    let c2 = self.r.back(2);
                    if c2.is('-') && c1.is('-') && c0.is('>') {
                        self.state = comment_return;
                    }
                }
                State::EndTag => {
                    if end_name_start.is_none() {
                        end_name_start = Some(self.r.current_start());
                    }
                    if c0.is('>') {
                        let end_start = end_name_start.expect("end tag start recorded");
                        let end_len = self.r.current_start() - end_start;
                        if end_len != name_bytes {
                            return Err(self.r.err("closing tag name has different length"));
                        }
                        let input = self.r.input().as_bytes();
                        if input[name_input_start..name_input_start + name_bytes]
                            != input[end_start..end_start + name_bytes]
                        {
                            return Err(self.r.err("closing tag name does not match"));
                        }
                        if let Some(begin) = content_begin {
                            let n = self.sink.node(index);
                            n.content = Span::new(0, begin, content_end - begin);
                            n.full_size = (content_end - begin) as u32;
                        }
                        self.state = outer_state;
                        return Ok(index);
                    }
                }
                _ => unreachable!("element loop in state {:?}", self.state),
            }
        }
        Err(self.r.err("unterminated element"))
    }

    /// Processing-instruction loop: `<?name attr="value" …?>`.
    fn parse_instruction(&mut self) -> Result<usize, ParseError> {
        let outer_state = self.state;
        let index = self.sink.alloc(NodeKind::Instruction);
        let name_start = self.sink.pos();
        self.sink.node(index).name = Span::new(0, name_start, 0);

        let mut last_attr: Option<usize> = None;
        let mut cur_attr: Option<usize> = None;
        let mut value_start = 0usize;

        self.state = State::InstName;
        while self.advance()? {
            let c0 = self.r.cur();
            let c1 = self.r.back(1);
            match self.state {
                State::InstName => {
                    if c0.is('?') {
                        self.state = State::InstTag;
                    } else if !c0.is_space() {
                        self.sink.push(c0.ch);
                        self.sink.node(index).name.len += c0.ch.len_utf8() as u32;
                    } else {
                        self.state = State::InstTag;
                    }
                }
                State::InstTag => {
                    if c0.ch.is_ascii_alphabetic() && !c0.escaped {
                        let attr = self.begin_attribute(index, &mut last_attr, c0.ch);
                        cur_attr = Some(attr);
                        self.state = State::InstAttrName;
                    } else if c1.is('?') && c0.is('>') {
                        self.state = outer_state;
                        return Ok(index);
                    } else if !c0.is('?') && !c0.is_space() {
                        return Err(self.r.err("invalid character in processing instruction"));
                    }
                }
                State::InstAttrName => {
                    if c0.is_space() {
                        self.state = State::InstAttrEq;
                    } else if c0.is('=') {
                        self.state = State::InstAttrEqFound;
                    } else {
                        let attr = cur_attr.expect("attribute name state without attribute");
                        self.sink.push(c0.ch);
                        self.sink.node(attr).name.len += c0.ch.len_utf8() as u32;
                    }
                }
                State::InstAttrEq => {
                    if c0.is('=') {
                        self.state = State::InstAttrEqFound;
                    } else if !c0.is_space() {
                        return Err(self.r.err("expected '=' after attribute name"));
                    }
                }
                State::InstAttrEqFound => {
                    if c0.is('"') {
                        value_start = self.sink.pos();
                        self.state = State::InstAttrValueDq;
                    } else if c0.is('\'') {
                        value_start = self.sink.pos();
                        self.state = State::InstAttrValueSq;
                    } else if !c0.is_space() {
                        return Err(self.r.err("attribute value must be quoted"));
                    }
                }
                State::InstAttrValueDq | State::InstAttrValueSq => {
                    let quote = if self.state == State::InstAttrValueDq { '"' } else { '\'' };
                    if c0.is(quote) {
                        let attr = cur_attr.expect("attribute value state without attribute");
                        let len = self.sink.pos() - value_start;
                        let a = self.sink.node(attr);
                        a.content = Span::new(0, value_start, len);
                        a.full_size = len as u32;
                        self.state = State::InstTag;
                    } else {
                        self.sink.push(c0.ch);
                    }
                }
                _ => unreachable!("instruction loop in state {:?}", self.state),
            }
        }
        Err(self.r.err("unterminated processing instruction"))
    }

    /// Allocate an attribute node, link it into the owner's child chain,
    /// and store the first character of its name.
    fn begin_attribute(
        &mut self,
        owner: usize,
        last_child: &mut Option<usize>,
        first_char: char,
    ) -> usize {
        let attr = self.sink.alloc(NodeKind::Attribute);
        let name_start = self.sink.pos();
        {
            let a = self.sink.node(attr);
            a.parent = Some(NodeId::from_index(owner));
            a.name = Span::new(0, name_start, 0);
        }
        if self.sink.node(owner).first_child.is_none() {
            self.sink.node(owner).first_child = Some(NodeId::from_index(attr));
        }
        if let Some(prev) = *last_child {
            self.sink.node(prev).next_sibling = Some(NodeId::from_index(attr));
        }
        *last_child = Some(attr);
        self.sink.push(first_char);
        self.sink.node(attr).name.len += first_char.len_utf8() as u32;
        attr
    }
}
