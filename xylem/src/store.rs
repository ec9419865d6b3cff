//! Arena storage for node records and text bytes.
//!
//! One document owns exactly one [`TextStore`] and one [`NodeStore`]. Both
//! work the same way: fragment 0 is the exact-sized block produced by the
//! measuring parse pass, and mutation appends further fragments on demand.
//! A new fragment's capacity is the smallest power-of-two multiple of the
//! previous fragment's capacity that fits the request, so capacity at least
//! doubles on every growth step. The fragment count is bounded by
//! [`MAX_FRAGMENTS`]; running into the bound is reported as
//! [`TreeError::FragmentLimit`], never a panic.

use crate::error::TreeError;
use crate::node::{NodeId, NodeRecord, Span};
use crate::tracing_macros::debug;

/// Upper bound on fragments per store. Since each fragment is at least
/// twice the size of the previous one, 32 fragments cover any realistic
/// growth sequence.
pub const MAX_FRAGMENTS: usize = 32;

/// Smallest power-of-two multiple of `prev` that is at least `need`.
fn grown_capacity(prev: usize, need: usize) -> usize {
    let mut cap = prev.max(1) << 1;
    while cap < need {
        cap <<= 1;
    }
    cap
}

// ---------------------------------------------------------------------------
// Text storage
// ---------------------------------------------------------------------------

struct TextFragment {
    data: Vec<u8>,
    cap: usize,
}

/// Fragmented byte storage holding every name and content slice.
///
/// Invariant: every byte written in comes from a `&str` or from a `char`
/// encoded with `encode_utf8`, and spans never cut a code point, so any
/// span can be handed back out as `&str`.
pub(crate) struct TextStore {
    frags: Vec<TextFragment>,
}

impl TextStore {
    /// Wrap the exact-sized block built by parse pass 2. Its capacity is
    /// frozen at its length: the first mutation that needs room opens a
    /// new fragment.
    pub(crate) fn exact(data: Vec<u8>) -> Self {
        let cap = data.len();
        Self {
            frags: vec![TextFragment { data, cap }],
        }
    }

    pub(crate) fn slice(&self, span: Span) -> &[u8] {
        let frag = &self.frags[span.frag as usize];
        &frag.data[span.start as usize..(span.start + span.len) as usize]
    }

    pub(crate) fn str(&self, span: Span) -> &str {
        let bytes = self.slice(span);
        debug_assert!(std::str::from_utf8(bytes).is_ok());
        // SAFETY: see the type-level invariant; the store only ever
        // receives UTF-8 and spans are aligned to what was written.
        unsafe { std::str::from_utf8_unchecked(bytes) }
    }

    /// Overwrite bytes in place at the start of an existing allocation.
    /// The caller guarantees `bytes` fits the node's `full_size` region.
    pub(crate) fn overwrite(&mut self, frag: u32, start: u32, bytes: &[u8]) {
        let start = start as usize;
        let frag = &mut self.frags[frag as usize];
        frag.data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Make sure the newest fragment has at least `extra` free bytes,
    /// opening a new fragment if it does not.
    pub(crate) fn reserve(&mut self, extra: usize) -> Result<(), TreeError> {
        let last = self.frags.last().expect("text store has a fragment");
        if last.cap - last.data.len() >= extra {
            return Ok(());
        }
        if self.frags.len() >= MAX_FRAGMENTS {
            return Err(TreeError::FragmentLimit);
        }
        let cap = grown_capacity(last.cap, extra);
        debug!("text store grows: fragment {} with {} bytes", self.frags.len(), cap);
        self.frags.push(TextFragment {
            data: Vec::with_capacity(cap),
            cap,
        });
        Ok(())
    }

    /// Append `bytes` to the newest fragment, growing first if needed,
    /// and return the span they landed at.
    pub(crate) fn append(&mut self, bytes: &[u8]) -> Result<Span, TreeError> {
        self.reserve(bytes.len())?;
        let frag_index = self.frags.len() - 1;
        let frag = &mut self.frags[frag_index];
        let start = frag.data.len();
        frag.data.extend_from_slice(bytes);
        Ok(Span::new(frag_index, start, bytes.len()))
    }

    #[cfg(test)]
    pub(crate) fn fragment_count(&self) -> usize {
        self.frags.len()
    }

    /// A store whose every fragment is full, for exercising the bound.
    #[cfg(test)]
    fn full_fragments(count: usize) -> Self {
        Self {
            frags: (0..count)
                .map(|_| TextFragment {
                    data: b"x".to_vec(),
                    cap: 1,
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Node storage
// ---------------------------------------------------------------------------

struct NodeFragment {
    /// Global index of this fragment's first record.
    base: usize,
    records: Vec<NodeRecord>,
    cap: usize,
}

/// Fragmented storage of node records, addressed by flat [`NodeId`] index.
pub(crate) struct NodeStore {
    frags: Vec<NodeFragment>,
}

impl NodeStore {
    pub(crate) fn exact(records: Vec<NodeRecord>) -> Self {
        let cap = records.len();
        Self {
            frags: vec![NodeFragment {
                base: 0,
                records,
                cap,
            }],
        }
    }

    fn locate(&self, id: NodeId) -> (usize, usize) {
        let index = id.index();
        // Fragment 0 holds the whole parsed document, so the scan almost
        // always stops at the first entry.
        for (f, frag) in self.frags.iter().enumerate() {
            if index < frag.base + frag.records.len() {
                return (f, index - frag.base);
            }
        }
        panic!("node id {index} out of range");
    }

    pub(crate) fn get(&self, id: NodeId) -> &NodeRecord {
        let (f, i) = self.locate(id);
        &self.frags[f].records[i]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut NodeRecord {
        let (f, i) = self.locate(id);
        &mut self.frags[f].records[i]
    }

    pub(crate) fn len(&self) -> usize {
        let last = self.frags.last().expect("node store has a fragment");
        last.base + last.records.len()
    }

    /// Iterate all records in allocation order with their ids.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeRecord)> {
        self.frags.iter().flat_map(|frag| {
            frag.records
                .iter()
                .enumerate()
                .map(move |(i, record)| (NodeId::from_index(frag.base + i), record))
        })
    }

    /// Make sure the newest fragment has room for `extra` more records.
    pub(crate) fn reserve(&mut self, extra: usize) -> Result<(), TreeError> {
        let last = self.frags.last().expect("node store has a fragment");
        if last.cap - last.records.len() >= extra {
            return Ok(());
        }
        if self.frags.len() >= MAX_FRAGMENTS {
            return Err(TreeError::FragmentLimit);
        }
        let base = last.base + last.records.len();
        let cap = grown_capacity(last.cap, extra);
        debug!("node store grows: fragment {} with {} records", self.frags.len(), cap);
        self.frags.push(NodeFragment {
            base,
            records: Vec::with_capacity(cap),
            cap,
        });
        Ok(())
    }

    pub(crate) fn alloc(&mut self, record: NodeRecord) -> Result<NodeId, TreeError> {
        self.reserve(1)?;
        let frag = self.frags.last_mut().expect("node store has a fragment");
        let id = NodeId::from_index(frag.base + frag.records.len());
        frag.records.push(record);
        Ok(id)
    }
}
