//! Borrowed views over trie-owned bytes
//!
//! A view shares the immutable buffer stored in the trie instead of copying
//! it. Mutations replace stored buffers rather than writing into them, so a
//! view stays valid and unchanged for as long as it is held, whatever happens
//! to its key afterwards. Releasing a view is dropping it; `release` exists to
//! make the end of a view's lifetime explicit at call sites.

use std::ops::Deref;

use bytes::Bytes;

/// Read-only handle to a single value returned by `RadixTrie::get`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueView {
    bytes: Bytes,
}

impl ValueView {
    pub(crate) fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// Value length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Convert into the underlying shared buffer
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Release the view
    pub fn release(self) {}
}

impl Deref for ValueView {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for ValueView {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// What a prefix walk visitor wants to happen next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    Stop,
}

/// Every `(key, value)` pair produced by one prefix walk, released together
///
/// Pairs are yielded last-discovered first.
#[derive(Debug, Default)]
pub struct WalkBatch {
    /// Pairs in discovery order
    entries: Vec<(Bytes, Bytes)>,
}

impl WalkBatch {
    pub(crate) fn push(&mut self, key: Bytes, value: Bytes) {
        self.entries.push((key, value));
    }

    /// Number of pairs in the batch
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate pairs, most recently discovered first
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.entries
            .iter()
            .rev()
            .map(|(key, value)| (key.as_ref(), value.as_ref()))
    }

    /// Take ownership of the pairs, most recently discovered first
    pub fn into_entries(self) -> Vec<(Bytes, Bytes)> {
        let mut entries = self.entries;
        entries.reverse();
        entries
    }

    /// Release every view in the batch at once
    pub fn release(self) {}
}
