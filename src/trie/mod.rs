//! Trie Module
//!
//! Prefix-compressed (radix) tree holding one database's records.
//!
//! ## Responsibilities
//! - Exact-match get/set/delete on arbitrary byte keys
//! - Prefix deletion and prefix enumeration
//! - Handing out views whose lifetime is controlled by the caller
//!
//! ## Concurrency
//! One `RwLock` guards the whole tree: lookups and walks share it, structural
//! mutations take it exclusively. Values are stored as immutable `Bytes`, so
//! views handed out under the read lock remain valid after it is released.

mod node;
mod view;

pub use view::{ValueView, WalkBatch, WalkControl};

use bytes::Bytes;
use parking_lot::RwLock;

use node::Node;

#[derive(Debug, Default)]
struct TrieState {
    root: Node,
    len: usize,
}

/// Radix tree keyed by byte strings
#[derive(Debug, Default)]
pub struct RadixTrie {
    state: RwLock<TrieState>,
}

impl RadixTrie {
    /// Create an empty trie
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an exact key
    pub fn get(&self, key: &[u8]) -> Option<ValueView> {
        let state = self.state.read();
        state.root.find(key).cloned().map(ValueView::new)
    }

    /// Insert or replace a record
    ///
    /// Returns `true` if the key already existed.
    pub fn set(&self, key: &[u8], value: &[u8]) -> bool {
        let value = Bytes::copy_from_slice(value);
        let mut state = self.state.write();
        let existed = state.root.insert(key, value).is_some();
        if !existed {
            state.len += 1;
        }
        existed
    }

    /// Remove an exact key
    ///
    /// Returns `true` if the key existed.
    pub fn delete(&self, key: &[u8]) -> bool {
        let mut state = self.state.write();
        let existed = state.root.remove(key).is_some();
        if existed {
            state.len -= 1;
        }
        existed
    }

    /// Remove every record whose key starts with `prefix`
    ///
    /// The empty prefix matches every key. Returns the number removed.
    pub fn delete_prefix(&self, prefix: &[u8]) -> u64 {
        let mut state = self.state.write();
        let removed = state.root.remove_prefix(prefix);
        state.len -= removed;
        removed as u64
    }

    /// Enumerate every record whose key starts with `prefix`
    ///
    /// `visit` is called once per match and may stop the walk early; the pair
    /// passed to the stopping call is still part of the batch. The tree is
    /// read-locked for the duration of the walk, so `visit` must not mutate
    /// this trie.
    pub fn walk_prefix<F>(&self, prefix: &[u8], mut visit: F) -> WalkBatch
    where
        F: FnMut(&[u8], &[u8]) -> WalkControl,
    {
        let mut batch = WalkBatch::default();
        let state = self.state.read();

        let Some((start, start_key)) = state.root.descend(prefix) else {
            return batch;
        };

        let mut stack = vec![(start, start_key)];
        while let Some((node, key)) = stack.pop() {
            if let Some(value) = &node.value {
                let control = visit(key.as_slice(), value.as_ref());
                batch.push(Bytes::copy_from_slice(&key), value.clone());
                if control == WalkControl::Stop {
                    break;
                }
            }

            // Reverse so the smallest child is explored first
            for child in node.children.iter().rev() {
                let mut child_key = Vec::with_capacity(key.len() + child.label.len());
                child_key.extend_from_slice(&key);
                child_key.extend_from_slice(&child.label);
                stack.push((child, child_key));
            }
        }

        batch
    }

    /// Collect every record under `prefix`
    pub fn scan_prefix(&self, prefix: &[u8]) -> WalkBatch {
        self.walk_prefix(prefix, |_, _| WalkControl::Continue)
    }

    /// Remove every record
    pub fn clear(&self) {
        let old = {
            let mut state = self.state.write();
            std::mem::take(&mut *state)
        };
        // Free the old tree outside the lock
        drop(old);
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.state.read().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
