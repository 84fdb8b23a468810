//! Radix tree nodes
//!
//! Every node carries the edge label leading to it from its parent. Children
//! are kept sorted by the first byte of their label, and no two siblings share
//! a first byte, so a lookup step is a binary search over at most 256 entries.
//!
//! Structural invariants maintained by every mutation:
//! - a non-root node has a non-empty label
//! - a non-root node without a value has at least two children
//!   (otherwise it is pruned or merged into its only child)

use bytes::Bytes;

#[derive(Debug, Default)]
pub(crate) struct Node {
    /// Edge bytes from the parent to this node (empty only for the root)
    pub(crate) label: Vec<u8>,

    /// Value stored at the key ending on this node
    pub(crate) value: Option<Bytes>,

    /// Children sorted by `label[0]`
    pub(crate) children: Vec<Node>,
}

impl Node {
    fn leaf(label: Vec<u8>, value: Bytes) -> Self {
        Self {
            label,
            value: Some(value),
            children: Vec::new(),
        }
    }

    /// Position of the child whose label starts with `first`
    fn child_index(&self, first: u8) -> Result<usize, usize> {
        self.children.binary_search_by_key(&first, |child| child.label[0])
    }

    /// Exact-match lookup below this node
    pub(crate) fn find(&self, key: &[u8]) -> Option<&Bytes> {
        let mut node = self;
        let mut rest = key;
        loop {
            if rest.is_empty() {
                return node.value.as_ref();
            }
            let index = node.child_index(rest[0]).ok()?;
            let child = &node.children[index];
            rest = rest.strip_prefix(child.label.as_slice())?;
            node = child;
        }
    }

    /// Insert or replace; returns the previous value
    pub(crate) fn insert(&mut self, rest: &[u8], value: Bytes) -> Option<Bytes> {
        if rest.is_empty() {
            return self.value.replace(value);
        }

        match self.child_index(rest[0]) {
            Err(position) => {
                self.children
                    .insert(position, Node::leaf(rest.to_vec(), value));
                None
            }
            Ok(index) => {
                let child = &mut self.children[index];
                let common = common_prefix_len(&child.label, rest);
                if common < child.label.len() {
                    child.split(common);
                }
                child.insert(&rest[common..], value)
            }
        }
    }

    /// Split this node's label at `at`, pushing everything below into a new child
    fn split(&mut self, at: usize) {
        let suffix = self.label.split_off(at);
        let lower = Node {
            label: suffix,
            value: self.value.take(),
            children: std::mem::take(&mut self.children),
        };
        self.children = vec![lower];
    }

    /// Remove the exact key below this node; returns the removed value
    pub(crate) fn remove(&mut self, rest: &[u8]) -> Option<Bytes> {
        if rest.is_empty() {
            return self.value.take();
        }

        let index = self.child_index(rest[0]).ok()?;
        let child = &mut self.children[index];
        let below = rest.strip_prefix(child.label.as_slice())?;
        let removed = child.remove(below)?;
        self.prune_child(index);
        Some(removed)
    }

    /// Remove every key below this node starting with `rest`; returns the count
    ///
    /// An empty `rest` empties this node entirely (root-level calls only).
    pub(crate) fn remove_prefix(&mut self, rest: &[u8]) -> usize {
        if rest.is_empty() {
            let removed = self.count_values();
            self.value = None;
            self.children.clear();
            return removed;
        }

        let Ok(index) = self.child_index(rest[0]) else {
            return 0;
        };

        let child = &mut self.children[index];
        if child.label.starts_with(rest) {
            // The whole subtree lives under the prefix
            let detached = self.children.remove(index);
            return detached.count_values();
        }

        let Some(below) = rest.strip_prefix(child.label.as_slice()) else {
            return 0;
        };
        let removed = child.remove_prefix(below);
        if removed > 0 {
            self.prune_child(index);
        }
        removed
    }

    /// Restore the structural invariants of one child after a removal
    fn prune_child(&mut self, index: usize) {
        let child = &mut self.children[index];
        if child.value.is_some() {
            return;
        }
        match child.children.len() {
            0 => {
                self.children.remove(index);
            }
            1 => child.absorb_only_child(),
            _ => {}
        }
    }

    /// Merge a single child into this node, concatenating labels
    fn absorb_only_child(&mut self) {
        if let Some(only) = self.children.pop() {
            self.label.extend_from_slice(&only.label);
            self.value = only.value;
            self.children = only.children;
        }
    }

    /// Locate the node covering `prefix`, with the full key leading to it
    ///
    /// The returned key may be longer than `prefix` when the prefix ends in the
    /// middle of an edge label.
    pub(crate) fn descend(&self, prefix: &[u8]) -> Option<(&Node, Vec<u8>)> {
        let mut node = self;
        let mut path = Vec::with_capacity(prefix.len());
        let mut rest = prefix;
        while !rest.is_empty() {
            let index = node.child_index(rest[0]).ok()?;
            let child = &node.children[index];
            if child.label.starts_with(rest) {
                path.extend_from_slice(&child.label);
                return Some((child, path));
            }
            rest = rest.strip_prefix(child.label.as_slice())?;
            path.extend_from_slice(&child.label);
            node = child;
        }
        Some((node, path))
    }

    /// Number of values stored in this subtree
    pub(crate) fn count_values(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.value.is_some() {
                count += 1;
            }
            stack.extend(node.children.iter());
        }
        count
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
