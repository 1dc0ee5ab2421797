use crate::btree::max_keys;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};

/// One vertex of the tree. A node with no children is a leaf; an internal
/// node always has exactly `keys.len() + 1` children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Node<K> {
    pub(super) keys: Vec<K>,
    pub(super) children: Vec<Node<K>>,
}

impl<K> Node<K> {
    pub(super) fn new_leaf() -> Self {
        Node {
            keys: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Keyless parent for a root split; call `split_child(0, ..)` right after.
    pub(super) fn new_link_over(only_child: Node<K>) -> Self {
        Node {
            keys: Vec::new(),
            children: vec![only_child],
        }
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(super) fn is_full(&self, degree: usize) -> bool {
        self.keys.len() == max_keys(degree)
    }

    /// Moves the median (index `t - 1`) of the full child at `index` up into
    /// `self`; the upper halves become a new sibling at `index + 1`.
    pub(super) fn split_child(&mut self, index: usize, degree: usize) {
        let child = &mut self.children[index];
        debug_assert!(child.is_full(degree));

        let right_keys = child.keys.split_off(degree);
        let right_children = if child.is_leaf() {
            Vec::new()
        } else {
            child.children.split_off(degree)
        };

        // after split_off the median is the last remaining key
        let Some(median) = child.keys.pop() else {
            unreachable!("a full node always has a median")
        };

        self.keys.insert(index, median);
        self.children.insert(
            index + 1,
            Node {
                keys: right_keys,
                children: right_children,
            },
        );
    }

    fn fmt_depth(&self, f: &mut Formatter<'_>, depth: usize) -> std::fmt::Result
    where
        K: Debug,
    {
        f.write_str(&" ".repeat(depth))?;
        if self.is_leaf() {
            return f.write_str(&format!("keys: {:?}\n", self.keys));
        }

        f.write_str(&format!("separators: {:?}\n", self.keys))?;
        for child in &self.children {
            child.fmt_depth(f, depth + 1)?;
        }
        Ok(())
    }
}

impl<K: Ord> Node<K> {
    pub(super) fn search<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = self;
        loop {
            let pos = node
                .keys
                .iter()
                .position(|k| key.cmp(k.borrow()) != Ordering::Greater)
                .unwrap_or(node.keys.len());

            if node.keys.get(pos).is_some_and(|k| key.cmp(k.borrow()) == Ordering::Equal) {
                return true;
            }
            if node.is_leaf() {
                return false;
            }
            node = &node.children[pos];
        }
    }

    /// `self` must not be full. Full children are split before descending.
    pub(super) fn insert_non_full(&mut self, inserted_key: K, degree: usize) {
        let pos = self
            .keys
            .iter()
            .position(|k| &inserted_key < k)
            .unwrap_or(self.keys.len());

        if self.is_leaf() {
            self.keys.insert(pos, inserted_key);
            return;
        }

        let mut child_to_update = pos;
        if self.children[child_to_update].is_full(degree) {
            tracing::trace!(index = child_to_update, "splitting full child before descent");
            self.split_child(child_to_update, degree);
            if inserted_key > self.keys[child_to_update] {
                child_to_update += 1;
            }
        }

        self.children[child_to_update].insert_non_full(inserted_key, degree);
    }
}

impl<K: Debug> Display for Node<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.fmt_depth(f, 1)
    }
}
