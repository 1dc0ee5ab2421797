use crate::btree::node::Node;
use crate::btree::{TreeError, DEFAULT_DEGREE, MIN_DEGREE};
use std::borrow::Borrow;
use std::fmt::{Debug, Display, Formatter};

/// A B-tree of minimum degree `t` that tracks key presence only.
///
/// Every node holds at most `2t - 1` keys and every non-root node at least
/// `t - 1`. Full nodes are split on the way down during insertion, so an
/// insert is a single top-down walk.
#[derive(Debug, Clone)]
pub struct BTree<K> {
    root: Node<K>,
    degree: usize,
    len: usize,
}

impl<K> BTree<K> {
    pub fn new() -> Self {
        BTree {
            root: Node::new_leaf(),
            degree: DEFAULT_DEGREE,
            len: 0,
        }
    }

    pub fn with_degree(degree: usize) -> Result<Self, TreeError> {
        if degree < MIN_DEGREE {
            return Err(TreeError::DegreeTooSmall(degree));
        }

        Ok(BTree {
            root: Node::new_leaf(),
            degree,
            len: 0,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels, counting the root. An empty tree has height 1.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &self.root;
        while let Some(first) = node.children.first() {
            height += 1;
            node = first;
        }
        height
    }
}

impl<K: Ord> BTree<K> {
    pub fn search<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.root.search(key)
    }

    pub fn insert(&mut self, key: K) {
        if self.root.is_full(self.degree) {
            let old_root = std::mem::replace(&mut self.root, Node::new_leaf());
            self.root = Node::new_link_over(old_root);
            self.root.split_child(0, self.degree);
            tracing::trace!(height = self.height(), "root split, tree grew a level");
        }

        self.root.insert_non_full(key, self.degree);
        self.len += 1;
    }

    /// Inserts keys in order until the first `Err`, which is returned.
    ///
    /// Nothing is rolled back: keys inserted before the failing item stay in
    /// the tree. On success returns how many keys were inserted.
    pub fn try_extend<I, E>(&mut self, keys: I) -> Result<usize, E>
    where
        I: IntoIterator<Item = Result<K, E>>,
    {
        let mut inserted = 0;
        for key in keys {
            self.insert(key?);
            inserted += 1;
        }
        Ok(inserted)
    }
}

impl<K> Default for BTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> Extend<K> for BTree<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, keys: I) {
        for key in keys {
            self.insert(key);
        }
    }
}

impl<K: Ord> FromIterator<K> for BTree<K> {
    fn from_iter<I: IntoIterator<Item = K>>(keys: I) -> Self {
        let mut tree = BTree::new();
        tree.extend(keys);
        tree
    }
}

impl<K: Debug> Display for BTree<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("root\n")?;
        write!(f, "{}", self.root)
    }
}
