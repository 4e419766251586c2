//! BTree: order-`b` search tree over `i32` keys.
//!
//! Nodes live in a `SlotMap` arena and refer to their children by
//! generational `NodeId`, so splits and merges rewire indices rather than
//! pointers and dropping the tree releases every node at once.
//!
//! Insertion splits full nodes on the way down; deletion tops up thin
//! children on the way down. Neither ever walks back up.

use crate::config::BTreeConfig;
use crate::error::Result;
use slotmap::{new_key_type, SlotMap};
use std::fmt;
use std::io;
use std::mem;
use tracing::{debug, trace};

pub type Key = i32;

new_key_type! {
    /// Arena reference to a tree node.
    pub struct NodeId;
}

#[derive(Debug)]
struct Node {
    keys: Vec<Key>,
    children: Vec<NodeId>,
    leaf: bool,
}

impl Node {
    /// Allocates a node with room for a full key set, so later splits,
    /// borrows and merges never reallocate it.
    fn try_new(config: &BTreeConfig, leaf: bool) -> Result<Self> {
        let mut keys = Vec::new();
        keys.try_reserve_exact(config.max_keys())?;
        let mut children = Vec::new();
        if !leaf {
            children.try_reserve_exact(config.max_keys() + 1)?;
        }
        Ok(Self {
            keys,
            children,
            leaf,
        })
    }
}

pub struct BTree {
    config: BTreeConfig,
    len: usize,
    root: NodeId,
    nodes: SlotMap<NodeId, Node>,
}

impl BTree {
    /// Empty tree with branching parameter `degree` (at least 2).
    pub fn new(degree: usize) -> Result<Self> {
        Self::with_config(BTreeConfig::with_degree(degree))
    }

    pub fn with_config(config: BTreeConfig) -> Result<Self> {
        config.validate()?;
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::try_new(&config, true)?);
        Ok(Self {
            config,
            len: 0,
            root,
            nodes,
        })
    }

    pub fn degree(&self) -> usize {
        self.config.degree
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live nodes, the root included.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Nominal size of one node: header plus full key and child capacity.
    /// Every node of a tree reports the same figure.
    pub fn node_bytes(&self) -> usize {
        let max_keys = self.config.max_keys();
        mem::size_of::<Node>()
            .saturating_add(max_keys.saturating_mul(mem::size_of::<Key>()))
            .saturating_add((max_keys + 1).saturating_mul(mem::size_of::<NodeId>()))
    }

    /// Number of node levels; 0 for an empty tree.
    pub fn height(&self) -> usize {
        if self.len == 0 {
            return 0;
        }
        let mut height = 1;
        let mut id = self.root;
        while !self.nodes[id].leaf {
            id = self.nodes[id].children[0];
            height += 1;
        }
        height
    }

    pub fn contains(&self, key: Key) -> bool {
        let mut id = self.root;
        loop {
            let node = &self.nodes[id];
            match node.keys.binary_search(&key) {
                Ok(_) => return true,
                Err(_) if node.leaf => return false,
                Err(index) => id = node.children[index],
            }
        }
    }

    /// Smallest key.
    pub fn first(&self) -> Option<Key> {
        (self.len > 0).then(|| self.min_key(self.root))
    }

    /// Largest key.
    pub fn last(&self) -> Option<Key> {
        (self.len > 0).then(|| self.max_key(self.root))
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Drops every node but the root and empties it.
    pub fn clear(&mut self) {
        let root = self.root;
        self.nodes.retain(|id, _| id == root);
        let node = &mut self.nodes[root];
        node.keys.clear();
        node.children.clear();
        node.leaf = true;
        self.len = 0;
    }

    /// Inserts `key`. Returns `Ok(false)` without touching the tree when
    /// the key is already present.
    ///
    /// Fails only when a node needed for a split cannot be allocated; the
    /// key set is unchanged in that case.
    pub fn insert(&mut self, key: Key) -> Result<bool> {
        if self.contains(key) {
            return Ok(false);
        }
        if self.nodes[self.root].keys.len() == self.config.max_keys() {
            self.split_root()?;
        }
        self.insert_non_full(key)?;
        self.len += 1;
        Ok(true)
    }

    /// Removes `key`. Returns `false` without touching the tree when the
    /// key is absent.
    pub fn remove(&mut self, key: Key) -> bool {
        if !self.contains(key) {
            return false;
        }
        self.remove_present(key);
        self.collapse_root();
        self.len -= 1;
        true
    }

    /// Writes the keys in ascending order on one line.
    pub fn print<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{self}")
    }

    /// Writes every node in level order, one `[ k k k ]` line per node,
    /// under a `---N node(s)---` header.
    pub fn dump_levels<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        let mut order = vec![self.root];
        let mut next = 0;
        while next < order.len() {
            let node = &self.nodes[order[next]];
            order.extend(node.children.iter().copied());
            next += 1;
        }
        writeln!(out, "---{} node(s)---", order.len())?;
        for id in order {
            write!(out, "[ ")?;
            for key in &self.nodes[id].keys {
                write!(out, "{key} ")?;
            }
            writeln!(out, "]")?;
        }
        Ok(())
    }

    fn min_key(&self, mut id: NodeId) -> Key {
        while !self.nodes[id].leaf {
            id = self.nodes[id].children[0];
        }
        self.nodes[id].keys[0]
    }

    fn max_key(&self, mut id: NodeId) -> Key {
        loop {
            let node = &self.nodes[id];
            if node.leaf {
                return node.keys[node.keys.len() - 1];
            }
            id = node.children[node.children.len() - 1];
        }
    }

    fn split_root(&mut self) -> Result<()> {
        let old_root = self.root;
        let mut new_root = Node::try_new(&self.config, false)?;
        let sibling = Node::try_new(&self.config, self.nodes[old_root].leaf)?;
        new_root.children.push(old_root);
        self.root = self.nodes.insert(new_root);
        self.split_child_into(self.root, 0, sibling);
        debug!(
            height = self.height(),
            nodes = self.nodes.len(),
            "btree root split"
        );
        Ok(())
    }

    fn split_child(&mut self, parent: NodeId, index: usize) -> Result<()> {
        let child = self.nodes[parent].children[index];
        let sibling = Node::try_new(&self.config, self.nodes[child].leaf)?;
        self.split_child_into(parent, index, sibling);
        Ok(())
    }

    /// Moves the upper `b-1` keys of the full child at `index` into
    /// `sibling` and lifts the median into `parent`, which must not be full.
    fn split_child_into(&mut self, parent: NodeId, index: usize, mut sibling: Node) {
        let degree = self.config.degree;
        let child = self.nodes[parent].children[index];
        let node = &mut self.nodes[child];
        sibling.keys.extend(node.keys.drain(degree..));
        if !node.leaf {
            sibling.children.extend(node.children.drain(degree..));
        }
        let median = node.keys.pop().expect("full node holds a median");
        let sibling = self.nodes.insert(sibling);
        let parent = &mut self.nodes[parent];
        parent.keys.insert(index, median);
        parent.children.insert(index + 1, sibling);
        trace!(median, "btree child split");
    }

    fn insert_non_full(&mut self, key: Key) -> Result<()> {
        let max_keys = self.config.max_keys();
        let mut id = self.root;
        loop {
            let node = &self.nodes[id];
            let mut index = node.keys.binary_search(&key).unwrap_or_else(|i| i);
            if node.leaf {
                self.nodes[id].keys.insert(index, key);
                return Ok(());
            }
            let child = node.children[index];
            if self.nodes[child].keys.len() == max_keys {
                self.split_child(id, index)?;
                if key > self.nodes[id].keys[index] {
                    index += 1;
                }
            }
            id = self.nodes[id].children[index];
        }
    }

    /// Deletes a key known to be present, making sure every child it
    /// descends into can give up a key.
    fn remove_present(&mut self, mut key: Key) {
        let degree = self.config.degree;
        let mut id = self.root;
        loop {
            let (found, leaf) = {
                let node = &self.nodes[id];
                (node.keys.binary_search(&key), node.leaf)
            };
            match (found, leaf) {
                (Ok(index), true) => {
                    self.nodes[id].keys.remove(index);
                    return;
                }
                (Ok(index), false) => {
                    let (left, right) = {
                        let node = &self.nodes[id];
                        (node.children[index], node.children[index + 1])
                    };
                    if self.nodes[left].keys.len() >= degree {
                        let predecessor = self.max_key(left);
                        self.nodes[id].keys[index] = predecessor;
                        key = predecessor;
                        id = left;
                    } else if self.nodes[right].keys.len() >= degree {
                        let successor = self.min_key(right);
                        self.nodes[id].keys[index] = successor;
                        key = successor;
                        id = right;
                    } else {
                        self.merge_children(id, index);
                        id = left;
                    }
                }
                (Err(_), true) => return,
                (Err(index), false) => {
                    let child = self.nodes[id].children[index];
                    let index = if self.nodes[child].keys.len() < degree {
                        self.fill_child(id, index)
                    } else {
                        index
                    };
                    id = self.nodes[id].children[index];
                }
            }
        }
    }

    /// Gives the child at `index` a spare key by rotation from a sibling
    /// (left first) or, failing that, by merging it with one (left first).
    /// Returns the index of the child now covering the same key range.
    fn fill_child(&mut self, parent: NodeId, index: usize) -> usize {
        let degree = self.config.degree;
        let (left, right) = {
            let node = &self.nodes[parent];
            (
                index.checked_sub(1).map(|i| node.children[i]),
                node.children.get(index + 1).copied(),
            )
        };
        match (left, right) {
            (Some(left), _) if self.nodes[left].keys.len() >= degree => {
                self.borrow_from_left(parent, index);
                index
            }
            (_, Some(right)) if self.nodes[right].keys.len() >= degree => {
                self.borrow_from_right(parent, index);
                index
            }
            (Some(_), _) => {
                self.merge_children(parent, index - 1);
                index - 1
            }
            (None, _) => {
                self.merge_children(parent, index);
                index
            }
        }
    }

    fn borrow_from_left(&mut self, parent: NodeId, index: usize) {
        let (left, child) = {
            let node = &self.nodes[parent];
            (node.children[index - 1], node.children[index])
        };
        let lender = &mut self.nodes[left];
        let lifted = lender.keys.pop().expect("lending sibling holds spare keys");
        let moved = if lender.leaf {
            None
        } else {
            lender.children.pop()
        };
        let separator = mem::replace(&mut self.nodes[parent].keys[index - 1], lifted);
        let node = &mut self.nodes[child];
        node.keys.insert(0, separator);
        if let Some(grandchild) = moved {
            node.children.insert(0, grandchild);
        }
        trace!(separator, lifted, "btree borrow from left sibling");
    }

    fn borrow_from_right(&mut self, parent: NodeId, index: usize) {
        let (child, right) = {
            let node = &self.nodes[parent];
            (node.children[index], node.children[index + 1])
        };
        let lender = &mut self.nodes[right];
        let lifted = lender.keys.remove(0);
        let moved = if lender.leaf {
            None
        } else {
            Some(lender.children.remove(0))
        };
        let separator = mem::replace(&mut self.nodes[parent].keys[index], lifted);
        let node = &mut self.nodes[child];
        node.keys.push(separator);
        if let Some(grandchild) = moved {
            node.children.push(grandchild);
        }
        trace!(separator, lifted, "btree borrow from right sibling");
    }

    /// Folds the child at `index + 1` and their separator into the child
    /// at `index`, freeing the right node.
    fn merge_children(&mut self, parent: NodeId, index: usize) {
        let node = &mut self.nodes[parent];
        let separator = node.keys.remove(index);
        let left = node.children[index];
        let right = node.children.remove(index + 1);
        let absorbed = self
            .nodes
            .remove(right)
            .expect("merged sibling must be live");
        let node = &mut self.nodes[left];
        node.keys.push(separator);
        node.keys.extend(absorbed.keys);
        node.children.extend(absorbed.children);
        trace!(separator, keys = node.keys.len(), "btree merge");
    }

    fn collapse_root(&mut self) {
        let root = &self.nodes[self.root];
        if root.keys.is_empty() && !root.leaf {
            let child = root.children[0];
            self.nodes.remove(self.root);
            self.root = child;
            debug!(
                height = self.height(),
                nodes = self.nodes.len(),
                "btree root collapsed"
            );
        }
    }

    /// Walks the whole tree and reports the first broken structural rule.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        let mut walk = InvariantWalk {
            tree: self,
            leaf_depth: None,
            keys: 0,
            nodes: 0,
        };
        walk.visit(self.root, None, None, 0)?;
        if walk.keys != self.len {
            return Err(format!("len {} but {} keys stored", self.len, walk.keys));
        }
        if walk.nodes != self.nodes.len() {
            return Err(format!(
                "{} nodes reachable but {} allocated",
                walk.nodes,
                self.nodes.len()
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for BTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BTree")
            .field("degree", &self.config.degree)
            .field("len", &self.len)
            .field("num_nodes", &self.nodes.len())
            .finish()
    }
}

impl fmt::Display for BTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for key in self.iter() {
            write!(f, " {key}")?;
        }
        f.write_str(" ]")
    }
}

impl<'a> IntoIterator for &'a BTree {
    type Item = Key;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Ascending iterator over the keys of a `BTree`.
pub struct Iter<'a> {
    tree: &'a BTree,
    // (node, index of the next key to yield from it)
    stack: Vec<(NodeId, usize)>,
    remaining: usize,
}

impl<'a> Iter<'a> {
    fn new(tree: &'a BTree) -> Self {
        let mut it = Self {
            tree,
            stack: Vec::new(),
            remaining: tree.len,
        };
        it.push_leftmost(tree.root);
        it
    }

    fn push_leftmost(&mut self, mut id: NodeId) {
        loop {
            self.stack.push((id, 0));
            let node = &self.tree.nodes[id];
            if node.leaf {
                return;
            }
            id = node.children[0];
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = Key;

    fn next(&mut self) -> Option<Key> {
        let tree = self.tree;
        loop {
            let (id, pos) = *self.stack.last()?;
            let node = &tree.nodes[id];
            if pos < node.keys.len() {
                if let Some(top) = self.stack.last_mut() {
                    top.1 += 1;
                }
                if !node.leaf {
                    self.push_leftmost(node.children[pos + 1]);
                }
                self.remaining -= 1;
                return Some(node.keys[pos]);
            }
            self.stack.pop();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

#[cfg(test)]
struct InvariantWalk<'a> {
    tree: &'a BTree,
    leaf_depth: Option<usize>,
    keys: usize,
    nodes: usize,
}

#[cfg(test)]
impl InvariantWalk<'_> {
    fn visit(
        &mut self,
        id: NodeId,
        low: Option<Key>,
        high: Option<Key>,
        depth: usize,
    ) -> std::result::Result<(), String> {
        let node = self
            .tree
            .nodes
            .get(id)
            .ok_or_else(|| format!("dangling node reference at depth {depth}"))?;
        self.nodes += 1;
        self.keys += node.keys.len();

        let config = &self.tree.config;
        let is_root = id == self.tree.root;
        if node.keys.len() > config.max_keys() {
            return Err(format!("node holds {} keys", node.keys.len()));
        }
        if !is_root && node.keys.len() < config.min_keys() {
            return Err(format!("non-root node holds only {} keys", node.keys.len()));
        }
        if node.keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(format!("keys not strictly increasing: {:?}", node.keys));
        }
        if let (Some(low), Some(&first)) = (low, node.keys.first()) {
            if first <= low {
                return Err(format!("key {first} not above separator {low}"));
            }
        }
        if let (Some(high), Some(&last)) = (high, node.keys.last()) {
            if last >= high {
                return Err(format!("key {last} not below separator {high}"));
            }
        }

        if node.leaf {
            if !node.children.is_empty() {
                return Err("leaf carries children".to_string());
            }
            match self.leaf_depth {
                None => self.leaf_depth = Some(depth),
                Some(d) if d != depth => {
                    return Err(format!("leaves at depths {d} and {depth}"));
                }
                Some(_) => {}
            }
            return Ok(());
        }

        if node.keys.is_empty() {
            return Err("internal node without keys".to_string());
        }
        if node.children.len() != node.keys.len() + 1 {
            return Err(format!(
                "{} keys but {} children",
                node.keys.len(),
                node.children.len()
            ));
        }
        for (i, &child) in node.children.iter().enumerate() {
            let child_low = if i == 0 { low } else { Some(node.keys[i - 1]) };
            let child_high = node.keys.get(i).copied().or(high);
            self.visit(child, child_low, child_high, depth + 1)?;
        }
        Ok(())
    }
}
