use std::collections::HashMap;

use crate::error::TrieError;

use super::{db::TrieDB, node::Node, node_hash::NodeHash};

/// Holds the trie's nodes while they are being built up, and hands them off to a pluggable
/// flat key-value `TrieDB` once the tree is rooted and `commit` is called.
///
/// Nodes are kept in an in-memory cache (keyed by their own hash) until committed so that a
/// chain of inserts into the same sub-tree doesn't round-trip through the DB for every write.
pub struct TrieState {
    db: Box<dyn TrieDB>,
    cache: HashMap<NodeHash, Node>,
}

impl TrieState {
    pub fn new(db: Box<dyn TrieDB>) -> Self {
        Self {
            db,
            cache: HashMap::new(),
        }
    }

    /// Retrieves a node given its hash, checking the write-back cache first.
    pub fn get_node(&self, hash: NodeHash) -> Result<Option<Node>, TrieError> {
        if let Some(node) = self.cache.get(&hash) {
            return Ok(Some(node.clone()));
        }
        self.db
            .get(hash.into())?
            .map(|rlp| Node::decode_raw(&rlp))
            .transpose()
    }

    /// Stashes a node under its hash; not persisted until `commit` walks down from the root.
    pub fn insert_node(&mut self, node: Node, hash: NodeHash) {
        self.cache.insert(hash, node);
    }

    /// Same as `insert_node`, provided for callers that already computed the node's own hash
    /// and want the write to read as "write this node", not "cache it".
    pub fn write_node(&mut self, node: Node, hash: NodeHash) {
        self.insert_node(node, hash)
    }

    /// Writes an already hash-verified node blob straight to the backing DB, keyed by its own
    /// hash. Used by snap-sync's node import: the blob arrived standalone (not as part of a
    /// chain rooted at the trie's current root), so there is nothing for `commit` to walk.
    pub fn write_node_raw(&mut self, hash: NodeHash, blob: Vec<u8>) -> Result<(), TrieError> {
        self.db.put(hash.into(), blob)
    }

    /// Looks a node blob up directly in the backing DB by hash, bypassing the write-back cache.
    /// This is the flat `getFn(key) -> blob` contract snap-sync's node database interface
    /// exposes to callers that only have a hash, not a path from some trie's root.
    pub fn get_node_raw(&self, hash: NodeHash) -> Result<Option<Vec<u8>>, TrieError> {
        self.db.get(hash.into())
    }

    /// Flushes every cached node reachable from `root` into the underlying DB, then clears
    /// the cache. Nodes that never got linked into the committed root are simply dropped.
    pub fn commit(&mut self, root: &NodeHash) -> Result<(), TrieError> {
        self.commit_node(root)?;
        self.cache.clear();
        Ok(())
    }

    fn commit_node(&mut self, node_hash: &NodeHash) -> Result<(), TrieError> {
        let Some(node) = self.cache.remove(node_hash) else {
            // Already committed (shared sub-trie) or references an unmodified node already in the DB.
            return Ok(());
        };
        match &node {
            Node::Branch(n) => {
                for child in n.choices.iter() {
                    if child.is_valid() {
                        self.commit_node(child)?;
                    }
                }
            }
            Node::Extension(n) => {
                if n.child.is_valid() {
                    self.commit_node(&n.child)?;
                }
            }
            Node::Leaf(_) => {}
        }
        self.db.put(node_hash.clone().into(), node.encode_raw())
    }
}
