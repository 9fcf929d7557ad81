use crate::dumb_nibbles::DumbNibbles;
use crate::error::TrieError;
use crate::nibble::NibbleVec;
use crate::node_hash::{NodeEncoder, NodeHash, PathKind};
use crate::state::TrieState;
use crate::ValueRLP;

use super::{BranchNode, Node};

/// Extension Node of an an Ethereum Compatible Patricia Merkle Trie
/// Contains the node's prefix and a its child node hash, doesn't store any value
#[derive(Debug, Clone)]
pub struct ExtensionNode {
    pub prefix: DumbNibbles,
    pub child: NodeHash,
}

impl ExtensionNode {
    /// Creates a new extension node given its child hash and prefix
    pub(crate) fn new(prefix: DumbNibbles, child: NodeHash) -> Self {
        Self { prefix, child }
    }

    /// Retrieves a value from the subtrie originating from this node given its path
    pub fn get(
        &self,
        state: &TrieState,
        mut path: DumbNibbles,
    ) -> Result<Option<ValueRLP>, TrieError> {
        // If the path is prefixed by this node's prefix, delegate to its child.
        // Otherwise, no value is present.
        if path.skip_prefix(&self.prefix) {
            let child_node = state
                .get_node(self.child.clone())?
                .expect("inconsistent internal tree structure");

            child_node.get(state, path)
        } else {
            Ok(None)
        }
    }

    /// Inserts a value into the subtrie originating from this node and returns the new root of the subtrie
    /// TODO: Code changed a lot, check and rewrite doc
    pub fn insert(
        mut self,
        state: &mut TrieState,
        path: DumbNibbles,
        value: ValueRLP,
    ) -> Result<Node, TrieError> {
        // OUTDATED
        /* Possible flow paths (there are duplicates between different prefix lengths):
            Extension { prefix, child } -> Extension { prefix , child' } (insert into child)
            Extension { prefixL+C+prefixR, child } -> Extension { prefixL, Branch { [ Extension { prefixR, child }, ..], Path, Value} } (if path fully traversed)
            Extension { prefixL+C+prefixR, child } -> Extension { prefixL, Branch { [ Extension { prefixR, child }, Leaf { Path, Value }..] None, None} } (if path not fully traversed)
            Extension { prefixL+C+None, child } -> Extension { prefixL, Branch { [child, ... ], Path, Value} } (if path fully traversed)
            Extension { prefixL+C+None, child } -> Extension { prefixL, Branch { [child, ... ], Leaf { Path, Value }, ... }, None, None } (if path not fully traversed)
            Extension { None+C+prefixR } -> Branch { [ Extension { prefixR, child } , ..], Path, Value} (if path fully traversed)
            Extension { None+C+prefixR } -> Branch { [ Extension { prefixR, child } , Leaf { Path, Value } , ... ], None, None} (if path not fully traversed)
        */
        let match_index = path.count_prefix(&self.prefix);
        if match_index == self.prefix.len() {
            // Insert into child node
            let child_node = state
                .get_node(self.child)?
                .expect("inconsistent internal tree structure");
            let new_child_node =
                child_node.insert(state, path.offset(match_index), value.clone())?;
            self.child = new_child_node.insert_self(state)?;
            Ok(self.into())
        } else if match_index == 0 {
            let new_node = if self.prefix.len() == 1 {
                self.child
            } else {
                ExtensionNode::new(self.prefix.offset(1), self.child).insert_self(state)?
            };
            let mut choices = BranchNode::EMPTY_CHOICES;
            let branch_node = if self.prefix.at(0) == 16 {
                match state.get_node(new_node)? {
                    Some(Node::Leaf(leaf)) => {
                        BranchNode::new_with_value(Box::new(choices), leaf.value)
                    }
                    _ => panic!("inconsistent internal tree structure"),
                }
            } else {
                choices[self.prefix.at(0)] = new_node;
                BranchNode::new(Box::new(choices))
            };
            return branch_node.insert(state, path, value);
        } else {
            let new_extension = ExtensionNode::new(self.prefix.offset(match_index), self.child);
            let new_node = new_extension.insert(state, path.offset(match_index), value)?;
            self.prefix = self.prefix.slice(0, match_index);
            self.child = new_node.insert_self(state)?;
            Ok(self.into())
        }
    }

    pub fn remove(
        mut self,
        state: &mut TrieState,
        mut path: DumbNibbles,
    ) -> Result<(Option<Node>, Option<ValueRLP>), TrieError> {
        /* Possible flow paths:
            Extension { prefix, child } -> Extension { prefix, child } (no removal)
            Extension { prefix, child } -> None (If child.remove = None)
            Extension { prefix, child } -> Extension { prefix, ChildBranch } (if child.remove = Branch)
            Extension { prefix, child } -> ChildExtension { SelfPrefix+ChildPrefix, ChildExtensionChild } (if child.remove = Extension)
            Extension { prefix, child } -> ChildLeaf (if child.remove = Leaf)
        */

        // Check if the value is part of the child subtrie according to the prefix
        if path.skip_prefix(&self.prefix) {
            let child_node = state
                .get_node(self.child)?
                .expect("inconsistent internal tree structure");
            // Remove value from child subtrie
            let (child_node, old_value) =
                child_node.remove(state, path.offset(self.prefix.len()))?;
            // Restructure node based on removal
            let node = match child_node {
                // If there is no subtrie remove the node
                None => None,
                Some(node) => Some(match node {
                    // If it is a branch node set it as self's child
                    Node::Branch(branch_node) => {
                        self.child = branch_node.insert_self(state)?;
                        self.into()
                    }
                    // If it is an extension replace self with it after updating its prefix
                    Node::Extension(mut extension_node) => {
                        self.prefix.extend(&extension_node.prefix);
                        extension_node.prefix = self.prefix;
                        extension_node.into()
                    }
                    // If it is a leaf node replace self with it
                    Node::Leaf(leaf_node) => leaf_node.into(),
                }),
            };

            Ok((node, old_value))
        } else {
            Ok((Some(self.into()), None))
        }
    }

    /// Computes the node's hash
    pub fn compute_hash(&self) -> NodeHash {
        NodeHash::from_encoded_raw(self.encode_raw())
    }

    /// Encodes the node
    pub fn encode_raw(&self) -> Vec<u8> {
        let child_hash = &self.child;
        let prefix_len = NodeEncoder::path_len(self.prefix.len());
        let child_len = match child_hash {
            NodeHash::Inline(ref x) => x.len(),
            NodeHash::Hashed(x) => NodeEncoder::bytes_len(32, x[0]),
        };

        let mut encoder = NodeEncoder::new();
        encoder.write_list_header(prefix_len + child_len);
        encoder.write_path_slice(&self.prefix);
        match child_hash {
            NodeHash::Inline(x) => {
                encoder.write_raw(x);
            }
            NodeHash::Hashed(x) => {
                encoder.write_bytes(&x.0);
            }
        }
        encoder.finalize()
    }

    /// Inserts the node into the state and returns its hash
    pub fn insert_self(self, state: &mut TrieState) -> Result<NodeHash, TrieError> {
        let hash = self.compute_hash();
        state.insert_node(self.into(), hash.clone());
        Ok(hash)
    }

    /// Traverses own subtrie until reaching the node containing `path`
    /// Appends all encoded nodes traversed to `node_path` (including self)
    /// Only nodes with encoded len over or equal to 32 bytes are included
    pub fn get_path(
        &self,
        state: &TrieState,
        mut path: DumbNibbles,
        node_path: &mut Vec<Vec<u8>>,
    ) -> Result<(), TrieError> {
        // Add self to node_path (if not inlined in parent)
        let encoded = self.encode_raw();
        if encoded.len() >= 32 {
            node_path.push(encoded);
        };
        // Continue to child
        if path.skip_prefix(&self.prefix) {
            let child_node = state
                .get_node(self.child.clone())?
                .expect("inconsistent internal tree structure");
            child_node.get_path(state, path, node_path)?;
        }
        Ok(())
    }
}
