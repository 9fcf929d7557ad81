use ethereum_rust_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};

use crate::{
    error::TrieError, nibbles::Nibbles, node_hash::NodeHash, state::TrieState, NodeRLP, ValueRLP,
};

/// A branch node has 16 children (one for every possible nibble) plus a value,
/// which is only Some if some path terminates at this node (aka the path is a prefix of a leaf's path).
#[derive(Debug, Clone)]
pub struct BranchNode {
    pub choices: [NodeHash; 16],
    pub value: ValueRLP,
}

/// An extension node holds a shared prefix between several child paths and a single child
/// (a branch node, except in malformed tries).
#[derive(Debug, Clone)]
pub struct ExtensionNode {
    pub prefix: Nibbles,
    pub child: NodeHash,
}

/// A leaf node holds the remainder of a path along with the value stored at that path.
#[derive(Debug, Clone)]
pub struct LeafNode {
    pub partial: Nibbles,
    pub value: ValueRLP,
}

#[derive(Debug, Clone)]
pub enum Node {
    Branch(BranchNode),
    Extension(ExtensionNode),
    Leaf(LeafNode),
}

impl From<BranchNode> for Node {
    fn from(node: BranchNode) -> Self {
        Node::Branch(node)
    }
}

impl From<ExtensionNode> for Node {
    fn from(node: ExtensionNode) -> Self {
        Node::Extension(node)
    }
}

impl From<LeafNode> for Node {
    fn from(node: LeafNode) -> Self {
        Node::Leaf(node)
    }
}

fn empty_choices() -> [NodeHash; 16] {
    std::array::from_fn(|_| NodeHash::default())
}

impl BranchNode {
    pub fn new(choices: [NodeHash; 16], value: ValueRLP) -> Self {
        Self { choices, value }
    }

    pub fn encode_raw(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut encoder = Encoder::new(&mut buf);
        for choice in self.choices.iter() {
            encoder = encoder.encode_field(choice);
        }
        encoder = encoder.encode_field(&self.value);
        encoder.finish();
        buf
    }
}

impl ExtensionNode {
    pub fn new(prefix: Nibbles, child: NodeHash) -> Self {
        Self { prefix, child }
    }

    pub fn encode_raw(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        Encoder::new(&mut buf)
            .encode_field(&self.prefix.encode_compact())
            .encode_field(&self.child)
            .finish();
        buf
    }
}

impl LeafNode {
    pub fn new(partial: Nibbles, value: ValueRLP) -> Self {
        Self { partial, value }
    }

    pub fn encode_raw(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        Encoder::new(&mut buf)
            .encode_field(&self.partial.encode_compact())
            .encode_field(&self.value)
            .finish();
        buf
    }
}

impl Node {
    /// Retrieves the value stored at `path`, recursing through the trie as needed.
    pub fn get(&self, state: &TrieState, mut path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        match self {
            Node::Branch(n) => match path.next_choice() {
                Some(choice) => {
                    let child_hash = &n.choices[choice];
                    if !child_hash.is_valid() {
                        return Ok(None);
                    }
                    let child = state
                        .get_node(child_hash.clone())?
                        .ok_or(TrieError::InconsistentTree)?;
                    child.get(state, path)
                }
                None => Ok((!n.value.is_empty()).then(|| n.value.clone())),
            },
            Node::Extension(n) => {
                if path.skip_prefix(&n.prefix) && n.child.is_valid() {
                    let child = state
                        .get_node(n.child.clone())?
                        .ok_or(TrieError::InconsistentTree)?;
                    child.get(state, path)
                } else {
                    Ok(None)
                }
            }
            Node::Leaf(n) => Ok((path == n.partial).then(|| n.value.clone())),
        }
    }

    /// Inserts `value` at `path`, returning the (possibly restructured) node that replaces `self`.
    /// Children created as part of the restructuring are written into `state` immediately.
    pub fn insert(
        self,
        state: &mut TrieState,
        mut path: Nibbles,
        value: ValueRLP,
    ) -> Result<Node, TrieError> {
        match self {
            Node::Branch(mut n) => {
                match path.next_choice() {
                    Some(choice) => {
                        let child_hash = &n.choices[choice];
                        let child_hash = if child_hash.is_valid() {
                            let child = state
                                .get_node(child_hash.clone())?
                                .ok_or(TrieError::InconsistentTree)?;
                            child.insert(state, path, value)?.insert_self(state)?
                        } else {
                            Node::from(LeafNode::new(path, value)).insert_self(state)?
                        };
                        n.choices[choice] = child_hash;
                    }
                    None => n.value = value,
                }
                Ok(Node::Branch(n))
            }
            Node::Extension(n) => {
                if path.skip_prefix(&n.prefix) {
                    let child = state
                        .get_node(n.child.clone())?
                        .ok_or(TrieError::InconsistentTree)?;
                    let child_hash = child.insert(state, path, value)?.insert_self(state)?;
                    Ok(Node::Extension(ExtensionNode::new(n.prefix, child_hash)))
                } else {
                    let old_child = n.child.clone();
                    split_shared_prefix(
                        state,
                        n.prefix,
                        move |rest| Node::from(ExtensionNode::new(rest, old_child)),
                        n.child,
                        path,
                        value,
                    )
                }
            }
            Node::Leaf(n) => {
                if path == n.partial {
                    Ok(Node::Leaf(LeafNode::new(path, value)))
                } else {
                    let old_value = n.value.clone();
                    split_shared_prefix(
                        state,
                        n.partial,
                        move |rest| Node::from(LeafNode::new(rest, old_value)),
                        NodeHash::default(),
                        path,
                        value,
                    )
                }
            }
        }
    }

    /// Removes the value stored at `path` (if any), returning the node that should replace `self`
    /// (`None` if the subtrie became empty) along with the removed value.
    pub fn remove(
        self,
        state: &mut TrieState,
        mut path: Nibbles,
    ) -> Result<(Option<Node>, Option<ValueRLP>), TrieError> {
        match self {
            Node::Branch(mut n) => match path.next_choice() {
                Some(choice) => {
                    let child_hash = &n.choices[choice];
                    if !child_hash.is_valid() {
                        return Ok((Some(Node::Branch(n)), None));
                    }
                    let child = state
                        .get_node(child_hash.clone())?
                        .ok_or(TrieError::InconsistentTree)?;
                    let (new_child, removed) = child.remove(state, path)?;
                    n.choices[choice] = match new_child {
                        Some(new_child) => new_child.insert_self(state)?,
                        None => NodeHash::default(),
                    };
                    Ok((Some(compact_branch(n, state)?), removed))
                }
                None => {
                    let removed = (!n.value.is_empty()).then(|| std::mem::take(&mut n.value));
                    Ok((Some(compact_branch(n, state)?), removed))
                }
            },
            Node::Extension(n) => {
                if path.skip_prefix(&n.prefix) {
                    let child = state
                        .get_node(n.child.clone())?
                        .ok_or(TrieError::InconsistentTree)?;
                    let (new_child, removed) = child.remove(state, path)?;
                    match new_child {
                        Some(new_child) => {
                            Ok((Some(merge_extension(n.prefix, new_child, state)?), removed))
                        }
                        None => Ok((None, removed)),
                    }
                } else {
                    Ok((Some(Node::Extension(n)), None))
                }
            }
            Node::Leaf(n) => {
                if path == n.partial {
                    Ok((None, Some(n.value)))
                } else {
                    Ok((Some(Node::Leaf(n)), None))
                }
            }
        }
    }

    /// Writes the node into `state` under its own hash and returns that hash.
    pub fn insert_self(self, state: &mut TrieState) -> Result<NodeHash, TrieError> {
        let hash = NodeHash::from_encoded_raw(self.encode_raw());
        state.insert_node(self, hash.clone());
        Ok(hash)
    }

    pub fn encode_raw(&self) -> Vec<u8> {
        match self {
            Node::Branch(n) => n.encode_raw(),
            Node::Extension(n) => n.encode_raw(),
            Node::Leaf(n) => n.encode_raw(),
        }
    }

    /// Decodes a standalone encoded node (as found in a merkle proof or the node DB).
    pub fn decode_raw(rlp: &[u8]) -> Result<Node, TrieError> {
        let mut decoder = Decoder::new(rlp).map_err(TrieError::RLPDecode)?;
        let mut items = Vec::new();
        while !decoder.is_done() {
            let (item, rest) = decoder.get_encoded_item().map_err(TrieError::RLPDecode)?;
            items.push(item);
            decoder = rest;
        }
        match items.len() {
            17 => {
                let mut choices = empty_choices();
                for (choice, item) in choices.iter_mut().zip(items[..16].iter()) {
                    *choice = NodeHash::decode(item).map_err(TrieError::RLPDecode)?;
                }
                let value = ValueRLP::decode(&items[16]).map_err(TrieError::RLPDecode)?;
                Ok(Node::Branch(BranchNode::new(choices, value)))
            }
            2 => {
                let compact =
                    <Vec<u8> as RLPDecode>::decode(&items[0]).map_err(TrieError::RLPDecode)?;
                if compact.is_empty() {
                    return Err(TrieError::RLPDecode(RLPDecodeError::MalformedData));
                }
                let is_leaf = compact[0] & 0x20 != 0;
                let prefix = Nibbles::decode_compact(&compact);
                if is_leaf {
                    let value = ValueRLP::decode(&items[1]).map_err(TrieError::RLPDecode)?;
                    Ok(Node::Leaf(LeafNode::new(prefix, value)))
                } else {
                    let child = NodeHash::decode(&items[1]).map_err(TrieError::RLPDecode)?;
                    Ok(Node::Extension(ExtensionNode::new(prefix, child)))
                }
            }
            _ => Err(TrieError::RLPDecode(RLPDecodeError::MalformedData)),
        }
    }

    /// Appends every node traversed on the way to `path` (including `self`) to `node_path`.
    pub fn get_path(
        &self,
        state: &TrieState,
        mut path: Nibbles,
        node_path: &mut Vec<NodeRLP>,
    ) -> Result<(), TrieError> {
        node_path.push(self.encode_raw());
        match self {
            Node::Branch(n) => {
                if let Some(choice) = path.next_choice() {
                    let child_hash = &n.choices[choice];
                    if child_hash.is_valid() {
                        let child = state
                            .get_node(child_hash.clone())?
                            .ok_or(TrieError::InconsistentTree)?;
                        child.get_path(state, path, node_path)?;
                    }
                }
            }
            Node::Extension(n) => {
                if path.skip_prefix(&n.prefix) && n.child.is_valid() {
                    let child = state
                        .get_node(n.child.clone())?
                        .ok_or(TrieError::InconsistentTree)?;
                    child.get_path(state, path, node_path)?;
                }
            }
            Node::Leaf(_) => {}
        }
        Ok(())
    }
}

/// Shared logic for inserting a value that diverges from an existing extension's (or leaf's)
/// shared prefix: splits off a branch node at the point of divergence, wrapping it in an
/// extension node if some prefix nibbles are still shared by both sides.
fn split_shared_prefix(
    state: &mut TrieState,
    shared_prefix: Nibbles,
    rebuild_old_child: impl FnOnce(Nibbles) -> Node,
    old_child_hash_if_empty_rest: NodeHash,
    path: Nibbles,
    value: ValueRLP,
) -> Result<Node, TrieError> {
    let match_index = path.count_prefix(&shared_prefix);
    let mut choices = empty_choices();

    if match_index < shared_prefix.len() {
        let old_choice = shared_prefix.at(match_index);
        let old_rest = shared_prefix.offset(match_index + 1);
        choices[old_choice] = if old_rest.is_empty() {
            old_child_hash_if_empty_rest
        } else {
            rebuild_old_child(old_rest).insert_self(state)?
        };
    }

    let branch_value = if match_index < path.len() {
        let new_choice = path.at(match_index);
        let new_rest = path.offset(match_index + 1);
        choices[new_choice] = Node::from(LeafNode::new(new_rest, value)).insert_self(state)?;
        Vec::new()
    } else {
        value
    };

    let branch = BranchNode::new(choices, branch_value);
    if match_index == 0 {
        Ok(Node::Branch(branch))
    } else {
        let branch_hash = Node::Branch(branch).insert_self(state)?;
        Ok(Node::Extension(ExtensionNode::new(
            path.slice(0, match_index),
            branch_hash,
        )))
    }
}

/// After a removal, a branch left with a single child and no value is not a valid MPT shape:
/// collapse it into that child, prepending the branch's choice nibble to the child's path.
fn compact_branch(n: BranchNode, state: &mut TrieState) -> Result<Node, TrieError> {
    if !n.value.is_empty() {
        return Ok(Node::Branch(n));
    }
    let mut live = n.choices.iter().enumerate().filter(|(_, c)| c.is_valid());
    let Some((only_choice, only_hash)) = live.next() else {
        return Ok(Node::Branch(n));
    };
    if live.next().is_some() {
        return Ok(Node::Branch(n));
    }
    let only_choice = only_choice as u8;
    let only_hash = only_hash.clone();
    let child = state
        .get_node(only_hash.clone())?
        .ok_or(TrieError::InconsistentTree)?;
    match child {
        Node::Leaf(mut leaf) => {
            leaf.partial.prepend(only_choice);
            Ok(Node::Leaf(leaf))
        }
        Node::Extension(mut ext) => {
            ext.prefix.prepend(only_choice);
            Ok(Node::Extension(ext))
        }
        Node::Branch(_) => Ok(Node::Extension(ExtensionNode::new(
            Nibbles::from_hex(vec![only_choice]),
            only_hash,
        ))),
    }
}

/// Merges an extension node with its (possibly restructured) child, collapsing two
/// chained extensions into one.
fn merge_extension(prefix: Nibbles, child: Node, state: &mut TrieState) -> Result<Node, TrieError> {
    match child {
        Node::Extension(child_ext) => {
            let mut merged_prefix = prefix;
            merged_prefix.extend(&child_ext.prefix);
            Ok(Node::Extension(ExtensionNode::new(
                merged_prefix,
                child_ext.child,
            )))
        }
        Node::Leaf(mut leaf) => {
            let mut merged_prefix = prefix;
            merged_prefix.extend(&leaf.partial);
            leaf.partial = merged_prefix;
            Ok(Node::Leaf(leaf))
        }
        branch @ Node::Branch(_) => {
            let child_hash = branch.insert_self(state)?;
            Ok(Node::Extension(ExtensionNode::new(prefix, child_hash)))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Trie;

    #[test]
    fn branch_get_insert() {
        let mut trie = Trie::new_temp();
        trie.insert(vec![0x12], vec![1]).unwrap();
        trie.insert(vec![0x13], vec![2]).unwrap();
        assert_eq!(trie.get(&vec![0x12]).unwrap(), Some(vec![1]));
        assert_eq!(trie.get(&vec![0x13]).unwrap(), Some(vec![2]));
        assert_eq!(trie.get(&vec![0x14]).unwrap(), None);
    }

    #[test]
    fn leaf_split_on_insert() {
        let mut trie = Trie::new_temp();
        trie.insert(vec![0xAA], vec![1]).unwrap();
        trie.insert(vec![0xAB], vec![2]).unwrap();
        trie.insert(vec![0xBB], vec![3]).unwrap();
        assert_eq!(trie.get(&vec![0xAA]).unwrap(), Some(vec![1]));
        assert_eq!(trie.get(&vec![0xAB]).unwrap(), Some(vec![2]));
        assert_eq!(trie.get(&vec![0xBB]).unwrap(), Some(vec![3]));
    }

    #[test]
    fn remove_restores_absence() {
        let mut trie = Trie::new_temp();
        trie.insert(vec![0x12], vec![1]).unwrap();
        trie.insert(vec![0x13], vec![2]).unwrap();
        assert_eq!(trie.remove(vec![0x12]).unwrap(), Some(vec![1]));
        assert_eq!(trie.get(&vec![0x12]).unwrap(), None);
        assert_eq!(trie.get(&vec![0x13]).unwrap(), Some(vec![2]));
    }

    #[test]
    fn encode_decode_roundtrip_leaf() {
        let leaf = Node::from(LeafNode::new(Nibbles::from_bytes(&[0xAB]), vec![1, 2, 3]));
        let encoded = leaf.encode_raw();
        let decoded = Node::decode_raw(&encoded).unwrap();
        match decoded {
            Node::Leaf(n) => {
                assert_eq!(n.value, vec![1, 2, 3]);
            }
            _ => panic!("expected leaf"),
        }
    }
}
