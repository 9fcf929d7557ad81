use crate::{nibbles::Nibbles, node::Node, node_hash::NodeHash, PathRLP, Trie, ValueRLP};

pub struct TrieIterator {
    trie: Trie,
    // The stack contains the current traversed path and the next node to be traversed
    stack: Vec<(Nibbles, NodeHash)>,
}

impl TrieIterator {
    pub(crate) fn new(trie: Trie) -> Self {
        let stack = if let Some(root) = &trie.root {
            vec![(Nibbles::default(), root.clone())]
        } else {
            vec![]
        };
        Self { trie, stack }
    }
}

impl Iterator for TrieIterator {
    type Item = (Nibbles, Node);

    fn next(&mut self) -> Option<Self::Item> {
        if self.stack.is_empty() {
            return None;
        };
        // Fetch the last node in the stack
        let (current_path, next_node_hash) = self.stack.pop()?;
        let next_node = self.trie.state.get_node(next_node_hash).ok()??;
        let mut next_path = current_path.clone();
        match &next_node {
            Node::Branch(branch_node) => {
                // Add all children to the stack (in reverse order so we process first child frist)
                for (choice, child) in branch_node.choices.iter().enumerate().rev() {
                    if child.is_valid() {
                        let mut child_path = current_path.clone();
                        child_path.append(choice as u8);
                        self.stack.push((child_path, child.clone()))
                    }
                }
            }
            Node::Extension(extension_node) => {
                // Update path
                next_path.extend(&extension_node.prefix);
                // Add child to the stack
                self.stack
                    .push((next_path.clone(), extension_node.child.clone()));
            }
            Node::Leaf(leaf) => {
                next_path.extend(&leaf.partial);
            }
        }
        Some((next_path, next_node))
    }
}

impl TrieIterator {
    // TODO: construct path from nibbles
    pub fn content(self) -> impl Iterator<Item = (PathRLP, ValueRLP)> {
        self.filter_map(|(p, n)| match n {
            Node::Branch(branch_node) => {
                (!branch_node.value.is_empty()).then_some((p.to_bytes(), branch_node.value))
            }
            Node::Extension(_) => None,
            Node::Leaf(leaf_node) => Some((p.to_bytes(), leaf_node.value)),
        })
    }
}
