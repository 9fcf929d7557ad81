//! Key-space operations on a hexary trie that look past single key lookups: the envelope of
//! leaf keys reachable under a path, a cooperative resumable scan for dangling children, and
//! a standalone node importer that checks a fetched blob against the hash it was asked for.
//!
//! These are the primitives a range-sync engine needs and a general-purpose trie does not:
//! `Trie::get`/`insert`/`remove` never have to reason about "everything below this path" or
//! "stop after N nodes and let me resume later".

use ethereum_types::{H256, U256};

use crate::{
    interval_set::{NodeTag, NodeTagRange, NodeTagRangeSet},
    nibbles::Nibbles,
    node::Node,
    node_hash::NodeHash,
    state::TrieState,
    TrieError,
};

/// A node a caller still needs to fetch: where it sits in the trie and the hash it must hash to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpecs {
    pub partial_path: Nibbles,
    pub node_hash: NodeHash,
}

/// A resumable cursor into an in-progress [`hexary_inspect_trie`] scan. Opaque to callers:
/// it's only ever handed back in on the next call.
#[derive(Debug, Clone, Default)]
pub struct ResumeCtx {
    stack: Vec<(Nibbles, NodeHash)>,
}

/// Outcome of one `hexary_inspect_trie` batch.
#[derive(Debug, Default)]
pub struct InspectResult {
    /// Child references the scan walked into that aren't present in the node DB.
    pub dangling: Vec<NodeSpecs>,
    /// Full 32-byte keys of every leaf the scan walked all the way down to.
    pub leaves: Vec<H256>,
    /// `Some` if the batch limit was hit before the scan ran dry; feed it back in to continue.
    pub resume_ctx: Option<ResumeCtx>,
    /// True exactly when `resume_ctx` is `Some`.
    pub stopped: bool,
}

/// The range of leaf keys reachable through a node at `path`, assuming every nibble below
/// `path` ranges freely over `0x0..=0xf`. This is a property of the path alone, not of what's
/// actually stored there: it's the widest possible envelope, used to bound how much of the key
/// space a not-yet-fetched sub-trie could possibly cover.
pub fn hexary_envelope(path: &Nibbles) -> NodeTagRange {
    let mut nibbles: Vec<u8> = path.as_ref().to_vec();
    if nibbles.last() == Some(&16) {
        nibbles.pop();
    }
    let mut lo = nibbles.clone();
    let mut hi = nibbles;
    while lo.len() < 64 {
        lo.push(0x0);
        hi.push(0xf);
    }
    NodeTagRange::new(nibbles_to_tag(&lo), nibbles_to_tag(&hi))
}

fn nibbles_to_tag(nibbles: &[u8]) -> NodeTag {
    let mut bytes = [0u8; 32];
    for (i, chunk) in nibbles.chunks(2).enumerate() {
        let hi = chunk[0];
        let lo = chunk.get(1).copied().unwrap_or(0);
        bytes[i] = (hi << 4) | lo;
    }
    U256::from_big_endian(&bytes)
}

/// Walks down from `root` following `path` nibble by nibble, returning the node sitting at the
/// end of it along with the exact prefix consumed to get there (which may be shorter than
/// `path` if an extension node's prefix only partially overlaps, in which case `None` is
/// returned: `path` doesn't land on a node boundary).
fn locate_node(
    state: &TrieState,
    root: NodeHash,
    path: &Nibbles,
) -> Result<Option<(Nibbles, NodeHash)>, TrieError> {
    let mut current = root;
    let mut remaining = path.clone();
    let mut consumed = Nibbles::from_hex(Vec::new());
    loop {
        if remaining.is_empty() {
            return Ok(Some((consumed, current)));
        }
        let Some(node) = state.get_node(current.clone())? else {
            return Ok(None);
        };
        match node {
            Node::Branch(b) => {
                let Some(choice) = remaining.clone().next_choice() else {
                    return Ok(None);
                };
                let child = b.choices[choice].clone();
                if !child.is_valid() {
                    return Ok(None);
                }
                consumed = consumed.append_new(choice as u8);
                remaining = remaining.offset(1);
                current = child;
            }
            Node::Extension(e) => {
                let mut rest = remaining.clone();
                if !rest.skip_prefix(&e.prefix) {
                    return Ok(None);
                }
                consumed = consumed.concat(e.prefix.clone());
                remaining = rest;
                current = e.child.clone();
            }
            Node::Leaf(_) => return Ok(None),
        }
    }
}

/// Cooperative, resumable, cycle-detecting DFS over the nodes reachable from `root` starting at
/// each path in `check_paths` (or from `root` itself, if `check_paths` is empty and this is the
/// first call). Stops after visiting `batch_limit` nodes and hands back a [`ResumeCtx`] that
/// continues the exact same traversal on the next call.
///
/// A child reference is "dangling" when it hashes to something [`TrieState::get_node`] doesn't
/// have; this is the healer's trigger to go fetch it. A path longer than 64 nibbles (the whole
/// key space) can only happen if the node graph loops back on itself, which is reported as
/// [`TrieError::TrieLoopAlert`] rather than looping forever.
pub fn hexary_inspect_trie(
    state: &TrieState,
    root: Option<NodeHash>,
    check_paths: &[Nibbles],
    resume_ctx: Option<ResumeCtx>,
    batch_limit: usize,
) -> Result<InspectResult, TrieError> {
    let mut stack = if let Some(ctx) = resume_ctx {
        ctx.stack
    } else {
        let Some(root) = root else {
            return Ok(InspectResult::default());
        };
        let mut seed = Vec::with_capacity(check_paths.len().max(1));
        if check_paths.is_empty() {
            seed.push((Nibbles::from_hex(Vec::new()), root));
        } else {
            for path in check_paths {
                if let Some(entry) = locate_node(state, root.clone(), path)? {
                    seed.push(entry);
                }
            }
        }
        seed
    };

    let mut dangling = Vec::new();
    let mut leaves = Vec::new();
    let mut visited = 0usize;

    while let Some((path, node_hash)) = stack.pop() {
        if visited >= batch_limit {
            stack.push((path, node_hash));
            return Ok(InspectResult {
                dangling,
                leaves,
                resume_ctx: Some(ResumeCtx { stack }),
                stopped: true,
            });
        }
        if path.len() > 64 {
            return Err(TrieError::TrieLoopAlert);
        }
        visited += 1;

        let Some(node) = state.get_node(node_hash.clone())? else {
            dangling.push(NodeSpecs {
                partial_path: path,
                node_hash,
            });
            continue;
        };

        match node {
            Node::Branch(b) => {
                for (choice, child) in b.choices.iter().enumerate() {
                    if child.is_valid() {
                        stack.push((path.append_new(choice as u8), child.clone()));
                    }
                }
                if !b.value.is_empty() && path.len() == 64 {
                    leaves.push(H256::from_slice(&path.to_bytes()));
                }
            }
            Node::Extension(e) => {
                if e.child.is_valid() {
                    stack.push((path.concat(e.prefix.clone()), e.child.clone()));
                }
            }
            Node::Leaf(l) => {
                let full_path = path.concat(l.partial.clone());
                let key = full_path.to_bytes();
                if key.len() == 32 {
                    leaves.push(H256::from_slice(&key));
                }
            }
        }
    }

    Ok(InspectResult {
        dangling,
        leaves,
        resume_ctx: None,
        stopped: false,
    })
}

/// Finds the minimal set of sub-trie roots, rooted at or below `path`, whose envelopes tile
/// `hexary_envelope(path)` minus whatever `iv` already marks as covered. Used to turn "this
/// range batch came back covering less than I asked for" into the specific set of nodes a
/// healer or scheduler still needs to chase.
pub fn hexary_envelope_decompose(
    state: &TrieState,
    root: NodeHash,
    path: &Nibbles,
    iv: &NodeTagRangeSet,
) -> Result<Vec<NodeSpecs>, TrieError> {
    let mut out = Vec::new();
    decompose_rec(state, root, path.clone(), iv, &mut out)?;
    Ok(out)
}

fn decompose_rec(
    state: &TrieState,
    node_hash: NodeHash,
    path: Nibbles,
    iv: &NodeTagRangeSet,
    out: &mut Vec<NodeSpecs>,
) -> Result<(), TrieError> {
    let env = hexary_envelope(&path);
    if iv.covered(env) == env.len() {
        return Ok(());
    }
    let Some(node) = state.get_node(node_hash.clone())? else {
        out.push(NodeSpecs {
            partial_path: path,
            node_hash,
        });
        return Ok(());
    };
    match node {
        Node::Branch(b) => {
            let mut any_child = false;
            for (choice, child) in b.choices.iter().enumerate() {
                if child.is_valid() {
                    any_child = true;
                    decompose_rec(state, child.clone(), path.append_new(choice as u8), iv, out)?;
                }
            }
            if !any_child {
                out.push(NodeSpecs {
                    partial_path: path,
                    node_hash,
                });
            }
        }
        Node::Extension(e) => {
            decompose_rec(state, e.child.clone(), path.concat(e.prefix.clone()), iv, out)?;
        }
        Node::Leaf(_) => out.push(NodeSpecs {
            partial_path: path,
            node_hash,
        }),
    }
    Ok(())
}

/// Parses a standalone node blob and verifies it hashes to `expected` before handing it back.
/// This is the gate every node fetched from a peer goes through: an unverified blob never
/// reaches [`TrieState::insert_node`].
pub fn hexary_import(expected: &NodeHash, blob: &[u8]) -> Result<Node, TrieError> {
    let actual = NodeHash::from_encoded_raw(blob.to_vec());
    if &actual != expected {
        return Err(TrieError::Verify(format!(
            "node hash mismatch: expected {expected:?}, got {actual:?}"
        )));
    }
    Node::decode_raw(blob)
}
