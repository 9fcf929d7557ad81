//! `ethereum_rust-net`: the peer-facing half of snap-sync.
//!
//! This crate owns the wire contracts for the four `snap/1` request/response pairs
//! (`protocol.rs`), the per-peer transport built on top of them (`peer_channels.rs`), the
//! snap-sync core (`snap_sync/`), and the coordinator that drives it all (`sync.rs`). The
//! underlying RLPx transport, discv4/Kademlia peer discovery, and the EVM/blockchain execution
//! path are external collaborators and live outside this crate.

pub mod peer_channels;
pub mod protocol;
pub mod snap_sync;
pub mod sync;
