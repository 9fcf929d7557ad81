mod account;
mod blobs_bundle;
mod block;
mod constants;
mod fork_id;
mod genesis;
mod receipt;
pub mod transaction;

pub use account::*;
pub use blobs_bundle::*;
pub use block::*;
pub use constants::*;
pub use fork_id::*;
pub use genesis::*;
pub use receipt::*;
pub use transaction::*;
