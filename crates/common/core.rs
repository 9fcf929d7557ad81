pub use ethereum_types::{Address, Bloom, H256, H32, H512, U256};
pub use bytes::Bytes;

pub mod serde_utils;
pub mod types;
