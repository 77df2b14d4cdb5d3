#![warn(missing_debug_implementations, missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]

//! Minimal chain primitives consumed by the arbor transaction pool.
//!
//! This crate deliberately stays small: the legacy signed transaction shape,
//! its canonical RLP encoding and hash, and the header/fork types the pool
//! reads through its `Store` seam. Scalars are re-exported from
//! [`alloy_primitives`].

pub use alloy_primitives::{keccak256, Address, Bytes, B256, U256};

mod hardfork;
mod header;
mod transaction;

pub use hardfork::ForkFlags;
pub use header::Header;
pub use transaction::{Transaction, TX_MAX_SIZE, TX_SLOT_SIZE};
