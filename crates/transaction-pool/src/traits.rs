//! Contracts the pool consumes from the rest of the node.

use arbor_primitives::{Address, ForkFlags, Header, Transaction, U256};

/// Where a transaction entered the pool from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxOrigin {
    /// Submitted through this node's RPC.
    Local,
    /// Relayed by another node.
    Remote,
    /// Received over the gossip topic.
    Gossip,
}

impl TxOrigin {
    /// Whether the transaction was submitted locally.
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

/// Error returned by [`Store`] reads.
#[derive(Debug, Clone, thiserror::Error)]
#[error("state unavailable: {0}")]
pub struct StoreError(pub String);

/// Read access to committed chain state.
///
/// The pool only ever reads through this seam; all writes stay on the
/// execution side.
pub trait Store: Send + Sync + 'static {
    /// Latest committed nonce of `sender`.
    fn nonce(&self, sender: Address) -> Result<u64, StoreError>;

    /// Latest committed balance of `sender`.
    fn balance(&self, sender: Address) -> Result<U256, StoreError>;

    /// Latest committed header.
    fn header(&self) -> Header;

    /// Fork switches active at the given height.
    fn fork_at(&self, number: u64) -> ForkFlags;
}

/// Error returned by [`TxSigner::recover_sender`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("signature recovery failed: {0}")]
pub struct SignerError(pub String);

/// Recovers transaction senders.
///
/// Implementations are expected to reject unprotected (pre-EIP-155)
/// signatures once the fork is active.
pub trait TxSigner: Send + Sync + 'static {
    /// Recovers the signer of `tx`.
    fn recover_sender(&self, tx: &Transaction) -> Result<Address, SignerError>;
}
