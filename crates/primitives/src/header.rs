use alloy_primitives::B256;

/// The subset of a block header the transaction pool consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    /// Block height.
    pub number: u64,
    /// Gas limit of the block.
    pub gas_limit: u64,
    /// Hash of the block.
    pub hash: B256,
}
