/// Fork switches active at a given block height.
///
/// Only the forks the transaction pool cares about are represented: EIP-155
/// gates replay-protected signatures, Istanbul reprices calldata (EIP-2028).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForkFlags {
    /// Homestead is active.
    pub homestead: bool,
    /// Istanbul is active.
    pub istanbul: bool,
    /// EIP-155 replay protection is required.
    pub eip155: bool,
}

impl ForkFlags {
    /// All known forks active.
    pub const fn latest() -> Self {
        Self { homestead: true, istanbul: true, eip155: true }
    }
}
