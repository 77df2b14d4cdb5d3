//! Transaction pool errors

/// Transaction pool result type.
pub type PoolResult<T> = Result<T, PoolError>;

/// All errors the transaction pool can return from its intake APIs.
///
/// Every variant corresponds to one admission check; anything that happens
/// after a transaction was accepted is surfaced through pool events instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The transferred value is negative.
    ///
    /// Unreachable for transactions built from [`arbor_primitives::U256`]
    /// values; retained so the RPC code table stays stable across clients.
    #[error("negative value")]
    NegativeValue,
    /// The encoded transaction exceeds the maximum accepted size.
    #[error("oversized data")]
    OversizedData,
    /// The transaction's gas limit exceeds the block gas limit.
    #[error("transaction exceeds block gas limit")]
    BlockLimitExceeded,
    /// The gas limit does not cover the intrinsic cost of the payload.
    #[error("intrinsic gas too low")]
    IntrinsicGas,
    /// The gas price is below the configured floor.
    #[error("transaction underpriced")]
    Underpriced,
    /// The sender signature could not be recovered.
    #[error("could not extract signature")]
    ExtractSignature,
    /// The recovered sender is zero or does not match the transaction.
    #[error("invalid sender")]
    InvalidSender,
    /// The sender cannot cover `value + gas * gas_price`.
    #[error("insufficient funds for gas * price + value")]
    InsufficientFunds,
    /// The nonce is lower than the sender's committed nonce.
    #[error("nonce too low")]
    NonceTooLow,
    /// The sender's account state could not be read.
    #[error("invalid account state")]
    InvalidAccountState,
    /// Admitting the transaction would exceed the pool's slot capacity.
    #[error("txpool is full")]
    TxPoolOverflow,
    /// A transaction with this hash is already pooled.
    #[error("already known")]
    AlreadyKnown,
    /// A same-nonce transaction is pooled and the price bump is too small.
    #[error("replacement transaction underpriced")]
    ReplaceUnderpriced,
}

impl PoolError {
    /// Stable string code for the RPC surface.
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::NegativeValue => "NEGATIVE_VALUE",
            Self::OversizedData => "OVERSIZED_DATA",
            Self::BlockLimitExceeded => "BLOCK_LIMIT_EXCEEDED",
            Self::IntrinsicGas => "INTRINSIC_GAS",
            Self::Underpriced => "UNDERPRICED",
            Self::ExtractSignature => "EXTRACT_SIGNATURE",
            Self::InvalidSender => "INVALID_SENDER",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::NonceTooLow => "NONCE_TOO_LOW",
            Self::InvalidAccountState => "INVALID_ACCOUNT_STATE",
            Self::TxPoolOverflow => "TXPOOL_OVERFLOW",
            Self::AlreadyKnown => "ALREADY_KNOWN",
            Self::ReplaceUnderpriced => "REPLACE_UNDERPRICED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let all = [
            PoolError::NegativeValue,
            PoolError::OversizedData,
            PoolError::BlockLimitExceeded,
            PoolError::IntrinsicGas,
            PoolError::Underpriced,
            PoolError::ExtractSignature,
            PoolError::InvalidSender,
            PoolError::InsufficientFunds,
            PoolError::NonceTooLow,
            PoolError::InvalidAccountState,
            PoolError::TxPoolOverflow,
            PoolError::AlreadyKnown,
            PoolError::ReplaceUnderpriced,
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(|e| e.as_code()).collect();
        assert_eq!(codes.len(), all.len());
    }
}
