//! Transaction validation: the admission checks a transaction clears before
//! it is handed to the dispatcher.

use crate::{
    config::PoolConfig,
    error::{PoolError, PoolResult},
    pool::size::SlotGauge,
    traits::{Store, TxOrigin, TxSigner},
};
use arbor_primitives::{keccak256, Address, ForkFlags, Transaction, B256, U256, TX_MAX_SIZE};
use std::{sync::Arc, time::Instant};

/// Base cost of a plain transfer.
const TX_GAS: u64 = 21_000;
/// Base cost of a contract creation.
const TX_CREATE_GAS: u64 = 53_000;
/// Cost per zero byte of calldata.
const TX_DATA_ZERO_GAS: u64 = 4;
/// Cost per non-zero byte of calldata before Istanbul.
const TX_DATA_NON_ZERO_GAS: u64 = 68;
/// Cost per non-zero byte of calldata from Istanbul on (EIP-2028).
const TX_DATA_NON_ZERO_GAS_EIP2028: u64 = 16;

/// A transaction that cleared validation and is tracked by the pool.
///
/// Encoded size, slot count and hash are computed once at admission.
#[derive(Debug)]
pub struct PooledTransaction {
    transaction: Transaction,
    hash: B256,
    size: u64,
    slots: u64,
    origin: TxOrigin,
    timestamp: Instant,
}

impl PooledTransaction {
    pub(crate) fn new(transaction: Transaction, origin: TxOrigin) -> Self {
        let encoded = alloy_rlp::encode(&transaction);
        Self {
            hash: keccak256(&encoded),
            size: encoded.len() as u64,
            slots: (encoded.len() as u64).div_ceil(arbor_primitives::TX_SLOT_SIZE).max(1),
            transaction,
            origin,
            timestamp: Instant::now(),
        }
    }

    /// The underlying transaction.
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Canonical hash.
    pub const fn hash(&self) -> B256 {
        self.hash
    }

    /// RLP-encoded size in bytes.
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Pool slots occupied.
    pub const fn slots(&self) -> u64 {
        self.slots
    }

    /// Where the transaction entered the pool from.
    pub const fn origin(&self) -> TxOrigin {
        self.origin
    }

    /// When the transaction was admitted.
    pub const fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Recovered sender.
    pub const fn sender(&self) -> Address {
        self.transaction.from
    }

    /// Sender nonce.
    pub const fn nonce(&self) -> u64 {
        self.transaction.nonce
    }

    /// Offered gas price.
    pub const fn gas_price(&self) -> U256 {
        self.transaction.gas_price
    }
}

/// Runs the admission checks against committed state.
///
/// The validator never mutates pool state; duplicate detection and
/// replacement arbitration stay with the dispatcher.
pub(crate) struct TransactionValidator {
    store: Arc<dyn Store>,
    signer: Arc<dyn TxSigner>,
    gauge: Arc<SlotGauge>,
    price_limit: U256,
    local_price_bypass: bool,
}

impl TransactionValidator {
    pub(crate) fn new(
        store: Arc<dyn Store>,
        signer: Arc<dyn TxSigner>,
        gauge: Arc<SlotGauge>,
        config: &PoolConfig,
    ) -> Self {
        Self {
            store,
            signer,
            gauge,
            price_limit: U256::from(config.price_limit),
            local_price_bypass: config.local_price_bypass,
        }
    }

    /// Validates `tx` and stamps it with its recovered sender.
    pub(crate) fn validate(
        &self,
        origin: TxOrigin,
        mut tx: Transaction,
    ) -> PoolResult<PooledTransaction> {
        // a U256 value cannot be negative, so the first historical check
        // (NegativeValue) holds by construction

        let header = self.store.header();
        if tx.gas > header.gas_limit {
            return Err(PoolError::BlockLimitExceeded)
        }

        let pooled = PooledTransaction::new(tx.clone(), origin);
        if pooled.size() > TX_MAX_SIZE {
            return Err(PoolError::OversizedData)
        }

        let sender = self.signer.recover_sender(&tx).map_err(|_| PoolError::ExtractSignature)?;
        if sender.is_zero() || (!tx.from.is_zero() && tx.from != sender) {
            return Err(PoolError::InvalidSender)
        }
        tx.from = sender;

        if tx.gas_price < self.price_limit && !(origin.is_local() && self.local_price_bypass) {
            return Err(PoolError::Underpriced)
        }

        if !self.gauge.fits(pooled.slots()) {
            return Err(PoolError::TxPoolOverflow)
        }

        let forks = self.store.fork_at(header.number);
        let intrinsic =
            intrinsic_gas(forks, &tx.input, tx.is_create()).ok_or(PoolError::IntrinsicGas)?;
        if intrinsic > tx.gas {
            return Err(PoolError::IntrinsicGas)
        }

        let state_nonce = self.store.nonce(sender).map_err(|_| PoolError::InvalidAccountState)?;
        if state_nonce > tx.nonce {
            return Err(PoolError::NonceTooLow)
        }

        let balance = self.store.balance(sender).map_err(|_| PoolError::InvalidAccountState)?;
        let cost = tx.cost().ok_or(PoolError::InsufficientFunds)?;
        if balance < cost {
            return Err(PoolError::InsufficientFunds)
        }

        Ok(PooledTransaction { transaction: tx, ..pooled })
    }
}

/// Gas consumed before a single opcode executes.
fn intrinsic_gas(forks: ForkFlags, input: &[u8], is_create: bool) -> Option<u64> {
    let mut gas = if is_create { TX_CREATE_GAS } else { TX_GAS };

    let non_zero = input.iter().filter(|b| **b != 0).count() as u64;
    let zero = input.len() as u64 - non_zero;

    let non_zero_cost =
        if forks.istanbul { TX_DATA_NON_ZERO_GAS_EIP2028 } else { TX_DATA_NON_ZERO_GAS };

    gas = gas.checked_add(non_zero.checked_mul(non_zero_cost)?)?;
    gas = gas.checked_add(zero.checked_mul(TX_DATA_ZERO_GAS)?)?;
    Some(gas)
}

/// The minimum gas price that displaces an incumbent, given the configured
/// bump percentage.
pub(crate) fn replacement_threshold(incumbent_price: U256, bump_percent: u64) -> U256 {
    incumbent_price
        .checked_mul(U256::from(100 + bump_percent))
        .map(|p| p / U256::from(100))
        .unwrap_or(U256::MAX)
}
