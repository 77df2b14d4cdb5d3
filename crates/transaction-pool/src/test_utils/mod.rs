//! Mocks and builders for pool tests.

use crate::{
    config::PoolConfig,
    traits::{SignerError, Store, StoreError, TxSigner},
    TxPool,
};
use arbor_primitives::{
    Address, Bytes, ForkFlags, Header, Transaction, B256, TX_SLOT_SIZE, U256,
};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

/// Test sender.
pub const ADDR1: Address = Address::with_last_byte(1);
/// Test sender.
pub const ADDR2: Address = Address::with_last_byte(2);
/// Test sender.
pub const ADDR3: Address = Address::with_last_byte(3);
/// Test sender.
pub const ADDR4: Address = Address::with_last_byte(4);
/// Test sender.
pub const ADDR5: Address = Address::with_last_byte(5);

/// Gas limit below the mock block gas limit but above any intrinsic cost
/// the builders produce.
pub const VALID_GAS_LIMIT: u64 = 4_712_350;

/// Block gas limit served by [`MockStore`].
pub const MOCK_BLOCK_GAS_LIMIT: u64 = 10_000_000_000_000;

/// Balance served by [`MockStore`] for unknown accounts: 1 ETH.
pub const MOCK_BALANCE: u128 = 1_000_000_000_000_000_000;

static UNIQUE: AtomicU64 = AtomicU64::new(0);

/// A valid transaction of `slots` slots at the default gas price.
pub fn test_tx(sender: Address, nonce: u64, slots: u64) -> Transaction {
    priced_tx(sender, 1, nonce, slots)
}

/// A valid transaction of `slots` slots with the given gas price.
///
/// Each call produces a distinct payload, so two transactions with the same
/// `(sender, nonce)` still have different hashes.
pub fn priced_tx(sender: Address, gas_price: u64, nonce: u64, slots: u64) -> Transaction {
    let payload = TX_SLOT_SIZE as usize * slots.saturating_sub(1) as usize;
    let mut input = vec![1u8; payload.max(8)];
    input[..8].copy_from_slice(&UNIQUE.fetch_add(1, Ordering::Relaxed).to_be_bytes());

    Transaction {
        nonce,
        gas_price: U256::from(gas_price),
        gas: VALID_GAS_LIMIT,
        to: Some(Address::with_last_byte(0xfe)),
        value: U256::from(1u64),
        input: Bytes::from(input),
        v: 27,
        r: U256::from(1u64),
        s: U256::from(1u64),
        from: sender,
    }
}

/// Wraps a transaction the way admission would, without validating it.
#[cfg(test)]
pub(crate) fn pooled(tx: Transaction) -> Arc<crate::validate::PooledTransaction> {
    Arc::new(crate::validate::PooledTransaction::new(tx, crate::traits::TxOrigin::Local))
}

/// Admits a transaction and runs the enqueue handler, like the dispatcher
/// would, returning the resulting promote request.
#[cfg(test)]
pub(crate) fn add_direct(
    pool: &TxPool,
    tx: Transaction,
) -> crate::error::PoolResult<Option<crate::pool::PromoteRequest>> {
    let pooled = pool.inner().admit(crate::traits::TxOrigin::Local, tx)?;
    Ok(pool.inner().on_enqueue(crate::pool::EnqueueRequest { tx: pooled }))
}

/// Admits a transaction and drives it through enqueue and promotion.
#[cfg(test)]
pub(crate) fn add_and_promote(pool: &TxPool, tx: Transaction) -> crate::error::PoolResult<()> {
    if let Some(req) = add_direct(pool, tx)? {
        pool.inner().on_promote(req);
    }
    Ok(())
}

/// In-memory [`Store`] with per-account nonces and a flat balance.
#[derive(Debug)]
pub struct MockStore {
    nonces: Mutex<HashMap<Address, u64>>,
    default_nonce: u64,
    balance: U256,
    gas_limit: u64,
    number: u64,
    fail_balance: bool,
}

impl Default for MockStore {
    fn default() -> Self {
        Self {
            nonces: Mutex::new(HashMap::new()),
            default_nonce: 0,
            balance: U256::from(MOCK_BALANCE),
            gas_limit: MOCK_BLOCK_GAS_LIMIT,
            number: 0,
            fail_balance: false,
        }
    }
}

impl MockStore {
    /// A store whose account reads cannot be trusted: nonces come back
    /// implausibly high and balance reads fail outright.
    pub fn faulty() -> Self {
        Self { default_nonce: 99_999, fail_balance: true, ..Default::default() }
    }

    /// Sets the committed nonce of `sender`.
    pub fn with_nonce(self, sender: Address, nonce: u64) -> Self {
        self.nonces.lock().insert(sender, nonce);
        self
    }

    /// Sets the committed nonce of `sender` on a shared store.
    pub fn set_nonce(&self, sender: Address, nonce: u64) {
        self.nonces.lock().insert(sender, nonce);
    }

    /// Sets the flat balance served for every account.
    pub fn with_balance(mut self, balance: U256) -> Self {
        self.balance = balance;
        self
    }
}

impl Store for MockStore {
    fn nonce(&self, sender: Address) -> Result<u64, StoreError> {
        Ok(*self.nonces.lock().get(&sender).unwrap_or(&self.default_nonce))
    }

    fn balance(&self, _sender: Address) -> Result<U256, StoreError> {
        if self.fail_balance {
            return Err(StoreError("mock balance failure".into()))
        }
        Ok(self.balance)
    }

    fn header(&self) -> Header {
        Header { number: self.number, gas_limit: self.gas_limit, hash: B256::ZERO }
    }

    fn fork_at(&self, _number: u64) -> ForkFlags {
        ForkFlags::latest()
    }
}

/// Signer stand-in; the default echoes the declared sender back.
#[derive(Debug, Default)]
pub struct MockSigner {
    mode: SignerMode,
}

#[derive(Debug, Default)]
enum SignerMode {
    /// Recover whatever the transaction declares.
    #[default]
    Echo,
    /// Recover a fixed address regardless of the transaction.
    Fixed(Address),
    /// Fail every recovery.
    Fail,
}

impl MockSigner {
    /// A signer that fails every recovery.
    pub fn failing() -> Self {
        Self { mode: SignerMode::Fail }
    }

    /// A signer that always recovers `address`.
    pub fn recovering(address: Address) -> Self {
        Self { mode: SignerMode::Fixed(address) }
    }
}

impl TxSigner for MockSigner {
    fn recover_sender(&self, tx: &Transaction) -> Result<Address, SignerError> {
        match self.mode {
            SignerMode::Echo => Ok(tx.from),
            SignerMode::Fixed(address) => Ok(address),
            SignerMode::Fail => Err(SignerError("mock recovery failure".into())),
        }
    }
}

/// Assembles a [`TxPool`] over mocks.
#[derive(Debug, Default)]
pub struct TestPoolBuilder {
    config: PoolConfig,
    store: MockStore,
    signer: MockSigner,
}

impl TestPoolBuilder {
    /// Overrides the pool configuration.
    pub fn with_config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the backing store.
    pub fn with_store(mut self, store: MockStore) -> Self {
        self.store = store;
        self
    }

    /// Overrides the signer.
    pub fn with_signer(mut self, signer: MockSigner) -> Self {
        self.signer = signer;
        self
    }

    /// Marks the node as sealing so gossip is accepted.
    pub fn sealing(mut self) -> Self {
        self.config.sealing = true;
        self
    }

    /// Builds the pool.
    pub fn build(self) -> TxPool {
        TxPool::new(self.config, Arc::new(self.store), Arc::new(self.signer))
    }
}
