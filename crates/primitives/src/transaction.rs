use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{length_of_length, BufMut, Decodable, Encodable, Header, EMPTY_STRING_CODE};

/// A slot is the unit of pool capacity accounting: 32 KiB of encoded payload.
pub const TX_SLOT_SIZE: u64 = 32 * 1024;

/// Maximum RLP-encoded transaction size accepted by the pool (128 KiB).
pub const TX_MAX_SIZE: u64 = 4 * TX_SLOT_SIZE;

/// A legacy, EIP-155 signed transaction.
///
/// `from` is not part of the canonical encoding; it is zero until sender
/// recovery runs and is populated by the pool's admission pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    /// Sender account nonce.
    pub nonce: u64,
    /// Wei per unit of gas.
    pub gas_price: U256,
    /// Gas limit of the transaction.
    pub gas: u64,
    /// Recipient; `None` creates a contract.
    pub to: Option<Address>,
    /// Transferred amount in wei.
    pub value: U256,
    /// Call data / init code.
    pub input: Bytes,
    /// Signature parity + chain id (EIP-155).
    pub v: u64,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
    /// Recovered sender, zero until recovery.
    pub from: Address,
}

impl Transaction {
    /// Whether this transaction creates a contract.
    pub const fn is_create(&self) -> bool {
        self.to.is_none()
    }

    /// Canonical hash: keccak of the RLP encoding.
    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }

    /// RLP-encoded size in bytes.
    pub fn size(&self) -> u64 {
        self.length() as u64
    }

    /// Number of pool slots this transaction occupies.
    pub fn slots(&self) -> u64 {
        self.size().div_ceil(TX_SLOT_SIZE).max(1)
    }

    /// Maximum wei debited by this transaction: `value + gas * gas_price`.
    ///
    /// `None` on arithmetic overflow.
    pub fn cost(&self) -> Option<U256> {
        U256::from(self.gas).checked_mul(self.gas_price)?.checked_add(self.value)
    }

    fn payload_length(&self) -> usize {
        let mut len = self.nonce.length();
        len += self.gas_price.length();
        len += self.gas.length();
        len += self.to.map_or(1, |to| to.length());
        len += self.value.length();
        len += self.input.length();
        len += self.v.length();
        len += self.r.length();
        len += self.s.length();
        len
    }
}

impl Encodable for Transaction {
    fn encode(&self, out: &mut dyn BufMut) {
        Header { list: true, payload_length: self.payload_length() }.encode(out);
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas.encode(out);
        match self.to {
            Some(to) => to.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
        self.value.encode(out);
        self.input.encode(out);
        self.v.encode(out);
        self.r.encode(out);
        self.s.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + length_of_length(payload_length)
    }
}

impl Decodable for Transaction {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString)
        }
        let started_len = buf.len();

        let tx = Self {
            nonce: u64::decode(buf)?,
            gas_price: U256::decode(buf)?,
            gas: u64::decode(buf)?,
            to: if buf.first() == Some(&EMPTY_STRING_CODE) {
                *buf = &buf[1..];
                None
            } else {
                Some(Address::decode(buf)?)
            },
            value: U256::decode(buf)?,
            input: Bytes::decode(buf)?,
            v: u64::decode(buf)?,
            r: U256::decode(buf)?,
            s: U256::decode(buf)?,
            from: Address::ZERO,
        };

        let consumed = started_len - buf.len();
        if consumed != header.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: consumed,
            })
        }
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn sample() -> Transaction {
        Transaction {
            nonce: 7,
            gas_price: U256::from(30_000_000_000u64),
            gas: 21_000,
            to: Some(address!("000000000000000000000000000000000000beef")),
            value: U256::from(1_000u64),
            input: Bytes::from(vec![0, 1, 2, 0, 4]),
            v: 37,
            r: U256::from(1u64),
            s: U256::from(2u64),
            from: Address::ZERO,
        }
    }

    #[test]
    fn rlp_roundtrip_drops_sender() {
        let mut tx = sample();
        tx.from = address!("00000000000000000000000000000000000000a1");

        let encoded = alloy_rlp::encode(&tx);
        assert_eq!(encoded.len(), tx.length());

        let decoded = Transaction::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded.from, Address::ZERO);
        assert_eq!(decoded.nonce, tx.nonce);
        assert_eq!(decoded.to, tx.to);
        assert_eq!(decoded.input, tx.input);
        // the sender does not participate in the canonical hash
        assert_eq!(decoded.hash(), tx.hash());
    }

    #[test]
    fn create_has_empty_to() {
        let mut tx = sample();
        tx.to = None;
        assert!(tx.is_create());

        let encoded = alloy_rlp::encode(&tx);
        let decoded = Transaction::decode(&mut encoded.as_slice()).unwrap();
        assert!(decoded.is_create());
    }

    #[test]
    fn small_tx_occupies_one_slot() {
        assert_eq!(sample().slots(), 1);
    }

    #[test]
    fn slots_round_up() {
        let mut tx = sample();
        tx.input = Bytes::from(vec![1u8; TX_SLOT_SIZE as usize]);
        // payload alone exceeds one slot
        assert_eq!(tx.slots(), 2);
    }

    #[test]
    fn cost_overflow_is_none() {
        let mut tx = sample();
        tx.gas_price = U256::MAX;
        tx.gas = 2;
        assert!(tx.cost().is_none());
    }

    #[test]
    fn decode_rejects_garbage() {
        let garbage = [0xc1u8, 0xff, 0x00];
        assert!(Transaction::decode(&mut garbage.as_slice()).is_err());
    }
}
