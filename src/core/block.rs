// Block data structure

use serde::{Deserialize, Serialize};
use crate::core::{Hash256, hash256, Transaction};
use super::serialize::write_varint;

/// Block - header fields plus the ordered transactions
///
/// `hash` is carried for display and linkage only; validation always
/// recomputes it from the other fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    /// Position in the chain, genesis is 0
    pub index: u64,
    /// Unix milliseconds, fixed for the whole nonce search
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    /// Hash of the previous block, zero for genesis
    pub previous_hash: Hash256,
    pub nonce: u64,
    pub hash: Hash256,
}

impl Block {
    /// Create a block and compute its hash for the given nonce
    pub fn new(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: Hash256,
        nonce: u64,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce,
            hash: Hash256::zero(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// The fixed genesis block shared by every ledger
    pub fn genesis() -> Self {
        Self::new(0, 0, Vec::new(), Hash256::zero(), 0)
    }

    /// Encoding of everything but the nonce and the stored hash
    ///
    /// The miner encodes this once and appends each candidate nonce.
    pub fn encode_without_nonce(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(80);
        buf.extend_from_slice(&self.index.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(self.previous_hash.as_bytes());
        write_varint(&mut buf, self.transactions.len() as u64);
        for tx in &self.transactions {
            buf.extend_from_slice(&tx.encode());
        }
        buf
    }

    /// Digest of the block's fields with its stored nonce
    pub fn compute_hash(&self) -> Hash256 {
        let mut buf = self.encode_without_nonce();
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        hash256(&buf)
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        *self == Self::genesis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Amount, PublicKeyHex};

    fn sample_tx() -> Transaction {
        Transaction::new(
            "tx1",
            PublicKeyHex::from("aa"),
            PublicKeyHex::from("bb"),
            Amount::from_coins(1).unwrap(),
            vec!["u0".into()],
            vec!["u1".into()],
        )
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.index, 0);
        assert!(genesis.transactions.is_empty());
        assert_eq!(genesis.previous_hash, Hash256::zero());
        assert_eq!(genesis.hash, genesis.compute_hash());
        assert_eq!(Block::genesis().hash, genesis.hash);
    }

    #[test]
    fn test_hash_covers_every_field() {
        let base = Block::new(1, 1000, vec![sample_tx()], Hash256::new([7; 32]), 5);

        let mut changed = base.clone();
        changed.nonce += 1;
        assert_ne!(changed.compute_hash(), base.hash);

        let mut changed = base.clone();
        changed.timestamp += 1;
        assert_ne!(changed.compute_hash(), base.hash);

        let mut changed = base.clone();
        changed.index += 1;
        assert_ne!(changed.compute_hash(), base.hash);

        let mut changed = base.clone();
        changed.previous_hash = Hash256::zero();
        assert_ne!(changed.compute_hash(), base.hash);

        let mut changed = base.clone();
        changed.transactions[0].amount = Amount::from_coins(2).unwrap();
        assert_ne!(changed.compute_hash(), base.hash);

        let mut changed = base.clone();
        changed.transactions[0].signature = vec![9];
        assert_ne!(changed.compute_hash(), base.hash);
    }

    #[test]
    fn test_stored_hash_not_part_of_digest() {
        let block = Block::new(3, 42, vec![], Hash256::new([1; 32]), 0);
        let mut forged = block.clone();
        forged.hash = Hash256::zero();
        assert_eq!(forged.compute_hash(), block.hash);
    }

    #[test]
    fn test_block_json_shape() {
        let block = Block::new(1, 1000, vec![sample_tx()], Hash256::zero(), 0);
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["previous_hash"].as_str().unwrap().len(), 64);
        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }
}
