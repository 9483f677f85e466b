// Transaction and block validation

use std::collections::HashSet;
use crate::consensus::pow::{Difficulty, validate_pow};
use crate::core::{Amount, Block, Transaction};
use crate::error::{ChainError, TxError};
use crate::storage::{PoolOverlay, UtxoPool, UtxoView};
use crate::wallet;

/// Transaction validator
///
/// Pure checks against a UTXO view; nothing is mutated.
pub struct TransactionValidator;

impl TransactionValidator {
    /// Validate a transaction against a set of unspent outputs
    ///
    /// Checks run in a fixed order: amount, inputs (existence and
    /// ownership), input total, outputs, signature.
    pub fn validate(tx: &Transaction, utxos: &impl UtxoView) -> Result<(), TxError> {
        if tx.amount.is_zero() {
            return Err(TxError::InvalidAmount);
        }

        let mut seen = HashSet::new();
        let mut available = Amount::ZERO;
        for id in &tx.input_utxos {
            // Listing an input twice counts as spending it twice
            if !seen.insert(id.as_str()) {
                return Err(TxError::UnknownOrUnauthorizedUTXO(id.clone()));
            }
            let utxo = utxos
                .get_utxo(id)
                .filter(|utxo| utxo.owner == tx.sender)
                .ok_or_else(|| TxError::UnknownOrUnauthorizedUTXO(id.clone()))?;
            available = available.checked_add(utxo.amount).unwrap_or(available);
        }

        if available < tx.amount {
            return Err(TxError::InsufficientInputs {
                required: tx.amount.to_string(),
                available: available.to_string(),
            });
        }

        match tx.created_output() {
            None => {
                return Err(TxError::InvalidOutputs(format!(
                    "expected exactly one output id, got {}",
                    tx.output_utxos.len()
                )));
            }
            Some(output) if tx.input_utxos.contains(output) => {
                return Err(TxError::InvalidOutputs(format!("output {} is also an input", output)));
            }
            Some(output) if utxos.has_utxo(output) => {
                return Err(TxError::InvalidOutputs(format!("output {} already exists", output)));
            }
            Some(output) if utxos.is_consumed(output) => {
                return Err(TxError::InvalidOutputs(format!("output {} was already spent", output)));
            }
            Some(_) => {}
        }

        if !wallet::verify(&tx.sender, &tx.signing_message(), &tx.signature) {
            return Err(TxError::InvalidSignature);
        }

        Ok(())
    }

    /// Boolean form of [`TransactionValidator::validate`]
    pub fn is_valid(tx: &Transaction, utxos: &impl UtxoView) -> bool {
        Self::validate(tx, utxos).is_ok()
    }
}

/// Block validator for blocks arriving from outside
pub struct BlockValidator {
    difficulty: Difficulty,
}

impl BlockValidator {
    pub fn new(difficulty: Difficulty) -> Self {
        Self { difficulty }
    }

    /// Validate a block header against the current tip
    pub fn validate_header(&self, block: &Block, tip: &Block) -> Result<(), ChainError> {
        let expected = tip.index + 1;
        if block.index != expected {
            return Err(ChainError::IndexMismatch {
                expected,
                actual: block.index,
            });
        }

        if block.previous_hash != tip.hash {
            return Err(ChainError::PreviousHashMismatch);
        }

        if block.compute_hash() != block.hash {
            return Err(ChainError::HashMismatch);
        }

        if !validate_pow(block, self.difficulty) {
            return Err(ChainError::InvalidProofOfWork);
        }

        if block.timestamp < tip.timestamp {
            return Err(ChainError::InvalidTimestamp {
                tip: tip.timestamp,
                actual: block.timestamp,
            });
        }

        Ok(())
    }

    /// Validate a complete block on top of `tip` and the current pool
    ///
    /// Transactions are checked in order against a scratch view, so a block
    /// may spend outputs created earlier in the same block.
    pub fn validate_block(&self, block: &Block, tip: &Block, pool: &UtxoPool) -> Result<(), ChainError> {
        self.validate_header(block, tip)?;

        let mut ids = HashSet::new();
        for tx in &block.transactions {
            if !ids.insert(tx.id.as_str()) {
                return Err(ChainError::DuplicateTransactionId(tx.id.clone()));
            }
        }

        let mut overlay = PoolOverlay::new(pool);
        for (index, tx) in block.transactions.iter().enumerate() {
            if let Err(source) = TransactionValidator::validate(tx, &overlay) {
                let spent_earlier = tx.input_utxos.iter().any(|id| overlay.was_spent_here(id));
                return Err(match source {
                    TxError::UnknownOrUnauthorizedUTXO(_) if spent_earlier => {
                        ChainError::TransactionConflict(tx.id.clone())
                    }
                    source => ChainError::InvalidTransaction { index, source },
                });
            }
            overlay.apply_transaction(tx);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::pow::{CancelToken, Miner};
    use crate::core::{Hash256, PublicKeyHex};
    use crate::storage::Utxo;
    use crate::wallet::{KeyPair, sign_transaction};

    fn coins(n: u64) -> Amount {
        Amount::from_coins(n).unwrap()
    }

    fn signed(id: &str, from: &KeyPair, to: &PublicKeyHex, amount: u64, inputs: &[&str], output: &str) -> Transaction {
        let mut tx = Transaction::new(
            id,
            from.public_key_hex(),
            to.clone(),
            coins(amount),
            inputs.iter().map(|s| s.to_string()).collect(),
            vec![output.to_string()],
        );
        sign_transaction(&mut tx, from);
        tx
    }

    fn funded(owner: &KeyPair) -> UtxoPool {
        vec![
            Utxo::new("u0", owner.public_key_hex(), coins(10)),
            Utxo::new("u1", owner.public_key_hex(), coins(5)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_valid_transaction() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let pool = funded(&alice);

        let tx = signed("t1", &alice, &bob.public_key_hex(), 12, &["u0", "u1"], "b0");
        assert_eq!(TransactionValidator::validate(&tx, &pool), Ok(()));
        assert!(TransactionValidator::is_valid(&tx, &pool));
    }

    #[test]
    fn test_zero_amount() {
        let alice = KeyPair::generate();
        let pool = funded(&alice);
        let mut tx = signed("t1", &alice, &alice.public_key_hex(), 1, &["u0"], "x");
        tx.amount = Amount::ZERO;
        sign_transaction(&mut tx, &alice);
        assert_eq!(TransactionValidator::validate(&tx, &pool), Err(TxError::InvalidAmount));
    }

    #[test]
    fn test_unknown_or_foreign_input() {
        let alice = KeyPair::generate();
        let mallory = KeyPair::generate();
        let pool = funded(&alice);

        let tx = signed("t1", &alice, &alice.public_key_hex(), 1, &["missing"], "x");
        assert_eq!(
            TransactionValidator::validate(&tx, &pool),
            Err(TxError::UnknownOrUnauthorizedUTXO("missing".into()))
        );

        let theft = signed("t2", &mallory, &mallory.public_key_hex(), 1, &["u0"], "x");
        assert_eq!(
            TransactionValidator::validate(&theft, &pool),
            Err(TxError::UnknownOrUnauthorizedUTXO("u0".into()))
        );
    }

    #[test]
    fn test_repeated_input() {
        let alice = KeyPair::generate();
        let pool = funded(&alice);
        let tx = signed("t1", &alice, &alice.public_key_hex(), 15, &["u1", "u1", "u1"], "x");
        assert_eq!(
            TransactionValidator::validate(&tx, &pool),
            Err(TxError::UnknownOrUnauthorizedUTXO("u1".into()))
        );
    }

    #[test]
    fn test_insufficient_and_empty_inputs() {
        let alice = KeyPair::generate();
        let pool = funded(&alice);

        let tx = signed("t1", &alice, &alice.public_key_hex(), 11, &["u0"], "x");
        assert!(matches!(
            TransactionValidator::validate(&tx, &pool),
            Err(TxError::InsufficientInputs { .. })
        ));

        let tx = signed("t2", &alice, &alice.public_key_hex(), 1, &[], "x");
        assert!(matches!(
            TransactionValidator::validate(&tx, &pool),
            Err(TxError::InsufficientInputs { .. })
        ));
    }

    #[test]
    fn test_invalid_outputs() {
        let alice = KeyPair::generate();
        let pool = funded(&alice);

        let mut tx = signed("t1", &alice, &alice.public_key_hex(), 1, &["u0"], "x");
        tx.output_utxos.push("y".into());
        sign_transaction(&mut tx, &alice);
        assert!(matches!(TransactionValidator::validate(&tx, &pool), Err(TxError::InvalidOutputs(_))));

        // would overwrite a live UTXO
        let tx = signed("t2", &alice, &alice.public_key_hex(), 1, &["u0"], "u1");
        assert!(matches!(TransactionValidator::validate(&tx, &pool), Err(TxError::InvalidOutputs(_))));

        // an input id cannot come back as the output
        let tx = signed("t3", &alice, &alice.public_key_hex(), 1, &["u0"], "u0");
        assert!(matches!(TransactionValidator::validate(&tx, &pool), Err(TxError::InvalidOutputs(_))));

        // nor can any id spent earlier
        let mut spent = pool.clone();
        spent.apply_transaction(&signed("t4", &alice, &alice.public_key_hex(), 5, &["u1"], "x"));
        let tx = signed("t5", &alice, &alice.public_key_hex(), 1, &["u0"], "u1");
        assert!(matches!(TransactionValidator::validate(&tx, &spent), Err(TxError::InvalidOutputs(_))));
    }

    #[test]
    fn test_bad_signature() {
        let alice = KeyPair::generate();
        let pool = funded(&alice);

        let mut tx = signed("t1", &alice, &alice.public_key_hex(), 3, &["u0"], "x");
        tx.amount = coins(4);
        assert_eq!(TransactionValidator::validate(&tx, &pool), Err(TxError::InvalidSignature));

        let mut tx = signed("t2", &alice, &alice.public_key_hex(), 3, &["u0"], "x");
        tx.signature.clear();
        assert_eq!(TransactionValidator::validate(&tx, &pool), Err(TxError::InvalidSignature));
    }

    #[test]
    fn test_validation_has_no_side_effects() {
        let alice = KeyPair::generate();
        let pool = funded(&alice);
        let before = pool.clone();
        let tx = signed("t1", &alice, &alice.public_key_hex(), 3, &["u0"], "x");
        for _ in 0..3 {
            assert!(TransactionValidator::is_valid(&tx, &pool));
        }
        assert_eq!(pool, before);
    }

    fn mined(index: u64, previous: &Block, txs: Vec<Transaction>, difficulty: Difficulty) -> Block {
        let mut block = Block::new(index, previous.timestamp + 1, txs, previous.hash, 0);
        Miner::new(difficulty, 64).mine(&mut block, &CancelToken::new());
        block
    }

    #[test]
    fn test_header_checks() {
        let difficulty = Difficulty::new(4).unwrap();
        let validator = BlockValidator::new(difficulty);
        let genesis = Block::genesis();

        let good = mined(1, &genesis, vec![], difficulty);
        assert_eq!(validator.validate_header(&good, &genesis), Ok(()));

        let wrong_index = mined(2, &genesis, vec![], difficulty);
        assert_eq!(
            validator.validate_header(&wrong_index, &genesis),
            Err(ChainError::IndexMismatch { expected: 1, actual: 2 })
        );

        let mut wrong_prev = Block::new(1, 1, vec![], Hash256::new([9; 32]), 0);
        Miner::new(difficulty, 64).mine(&mut wrong_prev, &CancelToken::new());
        assert_eq!(
            validator.validate_header(&wrong_prev, &genesis),
            Err(ChainError::PreviousHashMismatch)
        );

        let mut forged = good.clone();
        forged.nonce += 1;
        assert_eq!(validator.validate_header(&forged, &genesis), Err(ChainError::HashMismatch));
    }

    #[test]
    fn test_block_with_dependent_spends() {
        let difficulty = Difficulty::new(2).unwrap();
        let validator = BlockValidator::new(difficulty);
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let pool = funded(&alice);
        let genesis = Block::genesis();

        let first = signed("t1", &alice, &bob.public_key_hex(), 10, &["u0"], "b0");
        let second = signed("t2", &bob, &alice.public_key_hex(), 10, &["b0"], "a9");
        let block = mined(1, &genesis, vec![first, second], difficulty);
        assert_eq!(validator.validate_block(&block, &genesis, &pool), Ok(()));
    }

    #[test]
    fn test_block_with_double_spend() {
        let difficulty = Difficulty::new(2).unwrap();
        let validator = BlockValidator::new(difficulty);
        let alice = KeyPair::generate();
        let pool = funded(&alice);
        let genesis = Block::genesis();

        let first = signed("t1", &alice, &alice.public_key_hex(), 10, &["u0"], "x0");
        let again = signed("t2", &alice, &alice.public_key_hex(), 10, &["u0"], "x1");
        let block = mined(1, &genesis, vec![first, again], difficulty);
        assert_eq!(
            validator.validate_block(&block, &genesis, &pool),
            Err(ChainError::TransactionConflict("t2".into()))
        );
    }

    #[test]
    fn test_block_spending_one_output_three_times() {
        let difficulty = Difficulty::new(2).unwrap();
        let validator = BlockValidator::new(difficulty);
        let alice = KeyPair::generate();
        let pool = funded(&alice);
        let genesis = Block::genesis();

        // input recreated as its own output
        let loop_back = signed("a", &alice, &alice.public_key_hex(), 10, &["u0"], "u0");
        let block = mined(1, &genesis, vec![loop_back], difficulty);
        assert!(matches!(
            validator.validate_block(&block, &genesis, &pool),
            Err(ChainError::InvalidTransaction { index: 0, source: TxError::InvalidOutputs(_) })
        ));

        // output created in the block, then spent twice
        let make = signed("a", &alice, &alice.public_key_hex(), 10, &["u0"], "m");
        let first = signed("b", &alice, &alice.public_key_hex(), 10, &["m"], "x");
        let second = signed("c", &alice, &alice.public_key_hex(), 10, &["m"], "y");
        let block = mined(1, &genesis, vec![make, first, second], difficulty);
        assert_eq!(
            validator.validate_block(&block, &genesis, &pool),
            Err(ChainError::TransactionConflict("c".into()))
        );
    }

    #[test]
    fn test_block_with_duplicate_ids_and_bad_tx() {
        let difficulty = Difficulty::new(2).unwrap();
        let validator = BlockValidator::new(difficulty);
        let alice = KeyPair::generate();
        let pool = funded(&alice);
        let genesis = Block::genesis();

        let a = signed("same", &alice, &alice.public_key_hex(), 1, &["u0"], "x0");
        let b = signed("same", &alice, &alice.public_key_hex(), 1, &["u1"], "x1");
        let block = mined(1, &genesis, vec![a, b], difficulty);
        assert_eq!(
            validator.validate_block(&block, &genesis, &pool),
            Err(ChainError::DuplicateTransactionId("same".into()))
        );

        let mut bad = signed("t1", &alice, &alice.public_key_hex(), 1, &["u0"], "x0");
        bad.signature[0] ^= 1;
        let block = mined(1, &genesis, vec![bad], difficulty);
        assert_eq!(
            validator.validate_block(&block, &genesis, &pool),
            Err(ChainError::InvalidTransaction { index: 0, source: TxError::InvalidSignature })
        );
    }
}
