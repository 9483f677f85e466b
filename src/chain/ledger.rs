// Thread-safe handle over the chain state

use parking_lot::RwLock;
use std::sync::Arc;
use crate::chain::blockchain::{Blockchain, MineOutcome, MiningReport};
use crate::config::LedgerConfig;
use crate::consensus::{CancelToken, Difficulty, Miner, MiningOutcome};
use crate::core::{Block, Transaction};
use crate::error::{ChainError, StorageError, TxError};
use crate::storage::{ChainStore, Utxo, UtxoPool};

/// Shared ledger
///
/// Mutations take the write lock for their whole read-modify-write, so no
/// two of them interleave. Readers share the read lock and always see the
/// state between two mutations. The nonce search itself runs with no lock
/// held.
#[derive(Clone)]
pub struct Ledger {
    chain: Arc<RwLock<Blockchain>>,
    cancel_check_interval: u64,
}

impl Ledger {
    /// Create a ledger with a fresh genesis chain
    pub fn new(config: &LedgerConfig, allocations: impl IntoIterator<Item = Utxo>) -> Self {
        Self::from_chain(Blockchain::new(config.difficulty, allocations), config)
    }

    pub fn from_chain(chain: Blockchain, config: &LedgerConfig) -> Self {
        Self {
            chain: Arc::new(RwLock::new(chain)),
            cancel_check_interval: config.cancel_check_interval,
        }
    }

    /// Load a stored chain, or start a new one when the store is empty
    pub fn open(
        store: &dyn ChainStore,
        config: &LedgerConfig,
        allocations: impl IntoIterator<Item = Utxo>,
    ) -> Result<Self, StorageError> {
        match store.load()? {
            Some(snapshot) => {
                let chain = Blockchain::from_snapshot(snapshot)?;
                log::info!("Loaded chain with {} blocks", chain.blocks().len());
                Ok(Self::from_chain(chain, config))
            }
            None => {
                log::info!("Starting new chain at difficulty {}", config.difficulty.bits());
                Ok(Self::new(config, allocations))
            }
        }
    }

    /// Write the current state to a store
    pub fn save(&self, store: &dyn ChainStore) -> Result<(), StorageError> {
        let snapshot = self.chain.read().snapshot();
        store.save(&snapshot)
    }

    pub fn submit_transaction(&self, tx: Transaction) -> Result<(), TxError> {
        self.chain.write().submit_transaction(tx)
    }

    /// Pure check against the current pool; nothing is queued
    pub fn verify_transaction(&self, tx: &Transaction) -> bool {
        self.chain.read().verify_transaction(tx).is_ok()
    }

    /// Same as `verify_transaction`, keeping the reason for refusal
    pub fn check_transaction(&self, tx: &Transaction) -> Result<(), TxError> {
        self.chain.read().verify_transaction(tx)
    }

    /// Mine the pending queue into a new block
    ///
    /// The block is assembled under the read lock, mined with no lock held
    /// and committed under the write lock. If a block was added in between,
    /// the work is discarded and assembly starts again on the new tip.
    pub fn mine_block(&self, cancel: &CancelToken) -> Result<MineOutcome, ChainError> {
        loop {
            let (template, difficulty) = {
                let chain = self.chain.read();
                (chain.prepare_block()?, chain.difficulty())
            };

            let mut block = template.block;
            let miner = Miner::new(difficulty, self.cancel_check_interval);
            let result = match miner.mine(&mut block, cancel) {
                MiningOutcome::Mined(result) => result,
                MiningOutcome::Cancelled { attempts } => {
                    log::info!("Mining cancelled after {} attempts", attempts);
                    return Ok(MineOutcome::Cancelled);
                }
            };

            let committed = self.chain.write().commit_mined(block.clone(), &template.rejected);
            if committed {
                log::info!(
                    "Mined block {} in {} attempts ({:.0} H/s)",
                    block.index,
                    result.attempts,
                    result.hash_rate()
                );
                return Ok(MineOutcome::Mined(MiningReport {
                    block,
                    rejected: template.rejected,
                    attempts: result.attempts,
                    duration: result.duration,
                }));
            }
            log::info!("Tip moved during mining, reassembling block");
        }
    }

    pub fn add_block(&self, block: Block) -> Result<(), ChainError> {
        self.chain.write().add_block(block)
    }

    /// Copy of the chain from genesis to tip
    pub fn get_chain(&self) -> Vec<Block> {
        self.chain.read().blocks().to_vec()
    }

    /// Copy of the UTXO pool
    pub fn get_utxo_pool(&self) -> UtxoPool {
        self.chain.read().utxo_pool().clone()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.chain.read().pending_transactions().to_vec()
    }

    /// Chain and pool read under one lock, so they describe the same state
    pub fn state(&self) -> (Vec<Block>, UtxoPool) {
        let chain = self.chain.read();
        (chain.blocks().to_vec(), chain.utxo_pool().clone())
    }

    pub fn height(&self) -> u64 {
        self.chain.read().height()
    }

    /// Difficulty the chain was created with
    pub fn difficulty(&self) -> Difficulty {
        self.chain.read().difficulty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Amount;
    use crate::storage::{MemoryStore, UtxoView};
    use crate::wallet::{KeyPair, TransactionBuilder};
    use std::thread;
    use std::time::Duration;

    fn config(bits: u32) -> LedgerConfig {
        LedgerConfig {
            difficulty: Difficulty::new(bits).unwrap(),
            cancel_check_interval: 16,
            ..LedgerConfig::default()
        }
    }

    fn coins(n: u64) -> Amount {
        Amount::from_coins(n).unwrap()
    }

    #[test]
    fn test_get_chain_is_a_copy() {
        let ledger = Ledger::new(&config(1), vec![]);
        let mut copy = ledger.get_chain();
        copy[0].nonce = 42;
        copy.clear();
        assert_eq!(ledger.get_chain().len(), 1);
        assert_eq!(ledger.get_chain(), ledger.get_chain());
    }

    #[test]
    fn test_mine_through_ledger() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let ledger = Ledger::new(&config(4), vec![Utxo::new("u0", alice.public_key_hex(), coins(10))]);

        let tx = TransactionBuilder::new(&alice, &ledger.get_utxo_pool())
            .build("t1", &bob.public_key_hex(), coins(10), "u1")
            .unwrap();
        assert!(ledger.verify_transaction(&tx));
        ledger.submit_transaction(tx).unwrap();

        let outcome = ledger.mine_block(&CancelToken::new()).unwrap();
        assert!(matches!(outcome, MineOutcome::Mined(_)));
        assert_eq!(ledger.height(), 1);
        assert_eq!(ledger.get_utxo_pool().get_balance(&bob.public_key_hex()), coins(10));
    }

    #[test]
    fn test_cancel_leaves_state_alone() {
        let alice = KeyPair::generate();
        let ledger = Ledger::new(&config(256), vec![Utxo::new("u0", alice.public_key_hex(), coins(10))]);
        let tx = TransactionBuilder::new(&alice, &ledger.get_utxo_pool())
            .build("t1", &alice.public_key_hex(), coins(1), "u1")
            .unwrap();
        ledger.submit_transaction(tx).unwrap();

        let cancel = CancelToken::new();
        let worker = {
            let ledger = ledger.clone();
            let cancel = cancel.clone();
            thread::spawn(move || ledger.mine_block(&cancel))
        };

        // readers are not blocked while the search runs
        thread::sleep(Duration::from_millis(30));
        assert_eq!(ledger.get_chain().len(), 1);

        cancel.cancel();
        let outcome = worker.join().unwrap().unwrap();
        assert!(matches!(outcome, MineOutcome::Cancelled));
        assert_eq!(ledger.get_chain().len(), 1);
        assert_eq!(ledger.pending_transactions().len(), 1);
        assert!(ledger.get_utxo_pool().has_utxo("u0"));
    }

    #[test]
    fn test_save_and_open() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let store = MemoryStore::new();
        let cfg = config(2);

        let ledger = Ledger::open(&store, &cfg, vec![Utxo::new("u0", alice.public_key_hex(), coins(3))]).unwrap();
        let tx = TransactionBuilder::new(&alice, &ledger.get_utxo_pool())
            .build("t1", &bob.public_key_hex(), coins(3), "u1")
            .unwrap();
        ledger.submit_transaction(tx).unwrap();
        ledger.mine_block(&CancelToken::new()).unwrap();
        ledger.save(&store).unwrap();

        // allocations are ignored once a chain is stored
        let reopened = Ledger::open(&store, &cfg, vec![]).unwrap();
        assert_eq!(reopened.get_chain(), ledger.get_chain());
        assert_eq!(reopened.get_utxo_pool(), ledger.get_utxo_pool());
    }
}
