// Chain state: blocks, pending transactions and the UTXO pool

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use crate::consensus::{BlockValidator, CancelToken, Difficulty, Miner, MiningOutcome, TransactionValidator};
use crate::core::{Block, Hash256, Transaction};
use crate::error::{ChainError, TxError};
use crate::storage::{PoolOverlay, Utxo, UtxoPool};

/// A pending transaction dropped while assembling a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTransaction {
    pub transaction: Transaction,
    pub error: TxError,
}

/// Unmined block assembled from the pending queue
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub block: Block,
    pub rejected: Vec<RejectedTransaction>,
}

/// What a successful `mine_block` produced
#[derive(Debug, Clone)]
pub struct MiningReport {
    pub block: Block,
    /// Pending transactions that no longer validated; removed from the queue
    pub rejected: Vec<RejectedTransaction>,
    pub attempts: u64,
    pub duration: Duration,
}

/// How `mine_block` ended
#[derive(Debug, Clone)]
pub enum MineOutcome {
    Mined(MiningReport),
    /// The search was abandoned; chain, pool and queue are unchanged
    Cancelled,
}

/// Serializable chain state for persistence
///
/// The UTXO pool is not stored: it is rebuilt by replaying the blocks on
/// top of the genesis allocations, which also re-verifies every block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainSnapshot {
    pub difficulty: Difficulty,
    pub allocations: Vec<Utxo>,
    pub blocks: Vec<Block>,
    pub pending_transactions: Vec<Transaction>,
}

/// The ledger state machine
///
/// Single owner of the blocks, the pending queue and the UTXO pool. Every
/// mutation goes through a method here and either completes or leaves the
/// state as it was.
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    pending_transactions: Vec<Transaction>,
    utxo_pool: UtxoPool,
    difficulty: Difficulty,
    allocations: Vec<Utxo>,
}

impl Blockchain {
    /// Create a chain holding only the genesis block
    ///
    /// `allocations` seed the UTXO pool; they are the only way value enters
    /// the ledger.
    pub fn new(difficulty: Difficulty, allocations: impl IntoIterator<Item = Utxo>) -> Self {
        let allocations: Vec<Utxo> = allocations.into_iter().collect();
        let utxo_pool = allocations.iter().cloned().collect();
        Self {
            blocks: vec![Block::genesis()],
            pending_transactions: Vec::new(),
            utxo_pool,
            difficulty,
            allocations,
        }
    }

    /// Rebuild a chain from a snapshot, re-validating every block
    pub fn from_snapshot(snapshot: ChainSnapshot) -> Result<Self, ChainError> {
        let mut blocks = snapshot.blocks.into_iter();
        match blocks.next() {
            Some(genesis) if genesis.is_genesis() => {}
            _ => return Err(ChainError::EmptyChainViolation),
        }

        let mut chain = Self::new(snapshot.difficulty, snapshot.allocations);
        for block in blocks {
            chain.add_block(block)?;
        }

        for tx in snapshot.pending_transactions {
            let id = tx.id.clone();
            if let Err(e) = chain.submit_transaction(tx) {
                log::warn!("Dropping stored pending transaction {}: {}", id, e);
            }
        }

        Ok(chain)
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            difficulty: self.difficulty,
            allocations: self.allocations.clone(),
            blocks: self.blocks.clone(),
            pending_transactions: self.pending_transactions.clone(),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn tip(&self) -> &Block {
        // The genesis block is never removed
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn height(&self) -> u64 {
        self.tip().index
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    pub fn utxo_pool(&self) -> &UtxoPool {
        &self.utxo_pool
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Validate a transaction against the current pool without queueing it
    pub fn verify_transaction(&self, tx: &Transaction) -> Result<(), TxError> {
        TransactionValidator::validate(tx, &self.utxo_pool)
    }

    /// Validate against the current pool and append to the pending queue
    ///
    /// The pool is not touched. Two pending transactions may spend the same
    /// input; the conflict is resolved when a block is assembled.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<(), TxError> {
        if self.pending_transactions.iter().any(|p| p.id == tx.id) {
            return Err(TxError::DuplicateTransaction(tx.id));
        }
        self.verify_transaction(&tx)?;

        log::debug!("Queued transaction {} ({} pending)", tx.id, self.pending_transactions.len() + 1);
        self.pending_transactions.push(tx);
        Ok(())
    }

    /// Assemble the next block from the pending queue
    ///
    /// Pending transactions are re-validated in submission order against a
    /// scratch pool that already reflects the earlier survivors, so the
    /// second of two spends of one input is rejected here.
    pub fn prepare_block(&self) -> Result<BlockTemplate, ChainError> {
        if self.pending_transactions.is_empty() {
            return Err(ChainError::NoPendingTransactions);
        }

        let mut overlay = PoolOverlay::new(&self.utxo_pool);
        let mut included = Vec::new();
        let mut rejected = Vec::new();

        for tx in &self.pending_transactions {
            match TransactionValidator::validate(tx, &overlay) {
                Ok(()) => {
                    overlay.apply_transaction(tx);
                    included.push(tx.clone());
                }
                Err(error) => {
                    log::warn!("Dropping pending transaction {}: {}", tx.id, error);
                    rejected.push(RejectedTransaction {
                        transaction: tx.clone(),
                        error,
                    });
                }
            }
        }

        let tip = self.tip();
        let timestamp = now_millis().max(tip.timestamp);
        Ok(BlockTemplate {
            block: Block::new(tip.index + 1, timestamp, included, tip.hash, 0),
            rejected,
        })
    }

    /// Append a block mined from a template produced by `prepare_block`
    ///
    /// Returns `false` without changing anything if the tip moved since the
    /// template was prepared.
    pub fn commit_mined(&mut self, block: Block, rejected: &[RejectedTransaction]) -> bool {
        if block.previous_hash != self.tip().hash {
            log::debug!("Discarding mined block {}: tip moved", block.index);
            return false;
        }

        let removed: HashSet<&str> = block
            .transactions
            .iter()
            .map(|tx| tx.id.as_str())
            .chain(rejected.iter().map(|r| r.transaction.id.as_str()))
            .collect();
        self.pending_transactions.retain(|tx| !removed.contains(tx.id.as_str()));

        self.settle(block);
        true
    }

    /// Mine the pending queue into a new block on this thread
    pub fn mine_block(&mut self, cancel: &CancelToken, check_interval: u64) -> Result<MineOutcome, ChainError> {
        let template = self.prepare_block()?;
        let mut block = template.block;
        let miner = Miner::new(self.difficulty, check_interval);

        match miner.mine(&mut block, cancel) {
            MiningOutcome::Cancelled { .. } => Ok(MineOutcome::Cancelled),
            MiningOutcome::Mined(result) => {
                // `&mut self` is held throughout, so the tip cannot have moved
                let committed = self.commit_mined(block.clone(), &template.rejected);
                debug_assert!(committed);
                Ok(MineOutcome::Mined(MiningReport {
                    block,
                    rejected: template.rejected,
                    attempts: result.attempts,
                    duration: result.duration,
                }))
            }
        }
    }

    /// Validate and append a block produced elsewhere
    ///
    /// All-or-nothing: on error the chain is exactly as before the call.
    pub fn add_block(&mut self, block: Block) -> Result<(), ChainError> {
        let validator = BlockValidator::new(self.difficulty);
        if let Err(e) = validator.validate_block(&block, self.tip(), &self.utxo_pool) {
            log::warn!("Rejected block {}: {}", block.index, e);
            return Err(e);
        }

        let settled: HashSet<&str> = block.transactions.iter().map(|tx| tx.id.as_str()).collect();
        self.pending_transactions.retain(|tx| !settled.contains(tx.id.as_str()));

        self.settle(block);
        Ok(())
    }

    /// Apply a validated block's transactions to the pool and append it
    fn settle(&mut self, block: Block) {
        for tx in &block.transactions {
            self.utxo_pool.apply_transaction(tx);
        }
        log::info!(
            "Appended block {} ({} transactions) hash {}",
            block.index,
            block.transactions.len(),
            block.hash
        );
        self.blocks.push(block);
    }

    /// Check linkage, hashes and PoW from genesis to tip
    pub fn is_valid(&self) -> bool {
        let Some((genesis, rest)) = self.blocks.split_first() else {
            return false;
        };
        if !genesis.is_genesis() {
            return false;
        }

        let mut previous = genesis;
        for block in rest {
            if block.index != previous.index + 1
                || block.previous_hash != previous.hash
                || !crate::consensus::validate_pow(block, self.difficulty)
            {
                return false;
            }
            previous = block;
        }
        true
    }

    /// Hash of the current tip
    pub fn tip_hash(&self) -> Hash256 {
        self.tip().hash
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
