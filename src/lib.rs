// Single-node UTXO ledger with proof-of-work

pub mod core;
pub mod consensus;
pub mod storage;
pub mod wallet;
pub mod chain;
pub mod config;
pub mod error;
pub mod cli;

// Re-exports for convenience
pub use core::{Amount, Block, Hash256, PublicKeyHex, Transaction, UtxoId};
pub use consensus::{CancelToken, Difficulty, Miner, BlockValidator, TransactionValidator};
pub use storage::{ChainStore, MemoryStore, SledStore, Utxo, UtxoPool, UtxoView};
pub use wallet::{KeyPair, TransactionBuilder};
pub use chain::{Blockchain, ChainSnapshot, Ledger, MineOutcome, MiningReport, RejectedTransaction};
pub use config::LedgerConfig;
pub use error::{ChainError, ConfigError, KeyError, StorageError, TxError};
pub use cli::{Cli, CliHandler};
