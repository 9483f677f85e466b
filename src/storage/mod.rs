// Storage layer: the UTXO pool and chain persistence

mod chain_store;
mod utxo_set;

pub use chain_store::{ChainStore, MemoryStore, SledStore};
pub use utxo_set::{PoolOverlay, Utxo, UtxoPool, UtxoView};
