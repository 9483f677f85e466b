// Consensus and validation logic

pub mod pow;
pub mod validation;

pub use pow::{CancelToken, Difficulty, Miner, MiningOutcome, MiningResult, validate_pow};
pub use validation::{BlockValidator, TransactionValidator};
