// Error types for the ledger core

use thiserror::Error;

/// Reasons a transaction is refused, either at submission or at settlement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("Transaction amount must be positive")]
    InvalidAmount,

    #[error("Input UTXO {0} is unknown, already spent, or not owned by the sender")]
    UnknownOrUnauthorizedUTXO(String),

    #[error("Inputs hold {available} but the transaction spends {required}")]
    InsufficientInputs { required: String, available: String },

    #[error("Invalid signature")]
    InvalidSignature,

    /// Output list is empty, has more than one id, or names an input, a live
    /// UTXO or an id spent earlier
    #[error("Invalid outputs: {0}")]
    InvalidOutputs(String),

    #[error("Transaction {0} is already pending")]
    DuplicateTransaction(String),
}

/// Reasons a block or a restored chain is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Block index mismatch: expected {expected}, got {actual}")]
    IndexMismatch { expected: u64, actual: u64 },

    #[error("Previous hash does not match the chain tip")]
    PreviousHashMismatch,

    #[error("Block hash does not meet the difficulty target")]
    InvalidProofOfWork,

    #[error("Stored block hash does not match its contents")]
    HashMismatch,

    #[error("Transaction {0} spends an output already spent in this block")]
    TransactionConflict(String),

    #[error("Chain must start with the fixed genesis block")]
    EmptyChainViolation,

    #[error("Block timestamp {actual} is earlier than the tip's {tip}")]
    InvalidTimestamp { tip: u64, actual: u64 },

    #[error("Transaction id {0} appears more than once in the block")]
    DuplicateTransactionId(String),

    #[error("Transaction {index} in block is invalid: {source}")]
    InvalidTransaction {
        index: usize,
        #[source]
        source: TxError,
    },

    #[error("No pending transactions to mine")]
    NoPendingTransactions,
}

/// Key material that cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Malformed key: {0}")]
    MalformedKey(String),
}

/// Persistence failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored chain is invalid: {0}")]
    InvalidChain(#[from] ChainError),
}

/// Configuration problems detected at load time
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Difficulty must be between 1 and 256 bits, got {0}")]
    InvalidDifficulty(u32),

    #[error("Cancel check interval must be positive")]
    InvalidCancelInterval,
}
