// Keys, signatures and transaction building

mod keystore;
mod tx_builder;

pub use keystore::{KeyPair, parse_public_key, sign, verify};
pub use tx_builder::{TransactionBuilder, sign_transaction};
