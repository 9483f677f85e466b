// Chain state and its shared handle

mod blockchain;
mod ledger;

pub use blockchain::{
    BlockTemplate, Blockchain, ChainSnapshot, MineOutcome, MiningReport, RejectedTransaction,
};
pub use ledger::Ledger;
