// CLI commands

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use crate::chain::{Ledger, MineOutcome};
use crate::config::LedgerConfig;
use crate::consensus::{CancelToken, Difficulty};
use crate::core::{Amount, Block, PublicKeyHex, Transaction};
use crate::storage::{ChainStore, SledStore, Utxo};
use crate::wallet::{KeyPair, TransactionBuilder};

#[derive(Parser)]
#[command(name = "ledger")]
#[command(about = "Single-node UTXO ledger with proof-of-work", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory (overrides the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Difficulty in leading zero bits (overrides the config file)
    #[arg(long, global = true)]
    pub difficulty: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new chain with initial allocations
    Init {
        /// Allocation as OWNER_PUBKEY:AMOUNT:UTXO_ID (repeatable)
        #[arg(long = "alloc")]
        allocations: Vec<String>,
    },

    /// Get chain info
    Info,

    /// Generate a key pair
    Keygen,

    /// Print the whole chain as JSON
    Chain,

    /// Print the UTXO pool as JSON
    Utxos,

    /// Get balance for a public key
    Balance {
        public_key: String,
    },

    /// Build, sign and submit a transfer
    Send {
        /// Sender's private key (hex)
        #[arg(long)]
        secret: String,
        /// Recipient public key
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
        /// Transaction id
        #[arg(long)]
        id: String,
        /// Id of the UTXO the transfer creates
        #[arg(long)]
        output: String,
    },

    /// Submit a signed transaction from a JSON file
    Submit {
        file: PathBuf,
    },

    /// Check a transaction from a JSON file without submitting it
    Verify {
        file: PathBuf,
    },

    /// Mine pending transactions into a block
    Mine,

    /// Append a block received from elsewhere (JSON file)
    AddBlock {
        file: PathBuf,
    },
}

/// CLI handler
pub struct CliHandler {
    config: LedgerConfig,
    store: SledStore,
    /// Difficulty given on the command line, checked against a stored chain
    difficulty_flag: Option<Difficulty>,
}

impl CliHandler {
    /// Resolve configuration and open the data directory
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => LedgerConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => LedgerConfig::default(),
        };
        if let Some(dir) = &cli.data_dir {
            config.data_dir = dir.clone();
        }
        let difficulty_flag = cli.difficulty.map(Difficulty::new).transpose()?;
        if let Some(difficulty) = difficulty_flag {
            config.difficulty = difficulty;
        }

        let store = SledStore::new(config.data_dir.join("chain"))?;
        Ok(Self { config, store, difficulty_flag })
    }

    /// Handle CLI command
    pub fn handle(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { allocations } => self.init(&allocations),
            Commands::Info => self.info(),
            Commands::Keygen => Self::keygen(),
            Commands::Chain => {
                let ledger = self.open()?;
                print_json(&ledger.get_chain())
            }
            Commands::Utxos => {
                let ledger = self.open()?;
                print_json(&ledger.get_utxo_pool())
            }
            Commands::Balance { public_key } => {
                let ledger = self.open()?;
                let owner = PublicKeyHex(public_key);
                println!("{}", ledger.get_utxo_pool().get_balance(&owner));
                Ok(())
            }
            Commands::Send { secret, to, amount, id, output } => {
                self.send(&secret, to, &amount, id, output)
            }
            Commands::Submit { file } => {
                let tx: Transaction = read_json(&file)?;
                let ledger = self.open()?;
                let id = tx.id.clone();
                ledger.submit_transaction(tx)?;
                ledger.save(&self.store)?;
                println!("✓ Transaction {} queued", id);
                Ok(())
            }
            Commands::Verify { file } => {
                let tx: Transaction = read_json(&file)?;
                let ledger = self.open()?;
                match ledger.check_transaction(&tx) {
                    Ok(()) => println!("✓ Transaction {} is valid", tx.id),
                    Err(e) => bail!("Transaction {} is invalid: {}", tx.id, e),
                }
                Ok(())
            }
            Commands::Mine => self.mine(),
            Commands::AddBlock { file } => {
                let block: Block = read_json(&file)?;
                let ledger = self.open()?;
                let index = block.index;
                ledger.add_block(block)?;
                ledger.save(&self.store)?;
                println!("✓ Block {} added", index);
                Ok(())
            }
        }
    }

    /// Open the stored chain; `init` must have run first
    fn open(&self) -> Result<Ledger> {
        if self.store.load()?.is_none() {
            bail!("No chain in {}. Create one with 'ledger init'", self.config.data_dir.display());
        }
        let ledger = Ledger::open(&self.store, &self.config, Vec::new())?;

        // A stored chain keeps the difficulty it was created with
        if let Some(flag) = self.difficulty_flag {
            if flag != ledger.difficulty() {
                bail!(
                    "Chain was created at difficulty {}, --difficulty {} does not apply",
                    ledger.difficulty().bits(),
                    flag.bits()
                );
            }
        }
        Ok(ledger)
    }

    /// Initialize blockchain
    fn init(&self, allocations: &[String]) -> Result<()> {
        if self.store.load()?.is_some() {
            bail!("Chain already exists in {}", self.config.data_dir.display());
        }

        let allocations = allocations
            .iter()
            .map(|entry| parse_allocation(entry))
            .collect::<Result<Vec<_>>>()?;
        let count = allocations.len();

        let ledger = Ledger::open(&self.store, &self.config, allocations)?;
        ledger.save(&self.store)?;

        let chain = ledger.get_chain();
        println!("✓ Genesis block created");
        println!("  Hash: {}", chain[0].hash);
        println!("  Allocations: {}", count);
        Ok(())
    }

    /// Get chain info
    fn info(&self) -> Result<()> {
        let ledger = self.open()?;
        let (chain, pool) = ledger.state();
        let tip = chain.last().ok_or_else(|| anyhow!("Chain is empty"))?;

        println!("Chain Info:");
        println!("  Height: {}", tip.index);
        println!("  Best block: {}", tip.hash);
        println!("  Difficulty: {} bits", ledger.difficulty().bits());
        println!("  Pending transactions: {}", ledger.pending_transactions().len());
        println!("  UTXO count: {}", pool.count());
        Ok(())
    }

    fn keygen() -> Result<()> {
        let keypair = KeyPair::generate();
        print_json(&serde_json::json!({
            "private_key": keypair.secret_hex(),
            "public_key": keypair.public_key_hex(),
        }))
    }

    fn send(&self, secret: &str, to: String, amount: &str, id: String, output: String) -> Result<()> {
        let keypair = KeyPair::from_secret_hex(secret)?;
        let amount: Amount = amount.parse().map_err(|e: String| anyhow!(e))?;
        let ledger = self.open()?;

        let pool = ledger.get_utxo_pool();
        let tx = TransactionBuilder::new(&keypair, &pool).build(id, &PublicKeyHex(to), amount, output)?;
        let tx_id = tx.id.clone();
        ledger.submit_transaction(tx)?;
        ledger.save(&self.store)?;

        println!("✓ Transaction {} queued", tx_id);
        Ok(())
    }

    fn mine(&self) -> Result<()> {
        let ledger = self.open()?;
        println!("Mining at difficulty {}...", ledger.difficulty().bits());

        match ledger.mine_block(&CancelToken::new())? {
            MineOutcome::Mined(report) => {
                ledger.save(&self.store)?;
                println!("✓ Block {} mined", report.block.index);
                println!("  Hash: {}", report.block.hash);
                println!("  Nonce: {}", report.block.nonce);
                println!("  Transactions: {}", report.block.transactions.len());
                println!("  Attempts: {} in {:?}", report.attempts, report.duration);
                for rejected in &report.rejected {
                    println!("  ✗ Dropped {}: {}", rejected.transaction.id, rejected.error);
                }
            }
            MineOutcome::Cancelled => println!("Mining cancelled"),
        }
        Ok(())
    }
}

/// Parse `OWNER:AMOUNT:UTXO_ID`
fn parse_allocation(entry: &str) -> Result<Utxo> {
    let mut parts = entry.splitn(3, ':');
    let (Some(owner), Some(amount), Some(id)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("Allocation must be OWNER:AMOUNT:UTXO_ID, got {}", entry);
    };
    let amount: Amount = amount.parse().map_err(|e: String| anyhow!(e))?;
    Ok(Utxo::new(id, PublicKeyHex::from(owner), amount))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
