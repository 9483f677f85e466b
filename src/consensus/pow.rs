// Proof of Work implementation

use crate::core::{Block, Hash256, hash256};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Difficulty as a required count of leading zero bits (1..=256)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Difficulty(u32);

impl Difficulty {
    /// Four leading zero hex digits
    pub const DEFAULT: Difficulty = Difficulty(16);

    pub fn new(bits: u32) -> Result<Self, ConfigError> {
        if bits == 0 || bits > 256 {
            return Err(ConfigError::InvalidDifficulty(bits));
        }
        Ok(Self(bits))
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Check if a hash meets this difficulty
    pub fn is_met_by(&self, hash: &Hash256) -> bool {
        hash.leading_zero_bits() >= self.0
    }
}

impl TryFrom<u32> for Difficulty {
    type Error = ConfigError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        Self::new(bits)
    }
}

impl From<Difficulty> for u32 {
    fn from(difficulty: Difficulty) -> u32 {
        difficulty.0
    }
}

/// Externally settable flag that stops a nonce search
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Proof of Work miner
pub struct Miner {
    pub difficulty: Difficulty,
    /// Nonce attempts between two looks at the cancel token
    check_interval: u64,
}

impl Miner {
    pub fn new(difficulty: Difficulty, check_interval: u64) -> Self {
        Self {
            difficulty,
            check_interval: check_interval.max(1),
        }
    }

    /// Search nonces from 0 upward until the block's hash meets the difficulty
    ///
    /// The block's timestamp and transactions stay fixed; only `nonce` and
    /// `hash` are written. There is no attempt cap: the search ends on a
    /// qualifying hash or when `cancel` is observed.
    pub fn mine(&self, block: &mut Block, cancel: &CancelToken) -> MiningOutcome {
        let start_time = Instant::now();
        let prefix = block.encode_without_nonce();
        let mut buf = Vec::with_capacity(prefix.len() + 8);
        let mut attempts = 0u64;
        let mut nonce = 0u64;

        loop {
            if attempts % self.check_interval == 0 && cancel.is_cancelled() {
                log::debug!("Mining cancelled after {} attempts", attempts);
                return MiningOutcome::Cancelled { attempts };
            }

            buf.clear();
            buf.extend_from_slice(&prefix);
            buf.extend_from_slice(&nonce.to_le_bytes());
            let hash = hash256(&buf);
            attempts += 1;

            if self.difficulty.is_met_by(&hash) {
                block.nonce = nonce;
                block.hash = hash;
                return MiningOutcome::Mined(MiningResult {
                    nonce,
                    hash,
                    attempts,
                    duration: start_time.elapsed(),
                });
            }

            // Progress indicator every 100k attempts
            if attempts % 100_000 == 0 {
                let elapsed = start_time.elapsed();
                log::debug!("Mining attempts: {} ({:.1} KH/s)",
                    attempts,
                    attempts as f64 / elapsed.as_secs_f64() / 1000.0
                );
            }

            nonce = nonce.wrapping_add(1);
        }
    }
}

/// Result of a successful search
#[derive(Debug, Clone)]
pub struct MiningResult {
    pub nonce: u64,
    pub hash: Hash256,
    pub attempts: u64,
    pub duration: Duration,
}

impl MiningResult {
    /// Calculate hash rate (hashes per second)
    pub fn hash_rate(&self) -> f64 {
        self.attempts as f64 / self.duration.as_secs_f64()
    }
}

/// How a nonce search ended
#[derive(Debug, Clone)]
pub enum MiningOutcome {
    Mined(MiningResult),
    Cancelled { attempts: u64 },
}

/// Verify that a block's stored hash is its own digest and meets the difficulty
///
/// A stored hash that does not match the recomputed digest fails even when
/// it would satisfy the difficulty.
pub fn validate_pow(block: &Block, difficulty: Difficulty) -> bool {
    let recomputed = block.compute_hash();
    recomputed == block.hash && difficulty.is_met_by(&recomputed)
}
