// Basic value types for the ledger

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 256-bit hash type (32 bytes)
/// Used for block hashes and the genesis sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Create a new Hash256 from a byte array
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a Hash256 from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, String> {
        let bytes: [u8; 32] = slice
            .try_into()
            .map_err(|_| format!("Invalid hash length: expected 32, got {}", slice.len()))?;
        Ok(Self(bytes))
    }

    /// Get the hash as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Zero hash, the genesis block's previous_hash sentinel
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Lowercase hex in natural byte order
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, String> {
        let bytes = hex::decode(hex_str).map_err(|e| format!("Invalid hex string: {}", e))?;
        Self::from_slice(&bytes)
    }

    /// Number of leading zero bits, reading the bytes big-endian
    pub fn leading_zero_bits(&self) -> u32 {
        let mut zeros = 0;
        for byte in &self.0 {
            if *byte == 0 {
                zeros += 8;
            } else {
                zeros += byte.leading_zeros();
                break;
            }
        }
        zeros
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Number of fractional decimal digits carried by an [`Amount`]
pub const AMOUNT_DECIMALS: u32 = 8;

/// Base units per whole coin
pub const UNITS_PER_COIN: u64 = 10u64.pow(AMOUNT_DECIMALS);

/// Fixed-point amount, counted in base units (8 decimal places)
///
/// The textual form is always `<integer>.<8 digits>`; this form is what
/// goes into the canonical transaction message, so it must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_units(units: u64) -> Self {
        Self(units)
    }

    pub fn from_coins(coins: u64) -> Option<Self> {
        coins.checked_mul(UNITS_PER_COIN).map(Self)
    }

    pub fn units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / UNITS_PER_COIN,
            self.0 % UNITS_PER_COIN,
            width = AMOUNT_DECIMALS as usize
        )
    }
}

impl FromStr for Amount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("Invalid amount: {}", s));
        }
        if frac.len() > AMOUNT_DECIMALS as usize || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("Invalid amount: {}", s));
        }

        let whole: u64 = whole.parse().map_err(|_| format!("Amount out of range: {}", s))?;
        let mut frac_units = 0u64;
        if !frac.is_empty() {
            let padded = format!("{:0<width$}", frac, width = AMOUNT_DECIMALS as usize);
            frac_units = padded.parse().map_err(|_| format!("Invalid amount: {}", s))?;
        }

        whole
            .checked_mul(UNITS_PER_COIN)
            .and_then(|units| units.checked_add(frac_units))
            .map(Amount)
            .ok_or_else(|| format!("Amount out of range: {}", s))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Public key in its external form: hex of the 33-byte compressed point
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKeyHex(pub String);

impl PublicKeyHex {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PublicKeyHex {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for PublicKeyHex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an unspent output
pub type UtxoId = String;
