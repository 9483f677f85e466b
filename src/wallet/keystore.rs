// Key management: generation, signing and verification over secp256k1

use crate::core::{PublicKeyHex, sha256_hash};
use crate::error::KeyError;
use secp256k1::ecdsa::Signature;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use rand::rngs::OsRng;
use std::sync::LazyLock;

/// Shared signing/verification context
static SECP: LazyLock<Secp256k1<All>> = LazyLock::new(Secp256k1::new);

/// Key pair
///
/// The public key is always derived from the secret key, never stored on
/// its own. `Debug` does not print the secret.
#[derive(Clone)]
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new key pair from the OS random source
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = secret_key.public_key(&*SECP);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create from secret key bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let secret_key = SecretKey::from_slice(bytes)
            .map_err(|e| KeyError::MalformedKey(format!("Invalid secret key: {}", e)))?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Create from a hex-encoded 32-byte secret key
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(secret_hex)
            .map_err(|e| KeyError::MalformedKey(format!("Invalid hex: {}", e)))?;
        Self::from_secret_bytes(&bytes)
    }

    /// Hex of the 32-byte secret scalar, for export only
    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Public key in its external hex form
    pub fn public_key_hex(&self) -> PublicKeyHex {
        PublicKeyHex(hex::encode(self.public_key.serialize()))
    }

    /// Sign a message, returning the 64-byte compact signature
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let digest = Message::from_digest(sha256_hash(message));
        SECP.sign_ecdsa(&digest, &self.secret_key)
            .serialize_compact()
            .to_vec()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Sign with raw secret key bytes
pub fn sign(secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, KeyError> {
    Ok(KeyPair::from_secret_bytes(secret_key)?.sign(message))
}

/// Decode a public key from its hex form
pub fn parse_public_key(public_key: &PublicKeyHex) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(public_key.as_str())
        .map_err(|e| KeyError::MalformedKey(format!("Invalid hex: {}", e)))?;
    PublicKey::from_slice(&bytes)
        .map_err(|e| KeyError::MalformedKey(format!("Invalid public key: {}", e)))
}

/// Verify a compact signature over `message`
///
/// Never errors: a malformed key, a malformed signature and a wrong
/// signature all yield `false`.
pub fn verify(public_key: &PublicKeyHex, message: &[u8], signature: &[u8]) -> bool {
    let Ok(public_key) = parse_public_key(public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_compact(signature) else {
        return false;
    };
    let digest = Message::from_digest(sha256_hash(message));
    SECP.verify_ecdsa(&digest, &signature, &public_key).is_ok()
}
