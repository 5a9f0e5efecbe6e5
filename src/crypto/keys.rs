//! Recoverable ECDSA signatures over secp256k1
//!
//! Provides key pair generation, signing of structured-data hashes, and
//! recovery of the signing identity from a `(v, r, s)` triple.

use alloy_primitives::{Address, B256};
use rand::rngs::OsRng;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hash::{decode_hex, personal_digest};

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// One signer's contribution, split into its components
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParts {
    /// Recovery id, 27 or 28 (0 and 1 are accepted on input)
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl SignatureParts {
    fn recovery_id(&self) -> Result<RecoveryId, KeyError> {
        let id = match self.v {
            0 | 1 => self.v,
            27 | 28 => self.v - 27,
            other => return Err(KeyError::InvalidRecoveryId(other)),
        };
        Ok(RecoveryId::from_i32(id as i32)?)
    }
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key (`0x` optional)
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = decode_hex(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Identity of this key
    pub fn address(&self) -> Address {
        public_key_to_address(&self.public_key)
    }

    /// Sign a 32-byte signing hash using the personal-message convention
    pub fn sign_hash(&self, signing_hash: &B256) -> SignatureParts {
        let secp = Secp256k1::new();
        let message = Message::from_digest(personal_digest(signing_hash).0);
        let signature = secp.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recovery_id, compact) = signature.serialize_compact();

        SignatureParts {
            v: 27 + recovery_id.to_i32() as u8,
            r: B256::from_slice(&compact[..32]),
            s: B256::from_slice(&compact[32..]),
        }
    }
}

/// Convert a public key to its 20-byte identity
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    Address::from_raw_public_key(&uncompressed[1..])
}

/// Recover the identity that produced `parts` over `signing_hash`
pub fn recover_signer(signing_hash: &B256, parts: &SignatureParts) -> Result<Address, KeyError> {
    let secp = Secp256k1::new();
    let recovery_id = parts.recovery_id()?;

    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(parts.r.as_slice());
    compact[32..].copy_from_slice(parts.s.as_slice());
    let signature = RecoverableSignature::from_compact(&compact, recovery_id)
        .map_err(|_| KeyError::InvalidSignature)?;

    let message = Message::from_digest(personal_digest(signing_hash).0);
    let public_key = secp
        .recover_ecdsa(&message, &signature)
        .map_err(|_| KeyError::InvalidSignature)?;
    Ok(public_key_to_address(&public_key))
}
