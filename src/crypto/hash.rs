//! Keccak-256 hashing and 32-byte word parsing
//!
//! Every structured hash in the engine is keccak-256 over a concatenation of
//! fixed-width big-endian words. Word and integer layout comes from
//! `alloy_primitives`; this module adds the text parsing used by templates
//! and the CLI.

use alloy_primitives::{eip191_hash_message, Keccak256, B256, U256};
use std::str::FromStr;
use thiserror::Error;

pub use alloy_primitives::keccak256;

/// Errors raised while decoding fixed-width values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("Invalid integer: {0}")]
    InvalidInteger(String),
}

/// Computes keccak-256 over the concatenation of `words`
pub fn keccak256_words(words: &[B256]) -> B256 {
    let mut hasher = Keccak256::new();
    for word in words {
        hasher.update(word);
    }
    hasher.finalize()
}

/// Digest a signer actually feeds to ECDSA for a 32-byte signing hash
///
/// This is the personal-message convention:
/// `keccak256("\x19Ethereum Signed Message:\n32" ∥ hash)`.
pub fn personal_digest(hash: &B256) -> B256 {
    eip191_hash_message(hash)
}

/// Left-pads a 64-bit unsigned integer into a word
pub fn u64_word(value: u64) -> B256 {
    B256::from(U256::from(value).to_be_bytes::<32>())
}

/// Left-pads a 256-bit unsigned integer into a word
pub fn u256_word(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

/// Reads a word as a 256-bit unsigned integer
pub fn word_u256(word: &B256) -> U256 {
    U256::from_be_bytes(word.0)
}

/// Decodes hex with an optional `0x` prefix
pub fn decode_hex(input: &str) -> Result<Vec<u8>, EncodingError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).map_err(|_| EncodingError::InvalidHex(input.to_string()))
}

/// Parses a hex string into exactly 32 bytes
pub fn parse_word(input: &str) -> Result<B256, EncodingError> {
    let bytes = decode_hex(input)?;
    if bytes.len() != 32 {
        return Err(EncodingError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        });
    }
    Ok(B256::from_slice(&bytes))
}

/// Parses a decimal or `0x`-hex unsigned integer
pub fn parse_u256(input: &str) -> Result<U256, EncodingError> {
    U256::from_str(input.trim()).map_err(|_| EncodingError::InvalidInteger(input.to_string()))
}
