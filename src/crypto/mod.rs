//! Cryptographic utilities for the engine
//!
//! This module provides:
//! - Keccak-256 hashing and word encoding
//! - Recoverable ECDSA signatures (secp256k1)
//!
//! Identities, words, and amounts are the `alloy_primitives` types.

pub mod hash;
pub mod keys;

pub use alloy_primitives::{Address, B256, U256};
pub use hash::{
    decode_hex, keccak256, keccak256_words, parse_u256, parse_word, personal_digest, u256_word,
    u64_word, word_u256, EncodingError,
};
pub use keys::{public_key_to_address, recover_signer, KeyError, KeyPair, SignatureParts};
