//! Structured-data hashing
//!
//! Binds an action to one engine instance on one chain:
//!
//! ```text
//! domain_separator = keccak(type ∥ name ∥ version ∥ chain_id ∥ engine ∥ salt)
//! action_hash      = keccak(tx_type ∥ target ∥ value ∥ keccak(payload) ∥ nonce ∥ expiry ∥ mode)
//! signing_hash     = keccak(0x19 ∥ 0x01 ∥ domain_separator ∥ action_hash)
//! ```
//!
//! Every field is a 32-byte big-endian word.

use alloy_primitives::{b256, Address, Keccak256, B256, U256};

use crate::core::{Action, CallMode};
use crate::crypto::{keccak256, keccak256_words, u256_word, u64_word};

/// keccak("EIP712Domain(string name,string version,uint256 chainId,address verifyingContract,bytes32 salt)")
pub const EIP712_DOMAIN_TYPE_HASH: B256 =
    b256!("d87cd6ef79d4e2b95e15ce8abf732db51ec771f1ca2edccf22a46c729ac56472");

/// Protocol name hash
pub const NAME_HASH: B256 =
    b256!("e463279c76a26a807fc93adcd7da8c78758960944d3dd615283d0a9fa20efdc6");

/// keccak("1")
pub const VERSION_HASH: B256 =
    b256!("c89efdaa54c0f20c7adf612882df0950f5a951637e0307cdcb4c672f298b8bc6");

/// Type hash of a transaction that carries a call mode
pub const TX_TYPE_HASH: B256 =
    b256!("c22bd03800e8d0fb968a99a54aeb6261577647195ab20a990aaa169b65ddee05");

/// Protocol salt
pub const SALT: B256 = b256!("129d390a401694aef5508ae83353e4124512a4c5bf5b10995b62abe1fb85b650");

/// Hash of the six domain fields
pub fn domain_separator(
    type_hash: &B256,
    name_hash: &B256,
    version_hash: &B256,
    chain_id: u64,
    engine: &Address,
    salt: &B256,
) -> B256 {
    keccak256_words(&[
        *type_hash,
        *name_hash,
        *version_hash,
        u64_word(chain_id),
        engine.into_word(),
        *salt,
    ])
}

/// Hash of one transaction's typed fields
pub fn action_hash(
    tx_type_hash: &B256,
    target: &Address,
    value: U256,
    payload: &[u8],
    nonce: u64,
    expiry: u64,
    mode: CallMode,
) -> B256 {
    keccak256_words(&[
        *tx_type_hash,
        target.into_word(),
        u256_word(value),
        keccak256(payload),
        u64_word(nonce),
        u64_word(expiry),
        u64_word(mode.as_word_value()),
    ])
}

/// The 32 bytes every signer must sign
pub fn signing_hash(domain_separator: &B256, action_hash: &B256) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update([0x19u8, 0x01]);
    hasher.update(domain_separator);
    hasher.update(action_hash);
    hasher.finalize()
}

/// Domain of a single engine instance, with the protocol constants fixed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Domain {
    pub chain_id: u64,
    pub engine: Address,
    separator: B256,
}

impl Domain {
    pub fn new(chain_id: u64, engine: Address) -> Self {
        let separator = domain_separator(
            &EIP712_DOMAIN_TYPE_HASH,
            &NAME_HASH,
            &VERSION_HASH,
            chain_id,
            &engine,
            &SALT,
        );
        Self {
            chain_id,
            engine,
            separator,
        }
    }

    pub fn separator(&self) -> &B256 {
        &self.separator
    }

    /// Action hash under the protocol transaction type, for a given nonce
    pub fn action_hash(&self, action: &Action, nonce: u64) -> B256 {
        action_hash(
            &TX_TYPE_HASH,
            &action.target,
            action.value,
            &action.payload,
            nonce,
            action.expiry,
            action.mode,
        )
    }

    /// Signing hash of `action` at `nonce` within this domain
    pub fn signing_hash(&self, action: &Action, nonce: u64) -> B256 {
        signing_hash(&self.separator, &self.action_hash(action, nonce))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::personal_digest;
    use alloy_primitives::address;

    const ENGINE: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

    #[test]
    fn test_constants_match_their_preimages() {
        assert_eq!(
            keccak256(b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract,bytes32 salt)"),
            EIP712_DOMAIN_TYPE_HASH
        );
        assert_eq!(keccak256(b"1"), VERSION_HASH);
    }

    #[test]
    fn test_domain_separator_vector() {
        let domain = Domain::new(1337, ENGINE);
        assert_eq!(
            *domain.separator(),
            b256!("70a5b83bddd3c39830e77984dcc267947b14cef0d5a843d171eac8e4a035e308")
        );
    }

    #[test]
    fn test_action_and_signing_hash_vector() {
        let domain = Domain::new(1337, ENGINE);
        let wad = U256::from(1_000_000_000_000_000_000u64);
        let action = Action::call(Address::ZERO, wad, Vec::new());

        assert_eq!(
            domain.action_hash(&action, 0),
            b256!("15cf6d737015d08cd415847e21adeb14422b4d79c9d47542b071843050395726")
        );

        let hash = domain.signing_hash(&action, 0);
        assert_eq!(
            hash,
            b256!("ec25b4b430cb55c937a193ae0b26e47ce3d057b9a1c6a2e05053ce0012e19c9b")
        );
        assert_eq!(
            personal_digest(&hash),
            b256!("775ecff8a1810f86e98f623a39f924bf58866cf92a2b322ea0dd0afb658f50e1")
        );
    }

    #[test]
    fn test_delegated_action_vector() {
        let action = Action {
            target: ENGINE,
            value: U256::from(5),
            payload: vec![0xa9, 0x05, 0x9c, 0xbb],
            mode: CallMode::DelegatedCall,
            expiry: 1_700_000_000,
        };
        let domain = Domain::new(1337, ENGINE);
        assert_eq!(
            domain.action_hash(&action, 7),
            b256!("f8ca716a04a7e6551e3c3428708d813987b1fc798272ca239af8d8944ceb7a5a")
        );
    }

    #[test]
    fn test_every_field_is_bound() {
        let domain = Domain::new(1337, ENGINE);
        let base = Action::call(Address::ZERO, U256::from(1), vec![1, 2, 3]);
        let reference = domain.signing_hash(&base, 0);

        let mut changed = base.clone();
        changed.value = U256::from(2);
        assert_ne!(domain.signing_hash(&changed, 0), reference);

        // High bits of the amount are hashed too
        let mut changed = base.clone();
        changed.value = U256::from(1) + (U256::from(1) << 200usize);
        assert_ne!(domain.signing_hash(&changed, 0), reference);

        let mut changed = base.clone();
        changed.payload = vec![1, 2, 4];
        assert_ne!(domain.signing_hash(&changed, 0), reference);

        let mut changed = base.clone();
        changed.mode = CallMode::DelegatedCall;
        assert_ne!(domain.signing_hash(&changed, 0), reference);

        let mut changed = base.clone();
        changed.expiry = 1;
        assert_ne!(domain.signing_hash(&changed, 0), reference);

        assert_ne!(domain.signing_hash(&base, 1), reference);
        assert_ne!(Domain::new(1, ENGINE).signing_hash(&base, 0), reference);
        assert_ne!(Domain::new(1337, Address::ZERO).signing_hash(&base, 0), reference);
    }
}
