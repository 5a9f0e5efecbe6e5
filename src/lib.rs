//! msig: threshold multisignature authorization with timelocked execution
//!
//! This crate provides:
//! - Fixed, strictly ordered member sets with an M-of-N threshold
//! - Typed-data hashing bound to a chain id and engine address
//! - ECDSA (secp256k1) signer recovery over the signing hash
//! - A FIFO queue of authorized actions gated by a fixed wait
//! - Effect execution against an in-memory ledger with rollback, including
//!   one engine driving another
//! - JSON templates for collecting signatures offline
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use msig::{Action, EngineConfig, ExecutionEngine, KeyPair, Ledger, LoadOutcome};
//! use msig::{address, ManualClock, SignatureBundle, U256};
//!
//! let mut keys: Vec<KeyPair> = (0..2).map(|_| KeyPair::generate()).collect();
//! keys.sort_by_key(|k| k.address());
//!
//! let config = EngineConfig::new(
//!     address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
//!     keys.iter().map(|k| k.address()).collect(),
//!     2,
//!     1337,
//! );
//! let mut engine =
//!     ExecutionEngine::new(&config, Arc::new(ManualClock::new(0)), Ledger::new()).unwrap();
//!
//! let action = Action::call(keys[0].address(), U256::ZERO, Vec::new());
//! let hash = engine.signing_hash(&action);
//! let bundle = SignatureBundle::from_parts(keys.iter().map(|k| k.sign_hash(&hash)));
//!
//! let outcome = engine.load(action, &bundle).unwrap();
//! assert!(matches!(outcome, LoadOutcome::Executed { nonce: 0, .. }));
//! ```

pub mod abi;
pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod domain;
pub mod engine;
pub mod multisig;
pub mod queue;

// Re-export commonly used types
pub use abi::FunctionSignature;
pub use config::{EngineConfig, TxTemplate};
pub use core::{Action, CallMode};
pub use alloy_primitives::address;
pub use crypto::{Address, KeyPair, SignatureParts, B256, U256};
pub use domain::Domain;
pub use engine::{
    EffectExecutor, EngineError, EngineProgram, ExecutionEngine, Fired, Ledger, LoadOutcome,
    ManualClock, SharedEngine, SystemClock,
};
pub use multisig::{MemberSet, SignatureBundle};
pub use queue::{Bolt, PendingQueue};
