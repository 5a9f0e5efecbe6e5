//! Threshold membership and signature verification
//!
//! Provides the M-of-N member set an engine is constructed with, and the
//! signature bundle that proves a quorum of members approved an action.
//!
//! # Example
//!
//! ```ignore
//! use msig::multisig::{MemberSet, SignatureBundle};
//!
//! // 2-of-3, addresses strictly ascending
//! let members = MemberSet::new(vec![a, b, c], 2)?;
//!
//! // Signatures must be supplied in ascending signer order
//! let bundle = SignatureBundle::from_parts([sig_a, sig_c]);
//! let signers = bundle.verify(&signing_hash, &members)?;
//! ```

pub mod members;
pub mod signatures;

pub use members::{ConfigError, MemberSet, MAX_MEMBERS, MIN_MEMBERS};
pub use signatures::{AuthError, SignatureBundle};
