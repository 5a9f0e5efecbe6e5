//! Signature bundles and quorum verification
//!
//! A bundle carries the `(v, r, s)` components of every co-signer as three
//! parallel arrays. Ordering is never trusted from the caller: it is derived
//! from the recovered identities, which must be strictly ascending.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{recover_signer, Address, SignatureParts, B256};
use crate::multisig::members::MemberSet;

/// Per-call authorization failures; the caller must re-collect signatures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Insufficient signatures: have {have}, need {need}")]
    InsufficientSignatures { have: usize, need: usize },
    #[error("Signers not in strictly ascending order at position {0}")]
    OwnerOrderViolation(usize),
    #[error("Signer is not a member: {0}")]
    NotAMember(Address),
    #[error("Invalid signature at position {0}")]
    InvalidSignature(usize),
    #[error("Malformed bundle: {v} v, {r} r, {s} s components")]
    MalformedBundle { v: usize, r: usize, s: usize },
}

/// Parallel signature component arrays
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBundle {
    pub v: Vec<u8>,
    pub r: Vec<B256>,
    pub s: Vec<B256>,
}

impl SignatureBundle {
    pub fn new(v: Vec<u8>, r: Vec<B256>, s: Vec<B256>) -> Self {
        Self { v, r, s }
    }

    /// Build a bundle from whole signatures, keeping their order
    pub fn from_parts(parts: impl IntoIterator<Item = SignatureParts>) -> Self {
        let mut bundle = Self::default();
        for part in parts {
            bundle.push(part);
        }
        bundle
    }

    pub fn push(&mut self, part: SignatureParts) {
        self.v.push(part.v);
        self.r.push(part.r);
        self.s.push(part.s);
    }

    /// Number of signatures, or an error if the component arrays disagree
    pub fn len(&self) -> Result<usize, AuthError> {
        if self.v.len() != self.r.len() || self.v.len() != self.s.len() {
            return Err(AuthError::MalformedBundle {
                v: self.v.len(),
                r: self.r.len(),
                s: self.s.len(),
            });
        }
        Ok(self.v.len())
    }

    /// True only for a well-formed bundle with no signatures
    pub fn is_empty(&self) -> bool {
        self.len().map_or(false, |count| count == 0)
    }

    /// Signature at position `i`
    pub fn part(&self, i: usize) -> Option<SignatureParts> {
        Some(SignatureParts {
            v: *self.v.get(i)?,
            r: *self.r.get(i)?,
            s: *self.s.get(i)?,
        })
    }

    /// Recover every signer of `signing_hash` in bundle order
    pub fn recover_all(&self, signing_hash: &B256) -> Result<Vec<Address>, AuthError> {
        let count = self.len()?;
        let mut signers = Vec::with_capacity(count);
        for i in 0..count {
            let part = self.part(i).ok_or(AuthError::InvalidSignature(i))?;
            let signer =
                recover_signer(signing_hash, &part).map_err(|_| AuthError::InvalidSignature(i))?;
            signers.push(signer);
        }
        Ok(signers)
    }

    /// Verify that a quorum of distinct members signed `signing_hash`
    ///
    /// Over-signing is allowed: any ordered, duplicate-free set of at least
    /// `threshold` members authorizes. Returns the verified signers.
    pub fn verify(
        &self,
        signing_hash: &B256,
        members: &MemberSet,
    ) -> Result<Vec<Address>, AuthError> {
        let signers = self.recover_all(signing_hash)?;

        if !members.quorum_met(signers.len()) {
            return Err(AuthError::InsufficientSignatures {
                have: signers.len(),
                need: members.threshold(),
            });
        }

        // Strictly increasing covers both ordering and duplicates
        if let Some(position) = signers.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(AuthError::OwnerOrderViolation(position + 1));
        }

        if let Some(stranger) = signers.iter().find(|signer| !members.contains(signer)) {
            return Err(AuthError::NotAMember(*stranger));
        }

        log::debug!(
            "Verified {} signatures against {} member set",
            signers.len(),
            members.description()
        );
        Ok(signers)
    }
}
