//! Canonical member set
//!
//! Members are held in strictly ascending order, which makes membership a
//! binary search and lets signature verification enforce "no duplicates" with
//! a single ordering check.

use serde::Serialize;
use thiserror::Error;

use crate::crypto::Address;

/// Maximum number of members an engine accepts
pub const MAX_MEMBERS: usize = 16;

/// Minimum number of members an engine accepts
pub const MIN_MEMBERS: usize = 2;

/// Construction-time configuration errors; fatal, never retried
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Too many members: {count} (max: {max})")]
    TooManyMembers { count: usize, max: usize },
    #[error("Too few members: {count} (min: {min})")]
    TooFewMembers { count: usize, min: usize },
    #[error("Members not in strictly ascending order at position {0}")]
    BadOrdering(usize),
    #[error("Threshold {threshold} exceeds member count {members}")]
    ThresholdExceedsMembers { threshold: usize, members: usize },
    #[error("Threshold must be at least 1")]
    ZeroThreshold,
}

/// Immutable set of authorized signers with a quorum threshold
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MemberSet {
    members: Vec<Address>,
    threshold: usize,
}

impl MemberSet {
    /// Validate and build a member set
    ///
    /// # Errors
    /// Returns a distinct [`ConfigError`] for each violated constraint
    pub fn new(members: Vec<Address>, threshold: usize) -> Result<Self, ConfigError> {
        if members.len() > MAX_MEMBERS {
            return Err(ConfigError::TooManyMembers {
                count: members.len(),
                max: MAX_MEMBERS,
            });
        }
        if members.len() < MIN_MEMBERS {
            return Err(ConfigError::TooFewMembers {
                count: members.len(),
                min: MIN_MEMBERS,
            });
        }
        if threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if threshold > members.len() {
            return Err(ConfigError::ThresholdExceedsMembers {
                threshold,
                members: members.len(),
            });
        }
        if let Some(position) = members.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::BadOrdering(position + 1));
        }

        Ok(Self { members, threshold })
    }

    pub fn contains(&self, identity: &Address) -> bool {
        self.index_of(identity).is_some()
    }

    /// Position of `identity` in ascending order
    pub fn index_of(&self, identity: &Address) -> Option<usize> {
        self.members.binary_search(identity).ok()
    }

    pub fn quorum_met(&self, count: usize) -> bool {
        count >= self.threshold
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Address] {
        &self.members
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.members.len())
    }
}
