//! Actions awaiting authorization
//!
//! An action is what members sign: a call to `target` carrying `value` and
//! `payload`, executed either directly or in the engine's own context. The
//! nonce is not part of the struct, the queue assigns it at load time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{Address, U256};

/// How the target is invoked
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallMode {
    /// Plain call, value moves to the target
    #[default]
    DirectCall,
    /// Target's code runs against the engine's own balance and identity
    DelegatedCall,
}

impl CallMode {
    /// Value of the mode field when hashed
    pub fn as_word_value(&self) -> u64 {
        match self {
            CallMode::DirectCall => 0,
            CallMode::DelegatedCall => 1,
        }
    }

    pub fn from_delegate_flag(delegate: bool) -> Self {
        if delegate {
            CallMode::DelegatedCall
        } else {
            CallMode::DirectCall
        }
    }

    pub fn is_delegated(&self) -> bool {
        matches!(self, CallMode::DelegatedCall)
    }
}

impl fmt::Display for CallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallMode::DirectCall => write!(f, "call"),
            CallMode::DelegatedCall => write!(f, "delegatecall"),
        }
    }
}

/// A proposed call, before a nonce is bound to it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Destination identity
    pub target: Address,
    /// Native amount sent with a direct call
    pub value: U256,
    /// Opaque calldata
    pub payload: Vec<u8>,
    pub mode: CallMode,
    /// Deadline for loading, 0 means never
    pub expiry: u64,
}

impl Action {
    /// A direct call with no expiry
    pub fn call(target: Address, value: U256, payload: Vec<u8>) -> Self {
        Self {
            target,
            value,
            payload,
            mode: CallMode::DirectCall,
            expiry: 0,
        }
    }

    /// A delegated call with no expiry
    pub fn delegate(target: Address, payload: Vec<u8>) -> Self {
        Self {
            target,
            value: U256::ZERO,
            payload,
            mode: CallMode::DelegatedCall,
            expiry: 0,
        }
    }

    pub fn with_expiry(mut self, expiry: u64) -> Self {
        self.expiry = expiry;
        self
    }

    /// Whether the action can no longer be loaded at `now`
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiry != 0 && self.expiry < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_expiry_never_expires() {
        let action = Action::call(Address::ZERO, U256::from(1), Vec::new());
        assert!(!action.is_expired(u64::MAX));
    }

    #[test]
    fn test_expiry_boundary() {
        let action = Action::call(Address::ZERO, U256::from(1), Vec::new()).with_expiry(100);
        assert!(!action.is_expired(99));
        assert!(!action.is_expired(100));
        assert!(action.is_expired(101));
    }

    #[test]
    fn test_mode_word_values() {
        assert_eq!(CallMode::DirectCall.as_word_value(), 0);
        assert_eq!(CallMode::DelegatedCall.as_word_value(), 1);
        assert_eq!(CallMode::from_delegate_flag(true), CallMode::DelegatedCall);
        assert!(!CallMode::default().is_delegated());
    }
}
