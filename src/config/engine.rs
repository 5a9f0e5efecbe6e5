//! Engine construction parameters
//!
//! Loaded from a JSON deploy file. Domain name, version, and salt are
//! protocol constants and not configurable here.

use alloy_primitives::address;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

use crate::crypto::Address;
use crate::multisig::{ConfigError, MemberSet};

/// Default chain id of a local development network
pub const DEFAULT_CHAIN_ID: u64 = 1337;

/// First contract address on a fresh development network
pub const DEV_ENGINE_ADDRESS: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

/// Addresses of the first two development accounts, ascending
pub const DEV_MEMBERS: [Address; 2] = [
    address!("70997970C51812dc3A010C7d01b50e0d17dc79C8"),
    address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
];

/// Config file errors
#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Parameters an engine instance is created with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine identity, bound into the domain separator
    pub address: Address,
    /// Members in strictly ascending order
    pub members: Vec<Address>,
    pub threshold: usize,
    pub chain_id: u64,
    /// Timelock in seconds, 0 executes on load
    #[serde(default)]
    pub wait: u64,
}

impl EngineConfig {
    pub fn new(address: Address, members: Vec<Address>, threshold: usize, chain_id: u64) -> Self {
        Self {
            address,
            members,
            threshold,
            chain_id,
            wait: 0,
        }
    }

    pub fn with_wait(mut self, wait: u64) -> Self {
        self.wait = wait;
        self
    }

    /// Template written by `msig bare`
    pub fn bare() -> Self {
        Self {
            address: DEV_ENGINE_ADDRESS,
            members: DEV_MEMBERS.to_vec(),
            threshold: 2,
            chain_id: DEFAULT_CHAIN_ID,
            wait: 0,
        }
    }

    /// Validate members and threshold
    pub fn member_set(&self) -> Result<MemberSet, ConfigError> {
        MemberSet::new(self.members.clone(), self.threshold)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let file = fs::File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}
