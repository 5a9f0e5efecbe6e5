//! Transaction templates shared between co-signers
//!
//! A template describes one action plus the nonce it is expected to load at,
//! and accumulates `(v, r, s)` signatures as each member signs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

use crate::abi::{AbiError, FunctionSignature};
use crate::config::engine::{ConfigFileError, DEFAULT_CHAIN_ID, DEV_ENGINE_ADDRESS};
use crate::core::{Action, CallMode};
use crate::crypto::{Address, SignatureParts, B256, U256};
use crate::domain::Domain;
use crate::multisig::SignatureBundle;

/// Four weeks in seconds, the default validity window of a fresh template
pub const DEFAULT_EXPIRY_WINDOW: u64 = 4 * 7 * 24 * 60 * 60;

/// Template errors
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("File error: {0}")]
    File(#[from] ConfigFileError),
    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),
    #[error("Signer {signer} would break ascending order after {last}")]
    SignerOrder { signer: Address, last: Address },
}

/// One action awaiting signatures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxTemplate {
    pub chain_id: u64,
    /// Engine the action is addressed to
    pub msig_addr: Address,
    pub target_addr: Address,
    /// Function descriptor, empty for a plain value transfer
    #[serde(default)]
    pub func_sig: String,
    #[serde(default)]
    pub func_args: Vec<String>,
    /// Native amount, decimal or `0x` hex
    #[serde(default)]
    pub eth_amount: U256,
    pub nonce: u64,
    #[serde(default)]
    pub expiry: u64,
    #[serde(default)]
    pub delegate: bool,
    #[serde(default)]
    pub v: Vec<u8>,
    #[serde(default)]
    pub r: Vec<B256>,
    #[serde(default)]
    pub s: Vec<B256>,
    #[serde(default)]
    pub signers: Vec<Address>,
}

impl TxTemplate {
    /// Template written by `msig bare`
    pub fn bare(now: u64) -> Self {
        let engine = DEV_ENGINE_ADDRESS;
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            msig_addr: engine,
            target_addr: engine,
            func_sig: "function transfer(address to, uint amount)".to_string(),
            func_args: vec![engine.to_string(), "100".to_string()],
            eth_amount: U256::ZERO,
            nonce: 0,
            expiry: now.saturating_add(DEFAULT_EXPIRY_WINDOW),
            delegate: false,
            v: Vec::new(),
            r: Vec::new(),
            s: Vec::new(),
            signers: Vec::new(),
        }
    }

    /// Encoded calldata for the template's function and arguments
    pub fn payload(&self) -> Result<Vec<u8>, TemplateError> {
        if self.func_sig.trim().is_empty() {
            return Ok(Vec::new());
        }
        let signature = FunctionSignature::parse(&self.func_sig)?;
        Ok(signature.encode_call_str(self.func_args.as_slice())?)
    }

    pub fn action(&self) -> Result<Action, TemplateError> {
        Ok(Action {
            target: self.target_addr,
            value: self.eth_amount,
            payload: self.payload()?,
            mode: CallMode::from_delegate_flag(self.delegate),
            expiry: self.expiry,
        })
    }

    pub fn domain(&self) -> Domain {
        Domain::new(self.chain_id, self.msig_addr)
    }

    /// The hash members sign, at the template's nonce
    pub fn signing_hash(&self) -> Result<B256, TemplateError> {
        Ok(self.domain().signing_hash(&self.action()?, self.nonce))
    }

    /// Append a signature, refusing signers that are not above the last one
    pub fn add_signature(
        &mut self,
        signer: Address,
        parts: SignatureParts,
    ) -> Result<(), TemplateError> {
        if let Some(last) = self.signers.last() {
            if signer <= *last {
                return Err(TemplateError::SignerOrder {
                    signer,
                    last: *last,
                });
            }
        }
        self.v.push(parts.v);
        self.r.push(parts.r);
        self.s.push(parts.s);
        self.signers.push(signer);
        Ok(())
    }

    /// Collected signatures as a bundle
    pub fn bundle(&self) -> SignatureBundle {
        SignatureBundle::new(self.v.clone(), self.r.clone(), self.s.clone())
    }

    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let file = fs::File::open(path).map_err(ConfigFileError::from)?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| TemplateError::File(ConfigFileError::from(e)))
    }

    pub fn save(&self, path: &Path) -> Result<(), TemplateError> {
        let file = fs::File::create(path).map_err(ConfigFileError::from)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| TemplateError::File(ConfigFileError::from(e)))
    }
}
