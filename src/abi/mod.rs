//! Typed calldata encoding
//!
//! Builds action payloads from a function signature descriptor such as
//! `function transfer(address to, uint amount)` and a list of arguments.
//! Arguments are parsed against their declared types; nothing is evaluated.
//!
//! Supported types are the static `address`, `uint<N>`, `bool`, `bytes32`,
//! plus the dynamic `bytes` and arrays `T[]` of a static `T`. Dynamic values
//! follow the standard head/tail layout: an offset word in the head, the
//! length-prefixed data in the tail.

use std::fmt;
use thiserror::Error;

use crate::crypto::{
    decode_hex, keccak256, parse_u256, parse_word, u256_word, u64_word, word_u256, Address,
    EncodingError, B256, U256,
};

/// ABI errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("Invalid function signature: {0}")]
    InvalidSignature(String),
    #[error("Unsupported parameter type: {0}")]
    UnsupportedType(String),
    #[error("Wrong argument count: expected {expected}, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },
    #[error("Argument {index} does not match type {expected}")]
    TypeMismatch { index: usize, expected: String },
    #[error("Value out of range for {0}")]
    OutOfRange(String),
    #[error("Payload too short: {0} bytes")]
    PayloadTooShort(usize),
    #[error("Selector does not match {0}")]
    SelectorMismatch(String),
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

/// Supported parameter types
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Address,
    /// Unsigned integer of the given bit width
    Uint(u16),
    Bool,
    Bytes32,
    Bytes,
    /// Dynamic-length array of a static element type
    Array(Box<ParamType>),
}

impl ParamType {
    fn parse(raw: &str) -> Result<Self, AbiError> {
        if let Some(inner) = raw.strip_suffix("[]") {
            let element = ParamType::parse(inner)?;
            if element.is_dynamic() {
                return Err(AbiError::UnsupportedType(raw.to_string()));
            }
            return Ok(ParamType::Array(Box::new(element)));
        }
        match raw {
            "address" => Ok(ParamType::Address),
            "bool" => Ok(ParamType::Bool),
            "bytes32" => Ok(ParamType::Bytes32),
            "bytes" => Ok(ParamType::Bytes),
            "uint" => Ok(ParamType::Uint(256)),
            other => {
                let bits = other
                    .strip_prefix("uint")
                    .and_then(|b| b.parse::<u16>().ok())
                    .filter(|b| *b > 0 && *b <= 256 && b % 8 == 0)
                    .ok_or_else(|| AbiError::UnsupportedType(other.to_string()))?;
                Ok(ParamType::Uint(bits))
            }
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, ParamType::Bytes | ParamType::Array(_))
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => write!(f, "address"),
            ParamType::Uint(bits) => write!(f, "uint{}", bits),
            ParamType::Bool => write!(f, "bool"),
            ParamType::Bytes32 => write!(f, "bytes32"),
            ParamType::Bytes => write!(f, "bytes"),
            ParamType::Array(element) => write!(f, "{}[]", element),
        }
    }
}

/// A typed argument value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(U256),
    Bool(bool),
    Bytes32(B256),
    Bytes(Vec<u8>),
    Array(Vec<Token>),
}

impl Token {
    /// Parse a string argument as `ty`
    ///
    /// `bytes` is hex, arrays are written `[a, b, c]`.
    pub fn parse(ty: &ParamType, raw: &str) -> Result<Self, AbiError> {
        let raw = raw.trim();
        let token = match ty {
            ParamType::Address => Token::Address(
                raw.parse()
                    .map_err(|_| EncodingError::InvalidHex(raw.to_string()))?,
            ),
            ParamType::Uint(_) => Token::Uint(parse_u256(raw)?),
            ParamType::Bool => match raw {
                "true" | "1" => Token::Bool(true),
                "false" | "0" => Token::Bool(false),
                other => return Err(EncodingError::InvalidInteger(other.to_string()).into()),
            },
            ParamType::Bytes32 => Token::Bytes32(parse_word(raw)?),
            ParamType::Bytes => Token::Bytes(decode_hex(raw)?),
            ParamType::Array(element) => {
                let inner = raw
                    .strip_prefix('[')
                    .and_then(|r| r.strip_suffix(']'))
                    .ok_or_else(|| AbiError::TypeMismatch {
                        index: 0,
                        expected: ty.to_string(),
                    })?
                    .trim();
                let items = if inner.is_empty() {
                    Vec::new()
                } else {
                    inner
                        .split(',')
                        .map(|item| Token::parse(element, item))
                        .collect::<Result<Vec<_>, _>>()?
                };
                Token::Array(items)
            }
        };
        Ok(token)
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Token::Address(address) => Some(*address),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Token::Uint(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Token::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_bytes32(&self) -> Option<B256> {
        match self {
            Token::Bytes32(word) => Some(*word),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Token::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Token]> {
        match self {
            Token::Array(items) => Some(items),
            _ => None,
        }
    }

    fn mismatch(ty: &ParamType, index: usize) -> AbiError {
        AbiError::TypeMismatch {
            index,
            expected: ty.to_string(),
        }
    }

    /// The single head word of a static value
    fn encode_static(&self, ty: &ParamType, index: usize) -> Result<B256, AbiError> {
        match (ty, self) {
            (ParamType::Address, Token::Address(address)) => Ok(address.into_word()),
            (ParamType::Uint(bits), Token::Uint(value)) => {
                if value.bit_len() > usize::from(*bits) {
                    return Err(AbiError::OutOfRange(ty.to_string()));
                }
                Ok(u256_word(*value))
            }
            (ParamType::Bool, Token::Bool(flag)) => Ok(B256::with_last_byte(u8::from(*flag))),
            (ParamType::Bytes32, Token::Bytes32(word)) => Ok(*word),
            _ => Err(Self::mismatch(ty, index)),
        }
    }

    /// The tail section of a dynamic value
    fn encode_tail(&self, ty: &ParamType, index: usize) -> Result<Vec<u8>, AbiError> {
        match (ty, self) {
            (ParamType::Bytes, Token::Bytes(bytes)) => {
                let padded = bytes.len().div_ceil(32) * 32;
                let mut out = Vec::with_capacity(32 + padded);
                out.extend_from_slice(u64_word(bytes.len() as u64).as_slice());
                out.extend_from_slice(bytes);
                out.resize(32 + padded, 0);
                Ok(out)
            }
            (ParamType::Array(element), Token::Array(items)) => {
                let mut out = Vec::with_capacity(32 * (items.len() + 1));
                out.extend_from_slice(u64_word(items.len() as u64).as_slice());
                for item in items {
                    out.extend_from_slice(item.encode_static(element, index)?.as_slice());
                }
                Ok(out)
            }
            _ => Err(Self::mismatch(ty, index)),
        }
    }
}

/// A parsed function signature descriptor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub inputs: Vec<ParamType>,
}

impl FunctionSignature {
    /// Parse `[function] name(type [name], ...)`
    pub fn parse(descriptor: &str) -> Result<Self, AbiError> {
        let invalid = || AbiError::InvalidSignature(descriptor.to_string());

        let trimmed = descriptor.trim();
        let trimmed = trimmed.strip_prefix("function ").unwrap_or(trimmed).trim();

        let open = trimmed.find('(').ok_or_else(invalid)?;
        let close = trimmed.rfind(')').ok_or_else(invalid)?;
        if close < open || !trimmed[close + 1..].trim().is_empty() {
            return Err(invalid());
        }

        let name = trimmed[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid());
        }

        let params = trimmed[open + 1..close].trim();
        let inputs = if params.is_empty() {
            Vec::new()
        } else {
            params
                .split(',')
                .map(|param| {
                    let ty = param.split_whitespace().next().ok_or_else(invalid)?;
                    ParamType::parse(ty)
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            name: name.to_string(),
            inputs,
        })
    }

    /// Canonical form, e.g. `transfer(address,uint256)`
    pub fn canonical(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|t| t.to_string()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// First four bytes of the canonical form's keccak-256
    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.canonical().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    /// Encode a call with typed arguments
    pub fn encode_call(&self, args: &[Token]) -> Result<Vec<u8>, AbiError> {
        if args.len() != self.inputs.len() {
            return Err(AbiError::ArgumentCount {
                expected: self.inputs.len(),
                actual: args.len(),
            });
        }

        let head_len = 32 * args.len();
        let mut head = Vec::with_capacity(4 + head_len);
        let mut tail = Vec::new();
        head.extend_from_slice(&self.selector());
        for (index, (ty, arg)) in self.inputs.iter().zip(args).enumerate() {
            if ty.is_dynamic() {
                let offset = (head_len + tail.len()) as u64;
                head.extend_from_slice(u64_word(offset).as_slice());
                tail.extend_from_slice(&arg.encode_tail(ty, index)?);
            } else {
                head.extend_from_slice(arg.encode_static(ty, index)?.as_slice());
            }
        }
        head.extend_from_slice(&tail);
        Ok(head)
    }

    /// Encode a call from string arguments, parsing each against its type
    pub fn encode_call_str<S: AsRef<str>>(&self, args: &[S]) -> Result<Vec<u8>, AbiError> {
        if args.len() != self.inputs.len() {
            return Err(AbiError::ArgumentCount {
                expected: self.inputs.len(),
                actual: args.len(),
            });
        }
        let tokens = self
            .inputs
            .iter()
            .zip(args)
            .map(|(ty, raw)| Token::parse(ty, raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.encode_call(&tokens)
    }

    /// Whether `payload` starts with this function's selector
    pub fn matches(&self, payload: &[u8]) -> bool {
        payload.len() >= 4 && payload[..4] == self.selector()
    }

    /// Decode calldata produced for this signature back into tokens
    pub fn decode_call(&self, payload: &[u8]) -> Result<Vec<Token>, AbiError> {
        if payload.len() < 4 {
            return Err(AbiError::PayloadTooShort(payload.len()));
        }
        if !self.matches(payload) {
            return Err(AbiError::SelectorMismatch(self.canonical()));
        }

        let body = &payload[4..];
        self.inputs
            .iter()
            .enumerate()
            .map(|(index, ty)| {
                let head = read_word(body, 32 * index)?;
                if ty.is_dynamic() {
                    let offset = word_to_offset(&head, body.len())?;
                    decode_tail(ty, body, offset)
                } else {
                    decode_static(ty, &head)
                }
            })
            .collect()
    }
}

fn read_word(body: &[u8], at: usize) -> Result<B256, AbiError> {
    let end = at
        .checked_add(32)
        .filter(|end| *end <= body.len())
        .ok_or(AbiError::PayloadTooShort(body.len() + 4))?;
    Ok(B256::from_slice(&body[at..end]))
}

/// Offsets and lengths must fit inside the payload
fn word_to_offset(word: &B256, limit: usize) -> Result<usize, AbiError> {
    let value = word_u256(word);
    if value > U256::from(limit) {
        return Err(AbiError::PayloadTooShort(limit + 4));
    }
    Ok(value.as_limbs()[0] as usize)
}

fn decode_static(ty: &ParamType, word: &B256) -> Result<Token, AbiError> {
    match ty {
        ParamType::Address => {
            if word[..12].iter().any(|b| *b != 0) {
                return Err(AbiError::OutOfRange(ty.to_string()));
            }
            Ok(Token::Address(Address::from_word(*word)))
        }
        ParamType::Uint(bits) => {
            let value = word_u256(word);
            if value.bit_len() > usize::from(*bits) {
                return Err(AbiError::OutOfRange(ty.to_string()));
            }
            Ok(Token::Uint(value))
        }
        ParamType::Bool => match word_u256(word) {
            v if v.is_zero() => Ok(Token::Bool(false)),
            v if v == U256::from(1) => Ok(Token::Bool(true)),
            _ => Err(AbiError::OutOfRange(ty.to_string())),
        },
        ParamType::Bytes32 => Ok(Token::Bytes32(*word)),
        ParamType::Bytes | ParamType::Array(_) => Err(AbiError::UnsupportedType(ty.to_string())),
    }
}

fn decode_tail(ty: &ParamType, body: &[u8], offset: usize) -> Result<Token, AbiError> {
    let length = word_to_offset(&read_word(body, offset)?, body.len())?;
    let start = offset + 32;
    match ty {
        ParamType::Bytes => {
            let end = start
                .checked_add(length)
                .filter(|end| *end <= body.len())
                .ok_or(AbiError::PayloadTooShort(body.len() + 4))?;
            Ok(Token::Bytes(body[start..end].to_vec()))
        }
        ParamType::Array(element) => (0..length)
            .map(|i| decode_static(element, &read_word(body, start + 32 * i)?))
            .collect::<Result<Vec<_>, _>>()
            .map(Token::Array),
        _ => Err(AbiError::UnsupportedType(ty.to_string())),
    }
}
