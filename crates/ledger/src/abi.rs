//! Contract interface descriptor and calldata encoding.
//!
//! The deployed contract's interface (function names, selectors, parameter
//! kinds) is loaded from a static JSON descriptor file at startup. Callers
//! work with [`crate::Operation`] values only; nothing outside this module
//! depends on the descriptor format.
//!
//! Encoding is the solidity ABI subset the three contract functions need:
//! a 4-byte selector followed by 32-byte big-endian words, with dynamic
//! strings encoded as an offset word in the head and length plus
//! right-padded bytes in the tail.

use crate::types::Operation;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Width of one ABI word in bytes.
const WORD: usize = 32;

/// Errors raised while loading a descriptor or encoding calldata.
#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    #[error("Failed to read descriptor file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse descriptor: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Function {function}: selector {selector:?} is not a 4-byte hex string")]
    InvalidSelector { function: String, selector: String },

    #[error("Function {function}: descriptor declares {declared} parameters, operation carries {actual}")]
    ParameterMismatch {
        function: String,
        declared: usize,
        actual: usize,
    },
}

/// Parameter kinds the contract interface uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    #[serde(rename = "uint256")]
    Uint256,
    #[serde(rename = "string")]
    Str,
}

/// One function entry in the descriptor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Function name as exported by the contract.
    pub name: String,
    /// 4-byte selector, hex-encoded with `0x` prefix.
    pub selector: String,
    /// Declared parameter kinds, in call order.
    pub inputs: Vec<ParamKind>,
}

impl FunctionDescriptor {
    fn selector_bytes(&self) -> Result<[u8; 4], AbiError> {
        let invalid = || AbiError::InvalidSelector {
            function: self.name.clone(),
            selector: self.selector.clone(),
        };

        let raw = self.selector.strip_prefix("0x").ok_or_else(invalid)?;
        let bytes = hex::decode(raw).map_err(|_| invalid())?;
        bytes.as_slice().try_into().map_err(|_| invalid())
    }
}

/// The contract interface: one function per abstract ledger operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub register: FunctionDescriptor,
    pub open_channel: FunctionDescriptor,
    pub pay: FunctionDescriptor,
}

impl InterfaceDescriptor {
    /// Load a descriptor from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AbiError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Encode an operation into hex calldata for the described contract.
    pub fn encode(&self, op: &Operation) -> Result<String, AbiError> {
        let (function, args) = match op {
            Operation::Register { id, name } => (
                &self.register,
                vec![AbiValue::Uint(id.0), AbiValue::Str(name.clone())],
            ),
            Operation::OpenChannel { a, b, capacity } => (
                &self.open_channel,
                vec![
                    AbiValue::Uint(a.0),
                    AbiValue::Uint(b.0),
                    AbiValue::Uint(*capacity),
                ],
            ),
            Operation::Pay { from, to, amount } => (
                &self.pay,
                vec![
                    AbiValue::Uint(from.0),
                    AbiValue::Uint(to.0),
                    AbiValue::Uint(*amount),
                ],
            ),
        };

        if function.inputs.len() != args.len() {
            return Err(AbiError::ParameterMismatch {
                function: function.name.clone(),
                declared: function.inputs.len(),
                actual: args.len(),
            });
        }

        let mut calldata = function.selector_bytes()?.to_vec();
        calldata.extend_from_slice(&encode_args(&args));
        Ok(format!("0x{}", hex::encode(calldata)))
    }
}

impl Default for InterfaceDescriptor {
    /// Descriptor for the observed contract deployment.
    ///
    /// Selectors come from the contract build artifact; these are the ones
    /// the reference deployment exports. A descriptor file overrides them.
    fn default() -> Self {
        Self {
            register: FunctionDescriptor {
                name: "registerUser".to_string(),
                selector: "0x0932efc5".to_string(),
                inputs: vec![ParamKind::Uint256, ParamKind::Str],
            },
            open_channel: FunctionDescriptor {
                name: "createAcc".to_string(),
                selector: "0x5b1fdcc9".to_string(),
                inputs: vec![ParamKind::Uint256, ParamKind::Uint256, ParamKind::Uint256],
            },
            pay: FunctionDescriptor {
                name: "sendAmount".to_string(),
                selector: "0x8d9bff06".to_string(),
                inputs: vec![ParamKind::Uint256, ParamKind::Uint256, ParamKind::Uint256],
            },
        }
    }
}

/// An argument value to encode.
enum AbiValue {
    Uint(u64),
    Str(String),
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encode arguments as head words plus a tail for dynamic values.
///
/// Offsets in the head are relative to the start of the argument section,
/// i.e. they do not include the selector.
fn encode_args(args: &[AbiValue]) -> Vec<u8> {
    let head_len = args.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        match arg {
            AbiValue::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            AbiValue::Str(value) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));

                let bytes = value.as_bytes();
                tail.extend_from_slice(&uint_word(bytes.len() as u64));
                tail.extend_from_slice(bytes);
                // Right-pad the string data to a word boundary
                let rem = bytes.len() % WORD;
                if rem != 0 {
                    tail.extend(std::iter::repeat(0u8).take(WORD - rem));
                }
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}
