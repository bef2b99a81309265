//! Raw revert payloads crossing downstream call boundaries.
//!
//! Conduits and receiver hooks fail with a [`RevertData`]: the untouched
//! byte payload. Callers wrap it into a [`ConsiderationError`] exactly once,
//! at the boundary where the routing key and counterparty are known.
//!
//! Layout (selector-prefixed, not bit-exact ABI):
//!
//! ```text
//! Error(string)  : ERROR_STRING_SELECTOR || u32 BE length || utf8 bytes
//! Panic(uint256) : PANIC_SELECTOR || 32-byte BE code
//! custom error   : sha256(signature)[..4] || argument bytes
//! empty          : (no bytes)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ConsiderationError, constants};

/// Four-byte selector for an error or function signature.
#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Sha256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Untouched revert bytes returned by a failed downstream call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevertData(Vec<u8>);

impl RevertData {
    /// A revert with no reason at all.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// `Error(string)` revert.
    #[must_use]
    pub fn message(reason: &str) -> Self {
        let text = reason.as_bytes();
        let len = u32::try_from(text.len()).unwrap_or(u32::MAX);
        let mut out = Vec::with_capacity(8 + text.len());
        out.extend_from_slice(&constants::ERROR_STRING_SELECTOR);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&text[..len as usize]);
        Self(out)
    }

    /// `Panic(uint256)` revert.
    #[must_use]
    pub fn panic(code: u64) -> Self {
        let mut out = Vec::with_capacity(36);
        out.extend_from_slice(&constants::PANIC_SELECTOR);
        out.extend_from_slice(&[0u8; 24]);
        out.extend_from_slice(&code.to_be_bytes());
        Self(out)
    }

    /// Custom error revert: selector of `signature` followed by `args`.
    #[must_use]
    pub fn custom(signature: &str, args: &[u8]) -> Self {
        let mut out = Vec::with_capacity(4 + args.len());
        out.extend_from_slice(&selector(signature));
        out.extend_from_slice(args);
        Self(out)
    }

    /// Encode a typed error as the custom-error revert a contract would raise.
    #[must_use]
    pub fn from_error(err: &ConsiderationError) -> Self {
        Self::custom(err.signature(), err.to_string().as_bytes())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Leading selector, if the payload is at least four bytes long.
    #[must_use]
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.0.get(..4).map(|s| [s[0], s[1], s[2], s[3]])
    }

    /// Whether this payload is the custom error named by `signature`.
    #[must_use]
    pub fn is_custom_error(&self, signature: &str) -> bool {
        self.selector() == Some(selector(signature))
    }

    /// Classify the payload.
    #[must_use]
    pub fn decode(&self) -> RevertReason {
        let Some(sel) = self.selector() else {
            return if self.0.is_empty() {
                RevertReason::Empty
            } else {
                RevertReason::Raw(self.0.clone())
            };
        };
        let body = &self.0[4..];

        if sel == constants::ERROR_STRING_SELECTOR {
            if let Some(text) = decode_string(body) {
                return RevertReason::Message(text);
            }
            return RevertReason::Raw(self.0.clone());
        }

        if sel == constants::PANIC_SELECTOR {
            if body.len() == 32 && body[..24].iter().all(|b| *b == 0) {
                let mut code = [0u8; 8];
                code.copy_from_slice(&body[24..]);
                return RevertReason::Panic(u64::from_be_bytes(code));
            }
            return RevertReason::Raw(self.0.clone());
        }

        RevertReason::Custom {
            selector: sel,
            data: body.to_vec(),
        }
    }

    /// The `Error(string)` reason, if this is one.
    #[must_use]
    pub fn reason_string(&self) -> Option<String> {
        match self.decode() {
            RevertReason::Message(text) => Some(text),
            _ => None,
        }
    }
}

fn decode_string(body: &[u8]) -> Option<String> {
    let len_bytes: [u8; 4] = body.get(..4)?.try_into().ok()?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    let text = body.get(4..)?;
    if text.len() != len {
        return None;
    }
    String::from_utf8(text.to_vec()).ok()
}

impl fmt::Display for RevertData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

/// Decoded shape of a [`RevertData`] payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    Empty,
    /// `Error(string)`.
    Message(String),
    /// `Panic(uint256)`, e.g. [`constants::PANIC_ARITHMETIC`].
    Panic(u64),
    Custom { selector: [u8; 4], data: Vec<u8> },
    /// Fewer than four bytes, or a malformed string / panic payload.
    Raw(Vec<u8>),
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "<empty revert>"),
            Self::Message(text) => write!(f, "Error({text:?})"),
            Self::Panic(code) => write!(f, "Panic(0x{code:02x})"),
            Self::Custom { selector, data } => {
                write!(f, "custom 0x{} ({} bytes)", hex::encode(selector), data.len())
            }
            Self::Raw(bytes) => write!(f, "raw 0x{}", hex::encode(bytes)),
        }
    }
}
