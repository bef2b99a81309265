//! Account, routing-key, and order identifiers used throughout Consideration.
//!
//! Everything here is a fixed-width byte newtype. Addresses and keys display
//! as `0x`-prefixed lowercase hex and serialise as hex strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ConsiderationError, constants};

fn parse_hex<const N: usize>(s: &str) -> Result<[u8; N], ConsiderationError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits)
        .map_err(|e| ConsiderationError::Serialization(format!("invalid hex {s:?}: {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        ConsiderationError::Serialization(format!("expected {N} bytes, got {}", b.len()))
    })
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account address (externally owned account or contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The null account.
    pub const ZERO: Self = Self([0u8; 20]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Deterministic address for a human-readable label ("alice", "marketplace").
    #[must_use]
    pub fn derive(label: &str) -> Self {
        Self::from_digest(&[constants::ADDRESS_DOMAIN, label.as_bytes()])
    }

    /// Address controlled by an ed25519 public key.
    #[must_use]
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        Self::from_digest(&[constants::PUBKEY_DOMAIN, public_key])
    }

    /// Last 20 bytes of `sha256(parts...)`.
    #[must_use]
    pub fn from_digest(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        let hash = hasher.finalize();
        let mut out = [0u8; 20];
        out.copy_from_slice(&hash[12..]);
        Self(out)
    }

    /// First four bytes, hex-encoded. Handy in log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ConsiderationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex::<20>(s).map(Self)
    }
}

impl TryFrom<String> for Address {
    type Error = ConsiderationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

// ---------------------------------------------------------------------------
// ConduitKey
// ---------------------------------------------------------------------------

/// Opaque 32-byte routing key selecting direct transfer (zero) or a conduit.
///
/// The leading 20 bytes of a nonzero key name the account allowed to create
/// the conduit; the trailing 12 bytes are a free salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConduitKey(pub [u8; 32]);

impl ConduitKey {
    /// Direct transfer, no intermediary.
    pub const ZERO: Self = Self([0u8; 32]);

    #[must_use]
    pub fn new(creator: Address, salt: [u8; 12]) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..20].copy_from_slice(creator.as_bytes());
        bytes[20..].copy_from_slice(&salt);
        Self(bytes)
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The account permitted to create a conduit under this key.
    #[must_use]
    pub fn creator(&self) -> Address {
        let mut out = [0u8; 20];
        out.copy_from_slice(&self.0[..20]);
        Address(out)
    }
}

impl fmt::Display for ConduitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for ConduitKey {
    type Err = ConsiderationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex::<32>(s).map(Self)
    }
}

impl TryFrom<String> for ConduitKey {
    type Error = ConsiderationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ConduitKey> for String {
    fn from(key: ConduitKey) -> Self {
        key.to_string()
    }
}

// ---------------------------------------------------------------------------
// OrderHash
// ---------------------------------------------------------------------------

/// SHA-256 commitment to an order's signed components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderHash(pub [u8; 32]);

impl OrderHash {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for OrderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    pub fn random() -> Self {
        Self(rand::random::<[u8; 20]>())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
