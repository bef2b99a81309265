//! Offerer signatures over order hashes.
//!
//! An [`OrderSignature`] carries the ed25519 public key alongside the
//! signature bytes; the signer's [`Address`] is derived from the key, so
//! verification checks both "the key signed this hash" and "the key belongs
//! to the offerer".

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::{Address, ConsiderationError, OrderHash, Result};

/// Address controlled by an ed25519 verifying key.
#[must_use]
pub fn address_of(key: &VerifyingKey) -> Address {
    Address::from_public_key(key.as_bytes())
}

/// Detached ed25519 signature over an [`OrderHash`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSignature {
    /// Signer's ed25519 public key.
    pub public_key: [u8; 32],
    /// 64-byte ed25519 signature.
    pub signature: Vec<u8>,
}

impl OrderSignature {
    #[must_use]
    pub fn sign(key: &SigningKey, order_hash: &OrderHash) -> Self {
        let signature = key.sign(order_hash.as_bytes());
        Self {
            public_key: key.verifying_key().to_bytes(),
            signature: signature.to_bytes().to_vec(),
        }
    }

    /// Address of the key that produced this signature.
    #[must_use]
    pub fn signer(&self) -> Address {
        Address::from_public_key(&self.public_key)
    }

    /// Verify that `expected_signer` signed `order_hash`.
    pub fn verify(&self, expected_signer: Address, order_hash: &OrderHash) -> Result<()> {
        if self.signer() != expected_signer {
            return Err(ConsiderationError::InvalidSignature);
        }
        let key = VerifyingKey::from_bytes(&self.public_key)
            .map_err(|_| ConsiderationError::InvalidSignature)?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| ConsiderationError::InvalidSignature)?;
        key.verify(order_hash.as_bytes(), &signature)
            .map_err(|_| ConsiderationError::InvalidSignature)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
pub fn random_signing_key() -> SigningKey {
    SigningKey::generate(&mut rand::rngs::OsRng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let key = random_signing_key();
        let signer = address_of(&key.verifying_key());
        let hash = OrderHash([9u8; 32]);
        let sig = OrderSignature::sign(&key, &hash);
        assert_eq!(sig.signer(), signer);
        assert!(sig.verify(signer, &hash).is_ok());
    }

    #[test]
    fn wrong_hash_rejected() {
        let key = random_signing_key();
        let signer = address_of(&key.verifying_key());
        let sig = OrderSignature::sign(&key, &OrderHash([1u8; 32]));
        let err = sig.verify(signer, &OrderHash([2u8; 32])).unwrap_err();
        assert_eq!(err, ConsiderationError::InvalidSignature);
    }

    #[test]
    fn wrong_signer_rejected() {
        let key = random_signing_key();
        let hash = OrderHash([3u8; 32]);
        let sig = OrderSignature::sign(&key, &hash);
        let err = sig.verify(Address::derive("mallory"), &hash).unwrap_err();
        assert_eq!(err, ConsiderationError::InvalidSignature);
    }

    #[test]
    fn truncated_signature_rejected() {
        let key = random_signing_key();
        let signer = address_of(&key.verifying_key());
        let hash = OrderHash([4u8; 32]);
        let mut sig = OrderSignature::sign(&key, &hash);
        sig.signature.truncate(10);
        assert!(sig.verify(signer, &hash).is_err());
    }
}
