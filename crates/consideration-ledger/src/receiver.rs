//! ERC721 receiver hooks.
//!
//! A contract account may register a hook that is consulted when an ERC721
//! token is delivered to it on a path that validates receivers. The hook
//! either returns a 4-byte value (which must equal
//! [`ERC721_RECEIVED_MAGIC`](consideration_types::constants::ERC721_RECEIVED_MAGIC)
//! to accept) or reverts with arbitrary data.

use consideration_types::{Address, RevertData};

/// Callback implemented by contracts that accept ERC721 tokens.
pub trait Erc721Receiver {
    /// Called after `identifier` has been moved from `from` by `operator`.
    ///
    /// # Errors
    /// Reverting rejects the token; the data is surfaced to the caller.
    fn on_erc721_received(
        &self,
        operator: Address,
        from: Address,
        identifier: u128,
        data: &[u8],
    ) -> Result<[u8; 4], RevertData>;
}

/// A well-behaved receiver that accepts every token.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptingReceiver;

impl Erc721Receiver for AcceptingReceiver {
    fn on_erc721_received(
        &self,
        _operator: Address,
        _from: Address,
        _identifier: u128,
        _data: &[u8],
    ) -> Result<[u8; 4], RevertData> {
        Ok(consideration_types::constants::ERC721_RECEIVED_MAGIC)
    }
}

/// Returns successfully but with the wrong value.
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct WrongMagicReceiver;

#[cfg(any(test, feature = "test-helpers"))]
impl Erc721Receiver for WrongMagicReceiver {
    fn on_erc721_received(
        &self,
        _operator: Address,
        _from: Address,
        _identifier: u128,
        _data: &[u8],
    ) -> Result<[u8; 4], RevertData> {
        Ok([0xab, 0xcd, 0x12, 0x34])
    }
}

/// Always reverts with the configured data.
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Clone)]
pub struct RevertingReceiver {
    pub revert: RevertData,
}

#[cfg(any(test, feature = "test-helpers"))]
impl RevertingReceiver {
    #[must_use]
    pub fn with_message(reason: &str) -> Self {
        Self {
            revert: RevertData::message(reason),
        }
    }

    #[must_use]
    pub fn with_panic(code: u64) -> Self {
        Self {
            revert: RevertData::panic(code),
        }
    }

    #[must_use]
    pub fn with_custom_error(signature: &str) -> Self {
        Self {
            revert: RevertData::custom(signature, &[]),
        }
    }

    #[must_use]
    pub fn silent() -> Self {
        Self {
            revert: RevertData::empty(),
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Erc721Receiver for RevertingReceiver {
    fn on_erc721_received(
        &self,
        _operator: Address,
        _from: Address,
        _identifier: u128,
        _data: &[u8],
    ) -> Result<[u8; 4], RevertData> {
        Err(self.revert.clone())
    }
}
