//! Misbehaving conduits for exercising the router's failure handling.

use consideration_ledger::Ledger;
use consideration_types::{Address, ConduitTransfer, RevertData};

use crate::conduit::{Conduit, LedgerConduit};

/// Performs the transfers like the standard conduit, then returns the wrong
/// magic value.
#[derive(Debug, Clone, Copy)]
pub struct InvalidMagicConduit {
    inner: LedgerConduit,
}

impl InvalidMagicConduit {
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            inner: LedgerConduit::new(address),
        }
    }
}

impl Conduit for InvalidMagicConduit {
    fn execute(
        &mut self,
        ledger: &mut Ledger,
        transfers: &[ConduitTransfer],
    ) -> Result<[u8; 4], RevertData> {
        self.inner.execute(ledger, transfers)?;
        Ok([0xde, 0xad, 0xbe, 0xef])
    }
}

/// Reverts every call with fixed data.
#[derive(Debug, Clone)]
pub struct RevertingConduit {
    revert: RevertData,
}

impl RevertingConduit {
    #[must_use]
    pub fn new(revert: RevertData) -> Self {
        Self { revert }
    }

    #[must_use]
    pub fn with_message(reason: &str) -> Self {
        Self::new(RevertData::message(reason))
    }

    #[must_use]
    pub fn with_panic(code: u64) -> Self {
        Self::new(RevertData::panic(code))
    }

    #[must_use]
    pub fn silent() -> Self {
        Self::new(RevertData::empty())
    }
}

impl Conduit for RevertingConduit {
    fn execute(
        &mut self,
        _ledger: &mut Ledger,
        _transfers: &[ConduitTransfer],
    ) -> Result<[u8; 4], RevertData> {
        Err(self.revert.clone())
    }
}
