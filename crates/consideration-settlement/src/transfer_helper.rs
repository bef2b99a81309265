//! Transfer helper: the public bulk-transfer entry points.
//!
//! Callers approve the helper's address (direct path) or open a channel for
//! it on their conduit, then move any mix of ERC20 / ERC721 / ERC1155 items
//! to any number of recipients in one atomic call.

use consideration_conduit::ConduitController;
use consideration_ledger::Ledger;
use consideration_types::constants::TRANSFER_HELPER_MAGIC;
use consideration_types::{
    Address, ConduitKey, ConduitTransfer, Result, TransferHelperConfig, TransferHelperItem,
    TransferItem,
};

use crate::executor::BulkTransferExecutor;

/// Stateless bulk transfer entry point.
#[derive(Debug, Clone, Copy)]
pub struct TransferHelper {
    executor: BulkTransferExecutor,
}

impl TransferHelper {
    #[must_use]
    pub fn new(address: Address, validate_erc721_receivers: bool) -> Self {
        Self {
            executor: BulkTransferExecutor::new(address, validate_erc721_receivers),
        }
    }

    #[must_use]
    pub fn from_config(config: &TransferHelperConfig) -> Self {
        Self::new(config.address, config.validate_erc721_receivers)
    }

    /// The helper's own address: the operator users approve, and the channel
    /// conduits must open.
    #[must_use]
    pub fn address(&self) -> Address {
        self.executor.channel()
    }

    /// Transfer `items` from `caller` to each item's recipient.
    ///
    /// Returns [`TRANSFER_HELPER_MAGIC`] on success. On failure no balance
    /// changes.
    pub fn bulk_transfer_to_multiple_recipients(
        &self,
        ledger: &mut Ledger,
        conduits: &mut ConduitController,
        caller: Address,
        items: &[TransferItem],
        conduit_key: ConduitKey,
    ) -> Result<[u8; 4]> {
        let transfers: Vec<ConduitTransfer> = items
            .iter()
            .map(|item| item.to_conduit_transfer(caller))
            .collect();

        if let Err(err) = self
            .executor
            .execute_batch(ledger, conduits, conduit_key, &transfers)
        {
            tracing::warn!(
                caller = %caller,
                conduit_key = %conduit_key,
                items = items.len(),
                error = %err,
                "Bulk transfer rejected"
            );
            return Err(err);
        }

        tracing::info!(
            caller = %caller,
            conduit_key = %conduit_key,
            items = items.len(),
            "Bulk transfer complete"
        );
        Ok(TRANSFER_HELPER_MAGIC)
    }

    /// Transfer `items` from `caller` to a single `recipient`.
    pub fn bulk_transfer(
        &self,
        ledger: &mut Ledger,
        conduits: &mut ConduitController,
        caller: Address,
        items: &[TransferHelperItem],
        recipient: Address,
        conduit_key: ConduitKey,
    ) -> Result<[u8; 4]> {
        let items: Vec<TransferItem> = items
            .iter()
            .map(|item| item.with_recipient(recipient))
            .collect();
        self.bulk_transfer_to_multiple_recipients(ledger, conduits, caller, &items, conduit_key)
    }
}

impl Default for TransferHelper {
    fn default() -> Self {
        Self::from_config(&TransferHelperConfig::default())
    }
}
