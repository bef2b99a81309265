//! Bulk transfer executor.
//!
//! Executes an ordered list of transfer instructions as one indivisible unit,
//! either directly (the executor's channel address is the operator) or by
//! forwarding the whole list to a conduit. Execution happens inside a ledger
//! transaction: any failure leaves every balance exactly as it was.
//!
//! Direct path, per instruction in list order:
//! 1. Native items rejected (`InvalidItemType`)
//! 2. Shape check (identifier / amount)
//! 3. ERC721: amount must be one, then the receiver hook is consulted if the
//!    recipient is a contract and receiver validation is enabled
//! 4. Ledger transfer

use consideration_conduit::{ConduitController, Route, forward, resolve};
use consideration_ledger::Ledger;
use consideration_types::constants::{ERC721_RECEIVED_MAGIC, NON_RECEIVER_REASON};
use consideration_types::{
    Address, ConduitKey, ConduitTransfer, ConsiderationError, ItemType, Result,
};
use rust_decimal::Decimal;

/// Moves batches of items for one channel (the transfer helper or the
/// marketplace).
#[derive(Debug, Clone, Copy)]
pub struct BulkTransferExecutor {
    /// Operator on the direct path; the channel a conduit must have open.
    channel: Address,
    validate_erc721_receivers: bool,
}

impl BulkTransferExecutor {
    #[must_use]
    pub fn new(channel: Address, validate_erc721_receivers: bool) -> Self {
        Self {
            channel,
            validate_erc721_receivers,
        }
    }

    #[must_use]
    pub fn channel(&self) -> Address {
        self.channel
    }

    /// Execute `transfers` via the path selected by `conduit_key`.
    ///
    /// # Errors
    /// - Routing: `UnknownConduit`, `ChannelNotOpen`
    /// - Direct: item shape errors, `InvalidItemType`,
    ///   `InvalidErc721TransferAmount`, receiver errors, ledger errors
    /// - Conduit: `InvalidErc20Identifier`, `ConduitErrorRevertString`,
    ///   `ConduitErrorRevertBytes`, `InvalidConduit`
    pub fn execute_batch(
        &self,
        ledger: &mut Ledger,
        conduits: &mut ConduitController,
        conduit_key: ConduitKey,
        transfers: &[ConduitTransfer],
    ) -> Result<()> {
        let route = resolve(conduits, conduit_key, self.channel)?;

        ledger.transact(|ledger| -> Result<()> {
            match route {
                Route::Direct => self.execute_direct(ledger, transfers),
                Route::Conduit(handle) => {
                    for transfer in transfers {
                        if transfer.item_type == ItemType::Erc20 {
                            transfer.item_type.validate_identifier(transfer.identifier)?;
                        }
                    }
                    forward(conduits, ledger, &handle, transfers)
                }
            }
        })?;

        tracing::debug!(
            channel = %self.channel,
            conduit_key = %conduit_key,
            transfers = transfers.len(),
            "Batch executed"
        );
        Ok(())
    }

    fn execute_direct(&self, ledger: &mut Ledger, transfers: &[ConduitTransfer]) -> Result<()> {
        for transfer in transfers {
            if transfer.item_type == ItemType::Native {
                return Err(ConsiderationError::InvalidItemType);
            }
            transfer.validate()?;
            match transfer.item_type {
                ItemType::Native => return Err(ConsiderationError::InvalidItemType),
                ItemType::Erc721 => {
                    if transfer.amount != Decimal::ONE {
                        return Err(ConsiderationError::InvalidErc721TransferAmount {
                            amount: transfer.amount,
                        });
                    }
                    if self.validate_erc721_receivers {
                        self.check_erc721_receiver(ledger, transfer)?;
                    }
                    ledger.transfer(self.channel, transfer)?;
                }
                ItemType::Erc20 | ItemType::Erc1155 => ledger.transfer(self.channel, transfer)?,
            }
        }
        Ok(())
    }

    /// Contract recipients must answer the receiver hook with the magic value.
    fn check_erc721_receiver(&self, ledger: &Ledger, transfer: &ConduitTransfer) -> Result<()> {
        let Some(outcome) =
            ledger.call_erc721_receiver(transfer.to, self.channel, transfer.from, transfer.identifier)
        else {
            return Ok(());
        };

        let err = match outcome {
            Ok(magic) if magic == ERC721_RECEIVED_MAGIC => return Ok(()),
            Ok(_) => ConsiderationError::Erc721ReceiverErrorRevertString {
                reason: NON_RECEIVER_REASON.to_string(),
                receiver: transfer.to,
                sender: transfer.from,
                identifier: transfer.identifier,
            },
            Err(revert) => match revert.reason_string() {
                Some(reason) => ConsiderationError::Erc721ReceiverErrorRevertString {
                    reason,
                    receiver: transfer.to,
                    sender: transfer.from,
                    identifier: transfer.identifier,
                },
                None => ConsiderationError::Erc721ReceiverErrorRevertBytes {
                    reason: revert,
                    receiver: transfer.to,
                    sender: transfer.from,
                    identifier: transfer.identifier,
                },
            },
        };
        tracing::warn!(
            receiver = %transfer.to,
            identifier = transfer.identifier,
            error = %err,
            "ERC721 receiver rejected transfer"
        );
        Err(err)
    }
}
