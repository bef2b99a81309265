//! The conduit interface and the standard ledger-backed conduit.
//!
//! A conduit is an intermediary that holds token approvals on behalf of
//! users and moves tokens when an open channel asks it to. It receives a whole
//! batch in one call and either executes all of it or reverts.

use consideration_ledger::Ledger;
use consideration_types::constants::CONDUIT_EXECUTE_MAGIC;
use consideration_types::{Address, ConduitTransfer, RevertData};

/// A transfer intermediary. Implementations return
/// [`CONDUIT_EXECUTE_MAGIC`] on success; anything else is treated as a
/// broken conduit by the router.
pub trait Conduit {
    /// Execute every transfer in order, or none of them.
    ///
    /// # Errors
    /// Raw revert data describing the first failing transfer.
    fn execute(
        &mut self,
        ledger: &mut Ledger,
        transfers: &[ConduitTransfer],
    ) -> Result<[u8; 4], RevertData>;
}

/// The standard conduit: moves tokens through the ledger using its own
/// address as operator. Users approve this address, not the engines.
#[derive(Debug, Clone, Copy)]
pub struct LedgerConduit {
    address: Address,
}

impl LedgerConduit {
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }
}

impl Conduit for LedgerConduit {
    fn execute(
        &mut self,
        ledger: &mut Ledger,
        transfers: &[ConduitTransfer],
    ) -> Result<[u8; 4], RevertData> {
        let operator = self.address;
        ledger.transact(|ledger| -> Result<[u8; 4], RevertData> {
            for transfer in transfers {
                // Native items and ERC721 amounts are rejected by the dispatch.
                ledger
                    .transfer(operator, transfer)
                    .map_err(|err| RevertData::from_error(&err))?;
            }
            Ok(CONDUIT_EXECUTE_MAGIC)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consideration_types::{ConsiderationError, ItemType};
    use rust_decimal::Decimal;

    fn transfer(item_type: ItemType, token: Address, from: Address, to: Address, amount: i64) -> ConduitTransfer {
        ConduitTransfer {
            item_type,
            token,
            from,
            to,
            identifier: 0,
            amount: Decimal::new(amount, 0),
        }
    }

    #[test]
    fn executes_batch_with_own_operator() {
        let mut ledger = Ledger::new();
        let usdc = ledger.deploy_token(ItemType::Erc20).unwrap();
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");
        let conduit_addr = Address::derive("conduit");
        ledger.mint_erc20(usdc, alice, Decimal::new(100, 0)).unwrap();
        ledger.approve(usdc, alice, conduit_addr, Decimal::MAX).unwrap();

        let mut conduit = LedgerConduit::new(conduit_addr);
        let magic = conduit
            .execute(&mut ledger, &[transfer(ItemType::Erc20, usdc, alice, bob, 30)])
            .unwrap();
        assert_eq!(magic, CONDUIT_EXECUTE_MAGIC);
        assert_eq!(ledger.erc20_balance(usdc, bob), Decimal::new(30, 0));
    }

    #[test]
    fn native_reverts_with_invalid_item_type() {
        let mut ledger = Ledger::new();
        let mut conduit = LedgerConduit::new(Address::derive("conduit"));
        let revert = conduit
            .execute(
                &mut ledger,
                &[transfer(ItemType::Native, Address::ZERO, Address::derive("a"), Address::derive("b"), 1)],
            )
            .unwrap_err();
        assert!(revert.is_custom_error(ConsiderationError::InvalidItemType.signature()));
    }

    #[test]
    fn failure_mid_batch_rolls_back_earlier_transfers() {
        let mut ledger = Ledger::new();
        let usdc = ledger.deploy_token(ItemType::Erc20).unwrap();
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");
        let conduit_addr = Address::derive("conduit");
        ledger.mint_erc20(usdc, alice, Decimal::new(10, 0)).unwrap();
        ledger.approve(usdc, alice, conduit_addr, Decimal::MAX).unwrap();

        let mut conduit = LedgerConduit::new(conduit_addr);
        let revert = conduit
            .execute(
                &mut ledger,
                &[
                    transfer(ItemType::Erc20, usdc, alice, bob, 6),
                    transfer(ItemType::Erc20, usdc, alice, bob, 6),
                ],
            )
            .unwrap_err();
        assert!(revert.is_custom_error("InsufficientBalance(address,address)"));
        assert_eq!(ledger.erc20_balance(usdc, alice), Decimal::new(10, 0));
    }
}
