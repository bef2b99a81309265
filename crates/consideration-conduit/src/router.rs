//! Routing-key resolution and conduit forwarding.
//!
//! A zero [`ConduitKey`] means "move tokens directly"; any other key names a
//! conduit that must exist and have an open channel for the caller. Failures
//! coming back from a conduit are wrapped exactly once here, where the key
//! and conduit address are known.

use consideration_ledger::Ledger;
use consideration_types::constants::CONDUIT_EXECUTE_MAGIC;
use consideration_types::{
    Address, ConduitKey, ConduitTransfer, ConsiderationError, Result, RevertData,
};

use crate::controller::ConduitController;

/// A resolved conduit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConduitHandle {
    pub key: ConduitKey,
    pub address: Address,
}

/// Where a batch will be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Tokens move with the caller as operator.
    Direct,
    Conduit(ConduitHandle),
}

/// Map a routing key to a transfer path for `caller`.
///
/// # Errors
/// - `UnknownConduit` if no conduit exists for a nonzero key
/// - `ChannelNotOpen` if the conduit exists but `caller` has no open channel
pub fn resolve(controller: &ConduitController, key: ConduitKey, caller: Address) -> Result<Route> {
    if key.is_zero() {
        return Ok(Route::Direct);
    }
    let (address, exists) = controller.get_conduit(key);
    if !exists {
        tracing::warn!(conduit_key = %key, caller = %caller, "Unknown conduit key");
        return Err(ConsiderationError::UnknownConduit(key));
    }
    if !controller.get_channel_status(address, caller)? {
        tracing::warn!(conduit = %address, caller = %caller, "Conduit channel closed");
        return Err(ConsiderationError::ChannelNotOpen(caller));
    }
    Ok(Route::Conduit(ConduitHandle { key, address }))
}

/// Send the whole batch to the conduit in one call.
///
/// # Errors
/// A wrapped conduit revert (see [`wrap_conduit_revert`]) or `InvalidConduit`
/// if the conduit returned without the expected magic value.
pub fn forward(
    controller: &mut ConduitController,
    ledger: &mut Ledger,
    handle: &ConduitHandle,
    transfers: &[ConduitTransfer],
) -> Result<()> {
    tracing::debug!(
        conduit = %handle.address,
        transfers = transfers.len(),
        "Forwarding batch to conduit"
    );
    let returned = controller
        .call_conduit(handle.address, ledger, transfers)?
        .map_err(|revert| wrap_conduit_revert(handle, revert))?;
    verify_magic(handle, returned)
}

/// The conduit must echo [`CONDUIT_EXECUTE_MAGIC`].
///
/// # Errors
/// `InvalidConduit` on any other value.
pub fn verify_magic(handle: &ConduitHandle, returned: [u8; 4]) -> Result<()> {
    if returned != CONDUIT_EXECUTE_MAGIC {
        tracing::warn!(
            conduit = %handle.address,
            returned = hex::encode(returned),
            "Conduit returned invalid magic value"
        );
        return Err(ConsiderationError::InvalidConduit {
            conduit_key: handle.key,
            conduit: handle.address,
        });
    }
    Ok(())
}

/// `Error(string)` reverts keep their reason; everything else (including an
/// empty revert) is preserved as raw bytes.
#[must_use]
pub fn wrap_conduit_revert(handle: &ConduitHandle, revert: RevertData) -> ConsiderationError {
    tracing::debug!(conduit = %handle.address, revert = %revert.decode(), "Conduit reverted");
    match revert.reason_string() {
        Some(reason) => ConsiderationError::ConduitErrorRevertString {
            reason,
            conduit_key: handle.key,
            conduit: handle.address,
        },
        None => ConsiderationError::ConduitErrorRevertBytes {
            reason: revert,
            conduit_key: handle.key,
            conduit: handle.address,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{InvalidMagicConduit, RevertingConduit};
    use consideration_types::constants::PANIC_ARITHMETIC;
    use consideration_types::{ItemType, RevertReason};
    use rust_decimal::Decimal;

    fn handle() -> ConduitHandle {
        ConduitHandle {
            key: ConduitKey::new(Address::derive("creator"), [3u8; 12]),
            address: Address::derive("conduit"),
        }
    }

    #[test]
    fn zero_key_is_direct() {
        let controller = ConduitController::default();
        let route = resolve(&controller, ConduitKey::ZERO, Address::derive("anyone")).unwrap();
        assert_eq!(route, Route::Direct);
    }

    #[test]
    fn unknown_key_fails() {
        let controller = ConduitController::default();
        let key = ConduitKey::new(Address::derive("creator"), [5u8; 12]);
        assert_eq!(
            resolve(&controller, key, Address::derive("caller")).unwrap_err(),
            ConsiderationError::UnknownConduit(key)
        );
    }

    #[test]
    fn closed_channel_fails_and_open_channel_resolves() {
        let mut controller = ConduitController::default();
        let creator = Address::derive("creator");
        let caller = Address::derive("helper");
        let key = ConduitKey::new(creator, [0u8; 12]);
        let conduit = controller.create_conduit(creator, key, creator).unwrap();

        assert_eq!(
            resolve(&controller, key, caller).unwrap_err(),
            ConsiderationError::ChannelNotOpen(caller)
        );
        controller.update_channel(creator, conduit, caller, true).unwrap();
        assert_eq!(
            resolve(&controller, key, caller).unwrap(),
            Route::Conduit(ConduitHandle { key, address: conduit })
        );
    }

    #[test]
    fn string_revert_wraps_as_string() {
        let err = wrap_conduit_revert(&handle(), RevertData::message("boom"));
        assert!(matches!(
            err,
            ConsiderationError::ConduitErrorRevertString { ref reason, .. } if reason == "boom"
        ));
    }

    #[test]
    fn empty_panic_and_custom_reverts_wrap_as_bytes() {
        for revert in [
            RevertData::empty(),
            RevertData::panic(PANIC_ARITHMETIC),
            RevertData::from_error(&ConsiderationError::InvalidItemType),
        ] {
            let err = wrap_conduit_revert(&handle(), revert.clone());
            assert_eq!(
                err,
                ConsiderationError::ConduitErrorRevertBytes {
                    reason: revert,
                    conduit_key: handle().key,
                    conduit: handle().address,
                }
            );
        }
    }

    #[test]
    fn wrong_magic_is_invalid_conduit() {
        let h = handle();
        assert!(verify_magic(&h, CONDUIT_EXECUTE_MAGIC).is_ok());
        assert_eq!(
            verify_magic(&h, [0u8; 4]).unwrap_err(),
            ConsiderationError::InvalidConduit {
                conduit_key: h.key,
                conduit: h.address,
            }
        );
    }

    #[test]
    fn forward_wraps_mock_reverts() {
        let mut controller = ConduitController::default();
        let mut ledger = Ledger::new();
        let creator = Address::derive("creator");
        let key = ConduitKey::new(creator, [7u8; 12]);
        let address = controller
            .install_conduit(creator, key, creator, |_| {
                Box::new(RevertingConduit::with_panic(PANIC_ARITHMETIC))
            })
            .unwrap();
        let h = ConduitHandle { key, address };

        let err = forward(&mut controller, &mut ledger, &h, &[]).unwrap_err();
        let ConsiderationError::ConduitErrorRevertBytes { reason, .. } = err else {
            panic!("expected bytes wrap, got {err:?}");
        };
        assert_eq!(reason.decode(), RevertReason::Panic(PANIC_ARITHMETIC));
    }

    #[test]
    fn bad_magic_rolls_back_inside_transaction() {
        let mut controller = ConduitController::default();
        let mut ledger = Ledger::new();
        let usdc = ledger.deploy_token(ItemType::Erc20).unwrap();
        let creator = Address::derive("creator");
        let alice = Address::derive("alice");
        let key = ConduitKey::new(creator, [8u8; 12]);
        let address = controller
            .install_conduit(creator, key, creator, |addr| {
                Box::new(InvalidMagicConduit::new(addr))
            })
            .unwrap();
        ledger.mint_erc20(usdc, alice, Decimal::new(10, 0)).unwrap();
        ledger.approve(usdc, alice, address, Decimal::MAX).unwrap();

        let transfers = [ConduitTransfer {
            item_type: ItemType::Erc20,
            token: usdc,
            from: alice,
            to: Address::derive("bob"),
            identifier: 0,
            amount: Decimal::new(4, 0),
        }];
        let h = ConduitHandle { key, address };
        let err = ledger
            .transact(|ledger| forward(&mut controller, ledger, &h, &transfers))
            .unwrap_err();
        assert!(matches!(err, ConsiderationError::InvalidConduit { .. }));
        // The enclosing transaction undid the conduit's transfers.
        assert_eq!(ledger.erc20_balance(usdc, alice), Decimal::new(10, 0));
    }
}
