//! Integration tests for the transfer helper across both transfer paths.
//!
//! Each test builds a fresh [`Env`]: ledger, conduit registry, helper, and
//! one token of each kind.

mod common;

use std::sync::Arc;

use common::{Env, d};
use consideration_conduit::mock::{InvalidMagicConduit, RevertingConduit};
use consideration_ledger::{AcceptingReceiver, RevertingReceiver, WrongMagicReceiver};
use consideration_types::constants::{
    NON_RECEIVER_REASON, PANIC_ARITHMETIC, PANIC_DIVISION_BY_ZERO, TRANSFER_HELPER_MAGIC,
};
use consideration_types::{
    Address, ConduitKey, ConsiderationError, ItemType, RevertReason, TransferItem,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

fn alice() -> Address {
    Address::derive("alice")
}

fn bob() -> Address {
    Address::derive("bob")
}

fn carol() -> Address {
    Address::derive("carol")
}

/// Alice holds 100 USDC, NFT #1 and #2, and 10 of game item #5.
fn funded_env() -> Env {
    let mut env = Env::new();
    env.ledger.mint_erc20(env.usdc, alice(), d(100)).unwrap();
    env.ledger.mint_erc721(env.nft, alice(), 1).unwrap();
    env.ledger.mint_erc721(env.nft, alice(), 2).unwrap();
    env.ledger.mint_erc1155(env.game, alice(), 5, d(10)).unwrap();
    env
}

fn transfer(env: &mut Env, items: &[TransferItem], key: ConduitKey) -> Result<[u8; 4], ConsiderationError> {
    env.helper.bulk_transfer_to_multiple_recipients(
        &mut env.ledger,
        &mut env.conduits,
        alice(),
        items,
        key,
    )
}

/// (usdc alice, usdc bob, nft#1 owner, game#5 alice, game#5 carol)
fn snapshot(env: &Env) -> (Decimal, Decimal, Option<Address>, Decimal, Decimal) {
    (
        env.ledger.erc20_balance(env.usdc, alice()),
        env.ledger.erc20_balance(env.usdc, bob()),
        env.ledger.owner_of(env.nft, 1),
        env.ledger.erc1155_balance(env.game, 5, alice()),
        env.ledger.erc1155_balance(env.game, 5, carol()),
    )
}

// ---------------------------------------------------------------------------
// Direct path
// ---------------------------------------------------------------------------

#[test]
fn erc20_direct_transfer_moves_exact_amount() {
    let mut env = funded_env();
    let operator = env.helper.address();
    env.approve_all(alice(), operator);

    let items = [TransferItem::erc20(env.usdc, d(40), bob())];
    let magic = transfer(&mut env, &items, ConduitKey::ZERO).unwrap();

    assert_eq!(magic, TRANSFER_HELPER_MAGIC);
    assert_eq!(env.ledger.erc20_balance(env.usdc, alice()), d(60));
    assert_eq!(env.ledger.erc20_balance(env.usdc, bob()), d(40));
}

#[test]
fn mixed_batch_conserves_balances() {
    let mut env = funded_env();
    let operator = env.helper.address();
    env.approve_all(alice(), operator);

    let items = [
        TransferItem::erc20(env.usdc, d(25), bob()),
        TransferItem::erc721(env.nft, 1, carol()),
        TransferItem::erc1155(env.game, 5, d(4), carol()),
        TransferItem::erc20(env.usdc, d(5), carol()),
    ];
    transfer(&mut env, &items, ConduitKey::ZERO).unwrap();

    assert_eq!(env.ledger.erc20_balance(env.usdc, alice()), d(70));
    assert_eq!(env.ledger.erc20_balance(env.usdc, bob()), d(25));
    assert_eq!(env.ledger.erc20_balance(env.usdc, carol()), d(5));
    assert_eq!(env.ledger.owner_of(env.nft, 1), Some(carol()));
    assert_eq!(env.ledger.erc1155_balance(env.game, 5, alice()), d(6));
    assert_eq!(env.ledger.erc1155_balance(env.game, 5, carol()), d(4));
    env.ledger.verify_all_supply().unwrap();
}

#[test]
fn failing_last_item_rolls_back_whole_batch() {
    let mut env = funded_env();
    let operator = env.helper.address();
    env.approve_all(alice(), operator);
    let before = snapshot(&env);

    let items = [
        TransferItem::erc20(env.usdc, d(30), bob()),
        TransferItem::erc721(env.nft, 1, carol()),
        TransferItem::erc1155(env.game, 5, d(3), carol()),
        // Alice does not own #99.
        TransferItem::erc721(env.nft, 99, carol()),
    ];
    let err = transfer(&mut env, &items, ConduitKey::ZERO).unwrap_err();

    assert!(matches!(err, ConsiderationError::NotTokenOwner { .. }));
    assert_eq!(snapshot(&env), before);
    env.ledger.verify_all_supply().unwrap();
}

#[test]
fn erc20_nonzero_identifier_rejected_on_both_paths() {
    let mut env = funded_env();
    let operator = env.helper.address();
    env.approve_all(alice(), operator);
    let (key, _) = env.open_conduit(alice(), 1, operator);

    let mut item = TransferItem::erc20(env.usdc, d(1), bob());
    item.identifier = 7;

    for route in [ConduitKey::ZERO, key] {
        let err = transfer(&mut env, &[item.clone()], route).unwrap_err();
        assert_eq!(err, ConsiderationError::InvalidErc20Identifier);
    }
    assert_eq!(env.ledger.erc20_balance(env.usdc, alice()), d(100));
}

#[test]
fn native_item_rejected_on_direct_path() {
    let mut env = funded_env();
    env.ledger.fund_native(alice(), d(5)).unwrap();
    let operator = env.helper.address();
    env.approve_all(alice(), operator);

    let items = [
        TransferItem::erc20(env.usdc, d(1), bob()),
        TransferItem::native(d(1), bob()),
    ];
    let err = transfer(&mut env, &items, ConduitKey::ZERO).unwrap_err();

    assert_eq!(err, ConsiderationError::InvalidItemType);
    assert_eq!(env.ledger.native_balance(alice()), d(5));
    assert_eq!(env.ledger.erc20_balance(env.usdc, bob()), Decimal::ZERO);
}

#[test]
fn erc721_amount_two_rejected_on_direct_path() {
    let mut env = funded_env();
    let operator = env.helper.address();
    env.approve_all(alice(), operator);

    let mut item = TransferItem::erc721(env.nft, 1, bob());
    item.amount = d(2);
    let err = transfer(&mut env, &[item], ConduitKey::ZERO).unwrap_err();

    assert_eq!(err, ConsiderationError::InvalidErc721TransferAmount { amount: d(2) });
    assert_eq!(env.ledger.owner_of(env.nft, 1), Some(alice()));
}

#[test]
fn missing_approval_fails_without_side_effects() {
    let mut env = funded_env();
    let before = snapshot(&env);

    let items = [
        TransferItem::erc20(env.usdc, d(1), bob()),
        TransferItem::erc721(env.nft, 1, bob()),
    ];
    let err = transfer(&mut env, &items, ConduitKey::ZERO).unwrap_err();

    assert!(matches!(err, ConsiderationError::InsufficientAllowance { .. }));
    assert_eq!(snapshot(&env), before);
}

// ---------------------------------------------------------------------------
// ERC721 receivers (direct path)
// ---------------------------------------------------------------------------

#[test]
fn accepting_contract_receives_nft() {
    let mut env = funded_env();
    let operator = env.helper.address();
    env.approve_all(alice(), operator);
    let vault = env.ledger.deploy_receiver(Arc::new(AcceptingReceiver));

    let items = [TransferItem::erc721(env.nft, 1, vault)];
    transfer(&mut env, &items, ConduitKey::ZERO).unwrap();
    assert_eq!(env.ledger.owner_of(env.nft, 1), Some(vault));
}

#[test]
fn receiver_failures_are_wrapped_with_context() {
    let mut env = funded_env();
    let operator = env.helper.address();
    env.approve_all(alice(), operator);

    let wrong_magic = env.ledger.deploy_receiver(Arc::new(WrongMagicReceiver));
    let items = [TransferItem::erc721(env.nft, 1, wrong_magic)];
    let err = transfer(&mut env, &items, ConduitKey::ZERO).unwrap_err();
    assert_eq!(
        err,
        ConsiderationError::Erc721ReceiverErrorRevertString {
            reason: NON_RECEIVER_REASON.to_string(),
            receiver: wrong_magic,
            sender: alice(),
            identifier: 1,
        }
    );

    let refusing = env
        .ledger
        .deploy_receiver(Arc::new(RevertingReceiver::with_message("no thanks")));
    let items = [TransferItem::erc721(env.nft, 2, refusing)];
    let err = transfer(&mut env, &items, ConduitKey::ZERO).unwrap_err();
    assert!(matches!(
        err,
        ConsiderationError::Erc721ReceiverErrorRevertString { ref reason, receiver, .. }
            if reason == "no thanks" && receiver == refusing
    ));

    let custom = env
        .ledger
        .deploy_receiver(Arc::new(RevertingReceiver::with_custom_error("Paused()")));
    let items = [TransferItem::erc721(env.nft, 2, custom)];
    let err = transfer(&mut env, &items, ConduitKey::ZERO).unwrap_err();
    let ConsiderationError::Erc721ReceiverErrorRevertBytes { reason, identifier, .. } = err else {
        panic!("expected bytes receiver error, got {err:?}");
    };
    assert!(reason.is_custom_error("Paused()"));
    assert_eq!(identifier, 2);

    assert_eq!(env.ledger.owner_of(env.nft, 1), Some(alice()));
    assert_eq!(env.ledger.owner_of(env.nft, 2), Some(alice()));
}

#[test]
fn silent_receiver_is_empty_bytes() {
    let mut env = funded_env();
    let operator = env.helper.address();
    env.approve_all(alice(), operator);
    let silent = env.ledger.deploy_receiver(Arc::new(RevertingReceiver::silent()));

    let items = [TransferItem::erc721(env.nft, 1, silent)];
    let err = transfer(&mut env, &items, ConduitKey::ZERO).unwrap_err();
    assert!(matches!(
        err,
        ConsiderationError::Erc721ReceiverErrorRevertBytes { ref reason, .. } if reason.is_empty()
    ));
}

#[test]
fn receiver_hooks_skipped_through_conduit() {
    let mut env = funded_env();
    let operator = env.helper.address();
    let (key, _) = env.open_conduit(alice(), 2, operator);
    let wrong_magic = env.ledger.deploy_receiver(Arc::new(WrongMagicReceiver));

    let items = [TransferItem::erc721(env.nft, 1, wrong_magic)];
    transfer(&mut env, &items, key).unwrap();
    assert_eq!(env.ledger.owner_of(env.nft, 1), Some(wrong_magic));
}

// ---------------------------------------------------------------------------
// Conduit path
// ---------------------------------------------------------------------------

#[test]
fn conduit_path_moves_every_kind() {
    let mut env = funded_env();
    let operator = env.helper.address();
    let (key, _) = env.open_conduit(alice(), 3, operator);

    let items = [
        TransferItem::erc20(env.usdc, d(10), bob()),
        TransferItem::erc721(env.nft, 2, bob()),
        TransferItem::erc1155(env.game, 5, d(10), carol()),
    ];
    let magic = transfer(&mut env, &items, key).unwrap();

    assert_eq!(magic, TRANSFER_HELPER_MAGIC);
    assert_eq!(env.ledger.erc20_balance(env.usdc, bob()), d(10));
    assert_eq!(env.ledger.owner_of(env.nft, 2), Some(bob()));
    assert_eq!(env.ledger.erc1155_balance(env.game, 5, carol()), d(10));
    env.ledger.verify_all_supply().unwrap();
}

#[test]
fn erc721_amount_two_through_conduit_is_conduit_wrapped() {
    let mut env = funded_env();
    let operator = env.helper.address();
    let (key, conduit) = env.open_conduit(alice(), 4, operator);
    let before = snapshot(&env);

    let mut nft = TransferItem::erc721(env.nft, 1, bob());
    nft.amount = d(2);
    let items = [TransferItem::erc20(env.usdc, d(10), bob()), nft];
    let err = transfer(&mut env, &items, key).unwrap_err();

    let ConsiderationError::ConduitErrorRevertBytes { reason, conduit_key, conduit: reported } = err
    else {
        panic!("expected conduit-wrapped error, got {err:?}");
    };
    assert_eq!(conduit_key, key);
    assert_eq!(reported, conduit);
    assert!(reason.is_custom_error("InvalidERC721TransferAmount()"));
    assert_eq!(snapshot(&env), before);
}

#[test]
fn native_item_through_conduit_is_conduit_wrapped() {
    let mut env = funded_env();
    env.ledger.fund_native(alice(), d(5)).unwrap();
    let operator = env.helper.address();
    let (key, _) = env.open_conduit(alice(), 5, operator);

    let err = transfer(&mut env, &[TransferItem::native(d(1), bob())], key).unwrap_err();

    let ConsiderationError::ConduitErrorRevertBytes { reason, .. } = err else {
        panic!("expected conduit-wrapped error, got {err:?}");
    };
    assert!(reason.is_custom_error("InvalidItemType()"));
    assert_eq!(env.ledger.native_balance(alice()), d(5));
}

#[test]
fn native_item_with_identifier_reports_item_type_on_both_paths() {
    let mut env = funded_env();
    env.ledger.fund_native(alice(), d(5)).unwrap();
    let operator = env.helper.address();
    env.approve_all(alice(), operator);
    let (key, _) = env.open_conduit(alice(), 6, operator);

    let mut item = TransferItem::native(d(1), bob());
    item.identifier = 3;

    let err = transfer(&mut env, &[item.clone()], ConduitKey::ZERO).unwrap_err();
    assert_eq!(err, ConsiderationError::InvalidItemType);

    let err = transfer(&mut env, &[item], key).unwrap_err();
    let ConsiderationError::ConduitErrorRevertBytes { reason, .. } = err else {
        panic!("expected conduit-wrapped error, got {err:?}");
    };
    assert!(reason.is_custom_error("InvalidItemType()"));
    assert_eq!(env.ledger.native_balance(alice()), d(5));
    assert_eq!(env.ledger.native_balance(bob()), Decimal::ZERO);
}

#[test]
fn unknown_conduit_key_fails_without_side_effects() {
    let mut env = funded_env();
    let before = snapshot(&env);
    let key = ConduitKey::new(alice(), [9u8; 12]);

    let items = [TransferItem::erc20(env.usdc, d(1), bob())];
    let err = transfer(&mut env, &items, key).unwrap_err();

    assert_eq!(err, ConsiderationError::UnknownConduit(key));
    assert_eq!(snapshot(&env), before);
}

#[test]
fn closing_and_reopening_channel() {
    let mut env = funded_env();
    let operator = env.helper.address();
    let (key, conduit) = env.open_conduit(alice(), 6, operator);
    let item = TransferItem::erc20(env.usdc, d(1), bob());

    transfer(&mut env, &[item.clone()], key).unwrap();

    env.conduits
        .update_channel(alice(), conduit, operator, false).unwrap();
    for _ in 0..2 {
        let err = transfer(&mut env, &[item.clone()], key).unwrap_err();
        assert_eq!(err, ConsiderationError::ChannelNotOpen(operator));
    }
    assert_eq!(env.ledger.erc20_balance(env.usdc, bob()), d(1));

    env.conduits
        .update_channel(alice(), conduit, operator, true).unwrap();
    transfer(&mut env, &[item], key).unwrap();
    assert_eq!(env.ledger.erc20_balance(env.usdc, bob()), d(2));
}

#[test]
fn conduit_reverts_are_wrapped_once() {
    let mut env = funded_env();
    let operator = env.helper.address();
    let cases: [(u8, RevertingConduit); 4] = [
        (10, RevertingConduit::with_message("conduit says no")),
        (11, RevertingConduit::with_panic(PANIC_ARITHMETIC)),
        (12, RevertingConduit::with_panic(PANIC_DIVISION_BY_ZERO)),
        (13, RevertingConduit::silent()),
    ];

    for (salt, conduit) in cases {
        let key = ConduitKey::new(alice(), [salt; 12]);
        let address = env
            .conduits
            .install_conduit(alice(), key, alice(), move |_| Box::new(conduit)).unwrap();
        env.conduits
            .update_channel(alice(), address, operator, true).unwrap();

        let items = [TransferItem::erc20(env.usdc, d(1), bob())];
        let err = transfer(&mut env, &items, key).unwrap_err();
        match (salt, err) {
            (10, ConsiderationError::ConduitErrorRevertString { reason, conduit_key, .. }) => {
                assert_eq!(reason, "conduit says no");
                assert_eq!(conduit_key, key);
            }
            (11, ConsiderationError::ConduitErrorRevertBytes { reason, .. }) => {
                assert_eq!(reason.decode(), RevertReason::Panic(PANIC_ARITHMETIC));
            }
            (12, ConsiderationError::ConduitErrorRevertBytes { reason, .. }) => {
                assert_eq!(reason.decode(), RevertReason::Panic(PANIC_DIVISION_BY_ZERO));
            }
            (13, ConsiderationError::ConduitErrorRevertBytes { reason, conduit, .. }) => {
                assert!(reason.is_empty());
                assert_eq!(conduit, address);
            }
            (salt, err) => panic!("case {salt}: unexpected error {err:?}"),
        }
    }
    assert_eq!(env.ledger.erc20_balance(env.usdc, alice()), d(100));
}

#[test]
fn invalid_magic_undoes_conduit_transfers() {
    let mut env = funded_env();
    let operator = env.helper.address();
    let key = ConduitKey::new(alice(), [20u8; 12]);
    let address = env
        .conduits
        .install_conduit(alice(), key, alice(), |addr| Box::new(InvalidMagicConduit::new(addr)))
        .unwrap();
    env.conduits
        .update_channel(alice(), address, operator, true).unwrap();
    env.approve_all(alice(), address);

    let items = [TransferItem::erc20(env.usdc, d(50), bob())];
    let err = transfer(&mut env, &items, key).unwrap_err();

    assert_eq!(
        err,
        ConsiderationError::InvalidConduit {
            conduit_key: key,
            conduit: address,
        }
    );
    assert_eq!(env.ledger.erc20_balance(env.usdc, alice()), d(100));
    assert_eq!(env.ledger.erc20_balance(env.usdc, bob()), Decimal::ZERO);
}

// ---------------------------------------------------------------------------
// Randomized batches
// ---------------------------------------------------------------------------

#[test]
fn random_erc20_batches_are_all_or_nothing() {
    let mut env = Env::new();
    let users = [alice(), bob(), carol()];
    let operator = env.helper.address();
    for user in users {
        env.ledger.mint_erc20(env.usdc, user, d(50)).unwrap();
        env.approve_all(user, operator);
    }

    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..200 {
        let sender = users[rng.gen_range(0..users.len())];
        let items: Vec<TransferItem> = (0..rng.gen_range(1..5))
            .map(|_| {
                let to = users[rng.gen_range(0..users.len())];
                TransferItem::erc20(env.usdc, d(rng.gen_range(1..30)), to)
            })
            .collect();

        let before: Vec<Decimal> = users
            .iter()
            .map(|u| env.ledger.erc20_balance(env.usdc, *u))
            .collect();
        let outgoing: Decimal = items.iter().map(|i| i.amount).sum();

        let result = env.helper.bulk_transfer_to_multiple_recipients(
            &mut env.ledger,
            &mut env.conduits,
            sender,
            &items,
            ConduitKey::ZERO,
        );

        let after: Vec<Decimal> = users
            .iter()
            .map(|u| env.ledger.erc20_balance(env.usdc, *u))
            .collect();
        match result {
            Ok(_) => {
                for (i, user) in users.iter().enumerate() {
                    let incoming: Decimal = items
                        .iter()
                        .filter(|item| item.recipient == *user)
                        .map(|item| item.amount)
                        .sum();
                    let sent = if *user == sender { outgoing } else { Decimal::ZERO };
                    assert_eq!(after[i], before[i] - sent + incoming);
                }
            }
            Err(err) => {
                assert!(matches!(err, ConsiderationError::InsufficientBalance { .. }));
                assert!(outgoing > before[users.iter().position(|u| *u == sender).unwrap()]);
                assert_eq!(after, before);
            }
        }
        env.ledger.verify_supply(env.usdc).unwrap();
    }
}

#[test]
fn erc1155_kind_mismatch_is_rejected() {
    let mut env = funded_env();
    let operator = env.helper.address();
    env.approve_all(alice(), operator);

    // ERC20 token addressed as ERC1155.
    let item = TransferItem {
        item_type: ItemType::Erc1155,
        token: env.usdc,
        identifier: 0,
        amount: d(1),
        recipient: bob(),
    };
    let err = transfer(&mut env, &[item], ConduitKey::ZERO).unwrap_err();
    assert!(matches!(err, ConsiderationError::TokenKindMismatch { .. }));
}
