//! The token ledger.
//!
//! Tracks native balances, ERC20 balances and allowances, ERC721 ownership,
//! ERC1155 balances, and operator approvals for every deployed token. All
//! movement goes through operator-checked transfer functions that either
//! fully apply or leave state untouched.
//!
//! Multi-step operations run inside [`Ledger::transact`], which snapshots the
//! token state and restores it if the closure returns an error. This is what
//! gives batch transfers and order fulfillment their all-or-nothing semantics.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use consideration_types::constants::DEPLOY_DOMAIN;
use consideration_types::{
    Address, ConduitTransfer, ConsiderationError, ItemType, Result, RevertData, validate_amount,
};
use rust_decimal::Decimal;

use crate::receiver::Erc721Receiver;
use crate::supply_conservation::SupplyConservation;

/// Everything a rollback restores.
#[derive(Clone, Default)]
struct LedgerState {
    /// Deployed token contracts and their kind.
    tokens: HashMap<Address, ItemType>,
    /// Accounts with code (tokens, conduits, receiver contracts).
    contracts: HashSet<Address>,
    native: HashMap<Address, Decimal>,
    /// (token, owner) → balance.
    erc20: HashMap<(Address, Address), Decimal>,
    /// (token, owner, spender) → allowance.
    allowances: HashMap<(Address, Address, Address), Decimal>,
    /// (token, identifier) → owner.
    erc721_owners: HashMap<(Address, u128), Address>,
    /// (token, identifier, owner) → balance.
    erc1155: HashMap<(Address, u128, Address), Decimal>,
    /// (token, owner, operator) approved for all.
    operators: HashSet<(Address, Address, Address)>,
    /// ERC721 receiver hooks of deployed receiver contracts.
    receivers: HashMap<Address, Arc<dyn Erc721Receiver>>,
    supply: SupplyConservation,
}

/// In-memory multi-token ledger with a logical clock.
pub struct Ledger {
    state: LedgerState,
    timestamp: DateTime<Utc>,
    deploy_nonce: u64,
}

impl Ledger {
    /// Create an empty ledger with the clock set to now.
    #[must_use]
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create an empty ledger with the clock set to `timestamp`.
    #[must_use]
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            state: LedgerState::default(),
            timestamp,
            deploy_nonce: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    pub fn advance(&mut self, by: Duration) {
        self.timestamp += by;
    }

    // -----------------------------------------------------------------------
    // Deployment
    // -----------------------------------------------------------------------

    fn next_deploy_address(&mut self) -> Address {
        self.deploy_nonce += 1;
        Address::from_digest(&[DEPLOY_DOMAIN, &self.deploy_nonce.to_be_bytes()])
    }

    /// Deploy a new token contract of the given kind.
    ///
    /// # Errors
    /// Returns `InvalidItemType` for [`ItemType::Native`], which has no contract.
    pub fn deploy_token(&mut self, kind: ItemType) -> Result<Address> {
        match kind {
            ItemType::Native => return Err(ConsiderationError::InvalidItemType),
            ItemType::Erc20 | ItemType::Erc721 | ItemType::Erc1155 => {}
        }
        let token = self.next_deploy_address();
        self.state.tokens.insert(token, kind);
        self.state.contracts.insert(token);
        tracing::debug!(token = %token, kind = %kind, "Token deployed");
        Ok(token)
    }

    /// Deploy a contract account with no ERC721 receiver hook.
    pub fn deploy_contract(&mut self) -> Address {
        let address = self.next_deploy_address();
        self.state.contracts.insert(address);
        address
    }

    /// Deploy a contract account that answers ERC721 receiver calls with `receiver`.
    pub fn deploy_receiver(&mut self, receiver: Arc<dyn Erc721Receiver>) -> Address {
        let address = self.deploy_contract();
        self.state.receivers.insert(address, receiver);
        address
    }

    /// Mark an existing address as a contract account.
    pub fn register_contract(&mut self, address: Address) {
        self.state.contracts.insert(address);
    }

    #[must_use]
    pub fn is_contract(&self, address: Address) -> bool {
        self.state.contracts.contains(&address)
    }

    /// The kind of the token deployed at `token`.
    ///
    /// # Errors
    /// Returns `NoContract` if nothing is deployed there.
    pub fn token_kind(&self, token: Address) -> Result<ItemType> {
        self.state
            .tokens
            .get(&token)
            .copied()
            .ok_or(ConsiderationError::NoContract(token))
    }

    fn expect_kind(&self, token: Address, expected: ItemType) -> Result<()> {
        let actual = self.token_kind(token)?;
        if actual != expected {
            return Err(ConsiderationError::TokenKindMismatch {
                token,
                expected,
                actual,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Minting
    // -----------------------------------------------------------------------

    /// Credit native currency to `to`.
    pub fn fund_native(&mut self, to: Address, amount: Decimal) -> Result<()> {
        validate_amount(amount)?;
        self.state.supply.record_mint(Address::ZERO, amount)?;
        credit(self.state.native.entry(to).or_default(), amount)?;
        Ok(())
    }

    pub fn mint_erc20(&mut self, token: Address, to: Address, amount: Decimal) -> Result<()> {
        validate_amount(amount)?;
        self.expect_kind(token, ItemType::Erc20)?;
        self.state.supply.record_mint(token, amount)?;
        credit(self.state.erc20.entry((token, to)).or_default(), amount)?;
        Ok(())
    }

    pub fn mint_erc721(&mut self, token: Address, to: Address, identifier: u128) -> Result<()> {
        self.expect_kind(token, ItemType::Erc721)?;
        if self.state.erc721_owners.contains_key(&(token, identifier)) {
            return Err(ConsiderationError::TokenAlreadyMinted { token, identifier });
        }
        self.state.supply.record_mint(token, Decimal::ONE)?;
        self.state.erc721_owners.insert((token, identifier), to);
        Ok(())
    }

    pub fn mint_erc1155(
        &mut self,
        token: Address,
        to: Address,
        identifier: u128,
        amount: Decimal,
    ) -> Result<()> {
        validate_amount(amount)?;
        self.expect_kind(token, ItemType::Erc1155)?;
        self.state.supply.record_mint(token, amount)?;
        credit(
            self.state.erc1155.entry((token, identifier, to)).or_default(),
            amount,
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Approvals
    // -----------------------------------------------------------------------

    /// Set the ERC20 allowance `owner` grants `spender`. [`Decimal::MAX`] is
    /// treated as unlimited and never decremented.
    pub fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: Decimal,
    ) -> Result<()> {
        validate_amount(amount)?;
        self.expect_kind(token, ItemType::Erc20)?;
        self.state.allowances.insert((token, owner, spender), amount);
        Ok(())
    }

    /// Grant or revoke blanket operator rights on an ERC721 or ERC1155 token.
    pub fn set_approval_for_all(
        &mut self,
        token: Address,
        owner: Address,
        operator: Address,
        approved: bool,
    ) -> Result<()> {
        match self.token_kind(token)? {
            ItemType::Erc721 | ItemType::Erc1155 => {}
            actual @ (ItemType::Native | ItemType::Erc20) => {
                return Err(ConsiderationError::TokenKindMismatch {
                    token,
                    expected: ItemType::Erc721,
                    actual,
                });
            }
        }
        if approved {
            self.state.operators.insert((token, owner, operator));
        } else {
            self.state.operators.remove(&(token, owner, operator));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn native_balance(&self, owner: Address) -> Decimal {
        self.state.native.get(&owner).copied().unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn erc20_balance(&self, token: Address, owner: Address) -> Decimal {
        self.state
            .erc20
            .get(&(token, owner))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> Decimal {
        self.state
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn owner_of(&self, token: Address, identifier: u128) -> Option<Address> {
        self.state.erc721_owners.get(&(token, identifier)).copied()
    }

    #[must_use]
    pub fn erc1155_balance(&self, token: Address, identifier: u128, owner: Address) -> Decimal {
        self.state
            .erc1155
            .get(&(token, identifier, owner))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn is_approved_for_all(&self, token: Address, owner: Address, operator: Address) -> bool {
        self.state.operators.contains(&(token, owner, operator))
    }

    /// Holdings of `owner` in the asset an item of this shape would move.
    #[must_use]
    pub fn balance_of(
        &self,
        item_type: ItemType,
        token: Address,
        identifier: u128,
        owner: Address,
    ) -> Decimal {
        match item_type {
            ItemType::Native => self.native_balance(owner),
            ItemType::Erc20 => self.erc20_balance(token, owner),
            ItemType::Erc721 => {
                if self.owner_of(token, identifier) == Some(owner) {
                    Decimal::ONE
                } else {
                    Decimal::ZERO
                }
            }
            ItemType::Erc1155 => self.erc1155_balance(token, identifier, owner),
        }
    }

    // -----------------------------------------------------------------------
    // Transfers
    // -----------------------------------------------------------------------

    /// Move native currency. Only the holder can send it.
    pub fn transfer_native(&mut self, from: Address, to: Address, amount: Decimal) -> Result<()> {
        validate_amount(amount)?;
        let available = self.native_balance(from);
        if available < amount {
            return Err(ConsiderationError::InsufficientBalance {
                token: Address::ZERO,
                owner: from,
                needed: amount,
                available,
            });
        }
        self.state.native.insert(from, available - amount);
        credit(self.state.native.entry(to).or_default(), amount)?;
        tracing::trace!(from = %from, to = %to, amount = %amount, "Native transfer");
        Ok(())
    }

    /// `transferFrom` on an ERC20 token. `operator` spends allowance unless
    /// it is the holder.
    pub fn transfer_erc20(
        &mut self,
        token: Address,
        operator: Address,
        from: Address,
        to: Address,
        amount: Decimal,
    ) -> Result<()> {
        validate_amount(amount)?;
        self.expect_kind(token, ItemType::Erc20)?;

        let allowance = self.allowance(token, from, operator);
        if operator != from && allowance < amount {
            return Err(ConsiderationError::InsufficientAllowance {
                token,
                owner: from,
                spender: operator,
                needed: amount,
                available: allowance,
            });
        }
        let available = self.erc20_balance(token, from);
        if available < amount {
            return Err(ConsiderationError::InsufficientBalance {
                token,
                owner: from,
                needed: amount,
                available,
            });
        }

        if operator != from && allowance != Decimal::MAX {
            self.state
                .allowances
                .insert((token, from, operator), allowance - amount);
        }
        self.state.erc20.insert((token, from), available - amount);
        credit(self.state.erc20.entry((token, to)).or_default(), amount)?;
        tracing::trace!(token = %token, from = %from, to = %to, amount = %amount, "ERC20 transfer");
        Ok(())
    }

    /// `transferFrom` on an ERC721 token. No receiver hook is invoked here;
    /// see [`Ledger::call_erc721_receiver`].
    pub fn transfer_erc721(
        &mut self,
        token: Address,
        operator: Address,
        from: Address,
        to: Address,
        identifier: u128,
    ) -> Result<()> {
        self.expect_kind(token, ItemType::Erc721)?;
        if self.owner_of(token, identifier) != Some(from) {
            return Err(ConsiderationError::NotTokenOwner {
                token,
                from,
                identifier,
            });
        }
        if operator != from && !self.is_approved_for_all(token, from, operator) {
            return Err(ConsiderationError::NotApproved {
                token,
                owner: from,
                operator,
            });
        }
        self.state.erc721_owners.insert((token, identifier), to);
        tracing::trace!(token = %token, from = %from, to = %to, identifier, "ERC721 transfer");
        Ok(())
    }

    /// `safeTransferFrom` on an ERC1155 token (receiver hooks not modelled).
    pub fn transfer_erc1155(
        &mut self,
        token: Address,
        operator: Address,
        from: Address,
        to: Address,
        identifier: u128,
        amount: Decimal,
    ) -> Result<()> {
        validate_amount(amount)?;
        self.expect_kind(token, ItemType::Erc1155)?;
        if operator != from && !self.is_approved_for_all(token, from, operator) {
            return Err(ConsiderationError::NotApproved {
                token,
                owner: from,
                operator,
            });
        }
        let available = self.erc1155_balance(token, identifier, from);
        if available < amount {
            return Err(ConsiderationError::InsufficientBalance {
                token,
                owner: from,
                needed: amount,
                available,
            });
        }
        self.state
            .erc1155
            .insert((token, identifier, from), available - amount);
        credit(
            self.state.erc1155.entry((token, identifier, to)).or_default(),
            amount,
        )?;
        tracing::trace!(
            token = %token,
            from = %from,
            to = %to,
            identifier,
            amount = %amount,
            "ERC1155 transfer"
        );
        Ok(())
    }

    /// Dispatch a token transfer instruction on behalf of `operator`.
    ///
    /// # Errors
    /// - `InvalidItemType` for native items, before any shape check: an operator
    ///   cannot pull native currency.
    /// - `InvalidErc721TransferAmount` if an ERC721 instruction's amount is not one.
    /// - Any ledger error from the underlying transfer.
    pub fn transfer(&mut self, operator: Address, transfer: &ConduitTransfer) -> Result<()> {
        if transfer.item_type == ItemType::Native {
            return Err(ConsiderationError::InvalidItemType);
        }
        transfer.validate()?;
        match transfer.item_type {
            ItemType::Native => Err(ConsiderationError::InvalidItemType),
            ItemType::Erc20 => self.transfer_erc20(
                transfer.token,
                operator,
                transfer.from,
                transfer.to,
                transfer.amount,
            ),
            ItemType::Erc721 => {
                if transfer.amount != Decimal::ONE {
                    return Err(ConsiderationError::InvalidErc721TransferAmount {
                        amount: transfer.amount,
                    });
                }
                self.transfer_erc721(
                    transfer.token,
                    operator,
                    transfer.from,
                    transfer.to,
                    transfer.identifier,
                )
            }
            ItemType::Erc1155 => self.transfer_erc1155(
                transfer.token,
                operator,
                transfer.from,
                transfer.to,
                transfer.identifier,
                transfer.amount,
            ),
        }
    }

    // -----------------------------------------------------------------------
    // Receiver hooks
    // -----------------------------------------------------------------------

    /// Invoke the ERC721 receiver hook of `receiver`.
    ///
    /// Returns `None` when `receiver` has no code (nothing to call). A
    /// contract without a registered hook reverts with empty data.
    #[must_use]
    pub fn call_erc721_receiver(
        &self,
        receiver: Address,
        operator: Address,
        from: Address,
        identifier: u128,
    ) -> Option<std::result::Result<[u8; 4], RevertData>> {
        if !self.is_contract(receiver) {
            return None;
        }
        Some(match self.state.receivers.get(&receiver) {
            Some(hook) => hook.on_erc721_received(operator, from, identifier, &[]),
            None => Err(RevertData::empty()),
        })
    }

    // -----------------------------------------------------------------------
    // Atomicity
    // -----------------------------------------------------------------------

    /// Run `f` against this ledger; if it fails, every token state change it
    /// made is undone. Nested calls roll back independently.
    pub fn transact<T, E: fmt::Display>(
        &mut self,
        f: impl FnOnce(&mut Self) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        let snapshot = self.state.clone();
        let result = f(self);
        if let Err(err) = &result {
            self.state = snapshot;
            tracing::debug!(error = %err, "Ledger changes rolled back");
        }
        result
    }

    // -----------------------------------------------------------------------
    // Supply conservation
    // -----------------------------------------------------------------------

    /// Sum of all holdings of `token` ([`Address::ZERO`] for native).
    ///
    /// # Errors
    /// Returns `Internal` if the holdings overflow when summed.
    pub fn total_supply(&self, token: Address) -> Result<Decimal> {
        if token.is_zero() {
            return checked_sum(token, self.state.native.values().copied());
        }
        match self.state.tokens.get(&token) {
            Some(ItemType::Erc20) => checked_sum(
                token,
                self.state
                    .erc20
                    .iter()
                    .filter(|((t, _), _)| *t == token)
                    .map(|(_, amount)| *amount),
            ),
            Some(ItemType::Erc721) => Ok(Decimal::from(
                self.state
                    .erc721_owners
                    .keys()
                    .filter(|(t, _)| *t == token)
                    .count(),
            )),
            Some(ItemType::Erc1155) => checked_sum(
                token,
                self.state
                    .erc1155
                    .iter()
                    .filter(|((t, _, _), _)| *t == token)
                    .map(|(_, amount)| *amount),
            ),
            Some(ItemType::Native) | None => Ok(Decimal::ZERO),
        }
    }

    /// Check that `token`'s holdings still equal what was minted.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` on mismatch.
    pub fn verify_supply(&self, token: Address) -> Result<()> {
        self.state.supply.verify(token, self.total_supply(token)?)
    }

    /// [`Ledger::verify_supply`] for every token ever minted.
    pub fn verify_all_supply(&self) -> Result<()> {
        for token in self.state.supply.tracked_tokens() {
            self.verify_supply(token)?;
        }
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

fn credit(slot: &mut Decimal, amount: Decimal) -> Result<()> {
    *slot = slot
        .checked_add(amount)
        .ok_or_else(|| ConsiderationError::Internal(format!("balance overflow adding {amount}")))?;
    Ok(())
}

fn checked_sum(token: Address, mut amounts: impl Iterator<Item = Decimal>) -> Result<Decimal> {
    amounts.try_fold(Decimal::ZERO, |total, amount| {
        total
            .checked_add(amount)
            .ok_or_else(|| ConsiderationError::Internal(format!("supply of {token} overflows")))
    })
}
