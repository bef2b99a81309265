//! Supply conservation invariant checker.
//!
//! Invariant enforced by every transfer path:
//! ```text
//! ∀ token: Σ(balances) == Σ(mints)
//! ```
//!
//! Transfers only ever move value between accounts. If a settlement ever
//! changes a token's total supply, a transfer path is broken.
//!
//! Native currency is tracked under [`Address::ZERO`].

use std::collections::HashMap;

use consideration_types::{Address, ConsiderationError, Result};
use rust_decimal::Decimal;

/// Tracks per-token minted totals and validates conservation on demand.
#[derive(Debug, Clone)]
pub struct SupplyConservation {
    /// Total units minted per token since genesis.
    minted: HashMap<Address, Decimal>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self {
            minted: HashMap::new(),
        }
    }

    /// Record newly created units of `token`.
    ///
    /// # Errors
    /// Returns `InvalidItemAmount` if the minted total would overflow; the
    /// recorded total is left unchanged.
    pub fn record_mint(&mut self, token: Address, amount: Decimal) -> Result<()> {
        let minted = self.minted.entry(token).or_insert(Decimal::ZERO);
        *minted = minted
            .checked_add(amount)
            .ok_or_else(|| ConsiderationError::InvalidItemAmount {
                reason: format!("minting {amount} overflows the supply of {token}"),
            })?;
        Ok(())
    }

    /// Expected total supply for a token.
    #[must_use]
    pub fn expected_supply(&self, token: Address) -> Decimal {
        self.minted.get(&token).copied().unwrap_or(Decimal::ZERO)
    }

    /// Verify that the actual supply (sum of all holdings) matches the
    /// minted total for `token`.
    ///
    /// # Errors
    /// Returns [`ConsiderationError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, token: Address, actual_supply: Decimal) -> Result<()> {
        let expected = self.expected_supply(token);
        if actual_supply != expected {
            return Err(ConsiderationError::SupplyInvariantViolation {
                reason: format!("token {token}: actual supply {actual_supply} != minted {expected}"),
            });
        }
        Ok(())
    }

    /// Every token with at least one recorded mint.
    #[must_use]
    pub fn tracked_tokens(&self) -> Vec<Address> {
        let mut tokens: Vec<Address> = self.minted.keys().copied().collect();
        tokens.sort();
        tokens
    }
}

impl Default for SupplyConservation {
    fn default() -> Self {
        Self::new()
    }
}
