//! Item model: what can be moved, and the shape every transfer instruction takes.
//!
//! [`ItemType`] is a closed enum. Every consumer (validation, balance lookup,
//! transfer dispatch) matches it exhaustively so a new kind can never be
//! silently mishandled.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, ConsiderationError, Result};

/// The kind of asset an item moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ItemType {
    /// The chain's native currency.
    Native,
    /// Fungible token.
    Erc20,
    /// Non-fungible token; every transfer moves exactly one unit.
    Erc721,
    /// Semi-fungible token with per-identifier balances.
    Erc1155,
}

impl ItemType {
    /// Whether items of this kind must carry identifier `0`.
    #[must_use]
    pub fn requires_zero_identifier(self) -> bool {
        match self {
            Self::Native | Self::Erc20 => true,
            Self::Erc721 | Self::Erc1155 => false,
        }
    }

    /// Reject a nonzero identifier on kinds that have none.
    pub fn validate_identifier(self, identifier: u128) -> Result<()> {
        if self.requires_zero_identifier() && identifier != 0 {
            return Err(ConsiderationError::InvalidErc20Identifier);
        }
        Ok(())
    }

    /// Units actually moved for a requested `amount`.
    #[must_use]
    pub fn transferred_amount(self, amount: Decimal) -> Decimal {
        match self {
            Self::Erc721 => Decimal::ONE,
            Self::Native | Self::Erc20 | Self::Erc1155 => amount,
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "NATIVE"),
            Self::Erc20 => write!(f, "ERC20"),
            Self::Erc721 => write!(f, "ERC721"),
            Self::Erc1155 => write!(f, "ERC1155"),
        }
    }
}

/// Amounts are token base units: non-negative, scale 0.
pub fn validate_amount(amount: Decimal) -> Result<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ConsiderationError::InvalidItemAmount {
            reason: format!("amount {amount} is negative"),
        });
    }
    if !amount.fract().is_zero() {
        return Err(ConsiderationError::InvalidItemAmount {
            reason: format!("amount {amount} is not a whole number of base units"),
        });
    }
    Ok(())
}

/// An item without a recipient, as accepted by the single-recipient
/// transfer helper entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferHelperItem {
    pub item_type: ItemType,
    pub token: Address,
    pub identifier: u128,
    pub amount: Decimal,
}

impl TransferHelperItem {
    #[must_use]
    pub fn with_recipient(&self, recipient: Address) -> TransferItem {
        TransferItem {
            item_type: self.item_type,
            token: self.token,
            identifier: self.identifier,
            amount: self.amount,
            recipient,
        }
    }
}

/// A single transferable asset with its recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItem {
    pub item_type: ItemType,
    /// Token contract (ignored for native items).
    pub token: Address,
    pub identifier: u128,
    pub amount: Decimal,
    pub recipient: Address,
}

impl TransferItem {
    #[must_use]
    pub fn erc20(token: Address, amount: Decimal, recipient: Address) -> Self {
        Self {
            item_type: ItemType::Erc20,
            token,
            identifier: 0,
            amount,
            recipient,
        }
    }

    #[must_use]
    pub fn erc721(token: Address, identifier: u128, recipient: Address) -> Self {
        Self {
            item_type: ItemType::Erc721,
            token,
            identifier,
            amount: Decimal::ONE,
            recipient,
        }
    }

    #[must_use]
    pub fn erc1155(token: Address, identifier: u128, amount: Decimal, recipient: Address) -> Self {
        Self {
            item_type: ItemType::Erc1155,
            token,
            identifier,
            amount,
            recipient,
        }
    }

    #[must_use]
    pub fn native(amount: Decimal, recipient: Address) -> Self {
        Self {
            item_type: ItemType::Native,
            token: Address::ZERO,
            identifier: 0,
            amount,
            recipient,
        }
    }

    /// Pure shape check. ERC721 amounts are deliberately not checked here:
    /// that failure belongs to the transfer call itself.
    pub fn validate(&self) -> Result<()> {
        self.item_type.validate_identifier(self.identifier)?;
        validate_amount(self.amount)
    }

    /// Units this item moves when it succeeds.
    #[must_use]
    pub fn transferred_amount(&self) -> Decimal {
        self.item_type.transferred_amount(self.amount)
    }

    #[must_use]
    pub fn to_conduit_transfer(&self, from: Address) -> ConduitTransfer {
        ConduitTransfer {
            item_type: self.item_type,
            token: self.token,
            from,
            to: self.recipient,
            identifier: self.identifier,
            amount: self.amount,
        }
    }
}

/// One fully-specified transfer instruction, as executed by the direct path
/// or forwarded to a conduit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConduitTransfer {
    pub item_type: ItemType,
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub identifier: u128,
    pub amount: Decimal,
}

impl ConduitTransfer {
    pub fn validate(&self) -> Result<()> {
        self.item_type.validate_identifier(self.identifier)?;
        validate_amount(self.amount)
    }

    #[must_use]
    pub fn transferred_amount(&self) -> Decimal {
        self.item_type.transferred_amount(self.amount)
    }
}
