//! Error types for the Consideration settlement engine.
//!
//! All errors use the `CX_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Item shape errors (no downstream call attempted)
//! - 2xx: Ledger / token errors
//! - 3xx: Routing and conduit controller errors
//! - 4xx: Downstream failures wrapped with routing / counterparty context
//! - 5xx: Order settlement errors
//! - 9xx: General / internal errors
//!
//! Every variant also has a Solidity-style [`signature`](ConsiderationError::signature),
//! used when a conduit re-raises a typed error as custom-error revert data.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Address, ConduitKey, ItemType, OrderHash, RevertData};

/// Central error enum for all Consideration operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsiderationError {
    // =================================================================
    // Item Errors (1xx)
    // =================================================================
    /// ERC20 or native item carried a nonzero identifier.
    #[error("CX_ERR_100: ERC20 and native items must use identifier 0")]
    InvalidErc20Identifier,

    /// The item kind cannot be moved on this path (native on the direct path).
    #[error("CX_ERR_101: Invalid item type for this transfer path")]
    InvalidItemType,

    /// An ERC721 transfer requested an amount other than one.
    #[error("CX_ERR_102: ERC721 transfers must move exactly one token, got {amount}")]
    InvalidErc721TransferAmount { amount: Decimal },

    /// Negative or fractional amount.
    #[error("CX_ERR_103: Invalid item amount: {reason}")]
    InvalidItemAmount { reason: String },

    // =================================================================
    // Ledger Errors (2xx)
    // =================================================================
    #[error("CX_ERR_200: Insufficient balance of {token} for {owner}: need {needed}, have {available}")]
    InsufficientBalance {
        token: Address,
        owner: Address,
        needed: Decimal,
        available: Decimal,
    },

    #[error(
        "CX_ERR_201: Insufficient allowance on {token} from {owner} to {spender}: need {needed}, have {available}"
    )]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        needed: Decimal,
        available: Decimal,
    },

    #[error("CX_ERR_202: {from} does not own token {identifier} of {token}")]
    NotTokenOwner {
        token: Address,
        from: Address,
        identifier: u128,
    },

    #[error("CX_ERR_203: {operator} is not approved for {owner} on {token}")]
    NotApproved {
        token: Address,
        owner: Address,
        operator: Address,
    },

    /// No token contract is deployed at this address.
    #[error("CX_ERR_204: No token contract at {0}")]
    NoContract(Address),

    #[error("CX_ERR_205: Token {token} is {actual}, not {expected}")]
    TokenKindMismatch {
        token: Address,
        expected: ItemType,
        actual: ItemType,
    },

    #[error("CX_ERR_206: Token {identifier} of {token} already minted")]
    TokenAlreadyMinted { token: Address, identifier: u128 },

    /// Transfers created or destroyed value.
    #[error("CX_ERR_207: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Routing / Conduit Controller Errors (3xx)
    // =================================================================
    /// Nonzero routing key with no conduit registered.
    #[error("CX_ERR_300: Unknown conduit for key {0}")]
    UnknownConduit(ConduitKey),

    /// The conduit exists but has no open channel for this caller.
    #[error("CX_ERR_301: Conduit channel not open for {0}")]
    ChannelNotOpen(Address),

    /// The conduit returned without reverting but echoed the wrong magic value.
    #[error("CX_ERR_302: Invalid conduit {conduit} for key {conduit_key}")]
    InvalidConduit {
        conduit_key: ConduitKey,
        conduit: Address,
    },

    /// Caller is not the creator encoded in the conduit key.
    #[error("CX_ERR_303: Caller is not the creator named by the conduit key")]
    InvalidCreator,

    #[error("CX_ERR_304: Conduit already exists at {0}")]
    ConduitAlreadyExists(Address),

    #[error("CX_ERR_305: Initial conduit owner cannot be the zero address")]
    InvalidInitialOwner,

    #[error("CX_ERR_306: Caller is not the owner of conduit {0}")]
    CallerIsNotOwner(Address),

    /// No conduit is registered at the given address.
    #[error("CX_ERR_307: No conduit at {0}")]
    NoConduit(Address),

    #[error("CX_ERR_308: New potential owner of {0} cannot be the zero address")]
    NewPotentialOwnerIsZeroAddress(Address),

    #[error("CX_ERR_309: {new_potential_owner} is already the potential owner of {conduit}")]
    NewPotentialOwnerAlreadySet {
        conduit: Address,
        new_potential_owner: Address,
    },

    #[error("CX_ERR_310: No potential owner currently set for {0}")]
    NoPotentialOwnerCurrentlySet(Address),

    #[error("CX_ERR_311: Caller is not the potential owner of {0}")]
    CallerIsNotNewPotentialOwner(Address),

    #[error("CX_ERR_312: Channel index out of range for {0}")]
    ChannelOutOfRange(Address),

    // =================================================================
    // Downstream-Wrapped Errors (4xx)
    // =================================================================
    /// Conduit reverted with anything other than a plain string reason.
    #[error("CX_ERR_400: Conduit {conduit} (key {conduit_key}) reverted: {reason}")]
    ConduitErrorRevertBytes {
        reason: RevertData,
        conduit_key: ConduitKey,
        conduit: Address,
    },

    /// Conduit reverted with `Error(string)`.
    #[error("CX_ERR_401: Conduit {conduit} (key {conduit_key}) reverted: {reason}")]
    ConduitErrorRevertString {
        reason: String,
        conduit_key: ConduitKey,
        conduit: Address,
    },

    /// ERC721 receiver hook rejected the token with a string reason.
    #[error("CX_ERR_402: Receiver {receiver} rejected token {identifier} from {sender}: {reason}")]
    Erc721ReceiverErrorRevertString {
        reason: String,
        receiver: Address,
        sender: Address,
        identifier: u128,
    },

    /// ERC721 receiver hook reverted with non-string data.
    #[error("CX_ERR_403: Receiver {receiver} rejected token {identifier} from {sender}: {reason}")]
    Erc721ReceiverErrorRevertBytes {
        reason: RevertData,
        receiver: Address,
        sender: Address,
        identifier: u128,
    },

    // =================================================================
    // Settlement Errors (5xx)
    // =================================================================
    #[error("CX_ERR_500: Order {0} is cancelled")]
    OrderIsCancelled(OrderHash),

    #[error("CX_ERR_501: Order {0} is already filled")]
    OrderAlreadyFilled(OrderHash),

    #[error("CX_ERR_502: Order not active at {now}: window is [{start_time}, {end_time})")]
    InvalidTime {
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("CX_ERR_503: Order signature verification failed")]
    InvalidSignature,

    /// Restricted order fulfilled by someone other than its zone or offerer.
    #[error("CX_ERR_504: Restricted order {0} cannot be fulfilled by this caller")]
    InvalidRestrictedOrder(OrderHash),

    #[error("CX_ERR_505: Caller may not cancel this order")]
    InvalidCanceller,

    #[error("CX_ERR_506: Fewer consideration items than the order originally signed")]
    MissingOriginalConsiderationItems,

    #[error("CX_ERR_507: Insufficient native value supplied: need {needed}, supplied {supplied}")]
    InsufficientEtherSupplied { needed: Decimal, supplied: Decimal },

    #[error("CX_ERR_508: Native items cannot be offered")]
    InvalidNativeOfferItem,

    #[error("CX_ERR_509: Invalid basic order parameters: {reason}")]
    InvalidBasicOrderParameters { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    #[error("CX_ERR_900: Internal error: {0}")]
    Internal(String),

    #[error("CX_ERR_901: Serialization error: {0}")]
    Serialization(String),

    #[error("CX_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl ConsiderationError {
    /// Solidity-style error signature, used to derive custom-error selectors.
    #[must_use]
    pub fn signature(&self) -> &'static str {
        match self {
            Self::InvalidErc20Identifier => "InvalidERC20Identifier()",
            Self::InvalidItemType => "InvalidItemType()",
            Self::InvalidErc721TransferAmount { .. } => "InvalidERC721TransferAmount()",
            Self::InvalidItemAmount { .. } => "InvalidItemAmount()",
            Self::InsufficientBalance { .. } => "InsufficientBalance(address,address)",
            Self::InsufficientAllowance { .. } => "InsufficientAllowance(address,address,address)",
            Self::NotTokenOwner { .. } => "NotTokenOwner(address,address,uint256)",
            Self::NotApproved { .. } => "NotApproved(address,address,address)",
            Self::NoContract(_) => "NoContract(address)",
            Self::TokenKindMismatch { .. } => "TokenKindMismatch(address)",
            Self::TokenAlreadyMinted { .. } => "TokenAlreadyMinted(address,uint256)",
            Self::SupplyInvariantViolation { .. } => "SupplyInvariantViolation()",
            Self::UnknownConduit(_) => "UnknownConduit(bytes32)",
            Self::ChannelNotOpen(_) => "ChannelClosed(address)",
            Self::InvalidConduit { .. } => "InvalidConduit(bytes32,address)",
            Self::InvalidCreator => "InvalidCreator()",
            Self::ConduitAlreadyExists(_) => "ConduitAlreadyExists(address)",
            Self::InvalidInitialOwner => "InvalidInitialOwner()",
            Self::CallerIsNotOwner(_) => "CallerIsNotOwner(address)",
            Self::NoConduit(_) => "NoConduit()",
            Self::NewPotentialOwnerIsZeroAddress(_) => "NewPotentialOwnerIsZeroAddress(address)",
            Self::NewPotentialOwnerAlreadySet { .. } => {
                "NewPotentialOwnerAlreadySet(address,address)"
            }
            Self::NoPotentialOwnerCurrentlySet(_) => "NoPotentialOwnerCurrentlySet(address)",
            Self::CallerIsNotNewPotentialOwner(_) => "CallerIsNotNewPotentialOwner(address)",
            Self::ChannelOutOfRange(_) => "ChannelOutOfRange(address)",
            Self::ConduitErrorRevertBytes { .. } => "ConduitErrorRevertBytes(bytes,bytes32,address)",
            Self::ConduitErrorRevertString { .. } => {
                "ConduitErrorRevertString(string,bytes32,address)"
            }
            Self::Erc721ReceiverErrorRevertString { .. } => {
                "ERC721ReceiverErrorRevertString(string,address,address,uint256)"
            }
            Self::Erc721ReceiverErrorRevertBytes { .. } => {
                "ERC721ReceiverErrorRevertBytes(bytes,address,address,uint256)"
            }
            Self::OrderIsCancelled(_) => "OrderIsCancelled(bytes32)",
            Self::OrderAlreadyFilled(_) => "OrderAlreadyFilled(bytes32)",
            Self::InvalidTime { .. } => "InvalidTime()",
            Self::InvalidSignature => "InvalidSignature()",
            Self::InvalidRestrictedOrder(_) => "InvalidRestrictedOrder(bytes32)",
            Self::InvalidCanceller => "InvalidCanceller()",
            Self::MissingOriginalConsiderationItems => "MissingOriginalConsiderationItems()",
            Self::InsufficientEtherSupplied { .. } => "InsufficientEtherSupplied()",
            Self::InvalidNativeOfferItem => "InvalidNativeOfferItem()",
            Self::InvalidBasicOrderParameters { .. } => "InvalidBasicOrderParameters()",
            Self::Internal(_) => "Internal()",
            Self::Serialization(_) => "Serialization()",
            Self::Configuration(_) => "Configuration()",
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, ConsiderationError>;

impl From<serde_json::Error> for ConsiderationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
