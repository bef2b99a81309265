//! Order types for the Consideration settlement engine.
//!
//! An order pairs an **offer** (what the offerer gives up) with a list of
//! **consideration** items (what must be paid, each to a fixed recipient).
//! The offerer signs [`OrderComponents`]; the fulfiller submits
//! [`OrderParameters`], which may carry extra consideration items (tips)
//! appended after the `total_original_consideration_items` that were signed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    Address, ConduitKey, ConsiderationError, ItemType, OrderHash, OrderSignature, Result,
    constants,
};

/// An item the offerer gives up. The amount interpolates linearly from
/// `start_amount` to `end_amount` over the order's active window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferItem {
    pub item_type: ItemType,
    pub token: Address,
    pub identifier: u128,
    pub start_amount: Decimal,
    pub end_amount: Decimal,
}

impl OfferItem {
    #[must_use]
    pub fn erc20(token: Address, amount: Decimal) -> Self {
        Self::fixed(ItemType::Erc20, token, 0, amount)
    }

    #[must_use]
    pub fn erc721(token: Address, identifier: u128) -> Self {
        Self::fixed(ItemType::Erc721, token, identifier, Decimal::ONE)
    }

    #[must_use]
    pub fn erc1155(token: Address, identifier: u128, amount: Decimal) -> Self {
        Self::fixed(ItemType::Erc1155, token, identifier, amount)
    }

    #[must_use]
    pub fn fixed(item_type: ItemType, token: Address, identifier: u128, amount: Decimal) -> Self {
        Self {
            item_type,
            token,
            identifier,
            start_amount: amount,
            end_amount: amount,
        }
    }
}

/// An item the fulfiller must deliver to `recipient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsiderationItem {
    pub item_type: ItemType,
    pub token: Address,
    pub identifier: u128,
    pub start_amount: Decimal,
    pub end_amount: Decimal,
    pub recipient: Address,
}

impl ConsiderationItem {
    #[must_use]
    pub fn native(amount: Decimal, recipient: Address) -> Self {
        Self::fixed(ItemType::Native, Address::ZERO, 0, amount, recipient)
    }

    #[must_use]
    pub fn erc20(token: Address, amount: Decimal, recipient: Address) -> Self {
        Self::fixed(ItemType::Erc20, token, 0, amount, recipient)
    }

    #[must_use]
    pub fn erc721(token: Address, identifier: u128, recipient: Address) -> Self {
        Self::fixed(ItemType::Erc721, token, identifier, Decimal::ONE, recipient)
    }

    #[must_use]
    pub fn erc1155(token: Address, identifier: u128, amount: Decimal, recipient: Address) -> Self {
        Self::fixed(ItemType::Erc1155, token, identifier, amount, recipient)
    }

    #[must_use]
    pub fn fixed(
        item_type: ItemType,
        token: Address,
        identifier: u128,
        amount: Decimal,
        recipient: Address,
    ) -> Self {
        Self {
            item_type,
            token,
            identifier,
            start_amount: amount,
            end_amount: amount,
            recipient,
        }
    }
}

/// Who may fulfill the order, and whether partial fills are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    FullOpen,
    PartialOpen,
    FullRestricted,
    PartialRestricted,
}

impl OrderType {
    /// Restricted orders may only be fulfilled by their zone or offerer.
    #[must_use]
    pub fn is_restricted(self) -> bool {
        matches!(self, Self::FullRestricted | Self::PartialRestricted)
    }

    fn tag(self) -> u8 {
        match self {
            Self::FullOpen => 0,
            Self::PartialOpen => 1,
            Self::FullRestricted => 2,
            Self::PartialRestricted => 3,
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullOpen => write!(f, "FULL_OPEN"),
            Self::PartialOpen => write!(f, "PARTIAL_OPEN"),
            Self::FullRestricted => write!(f, "FULL_RESTRICTED"),
            Self::PartialRestricted => write!(f, "PARTIAL_RESTRICTED"),
        }
    }
}

/// Order as submitted for fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderParameters {
    pub offerer: Address,
    pub zone: Address,
    pub offer: Vec<OfferItem>,
    pub consideration: Vec<ConsiderationItem>,
    pub order_type: OrderType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub zone_hash: [u8; 32],
    pub salt: u128,
    /// Routing key used to pull the offerer's items.
    pub conduit_key: ConduitKey,
    /// Number of leading consideration items covered by the signature.
    pub total_original_consideration_items: usize,
}

impl OrderParameters {
    /// The signed form of these parameters under `counter`.
    ///
    /// Only the original consideration items are included; appended tips are
    /// not part of what the offerer signed.
    #[must_use]
    pub fn to_components(&self, counter: u64) -> OrderComponents {
        let original = self
            .total_original_consideration_items
            .min(self.consideration.len());
        OrderComponents {
            offerer: self.offerer,
            zone: self.zone,
            offer: self.offer.clone(),
            consideration: self.consideration[..original].to_vec(),
            order_type: self.order_type,
            start_time: self.start_time,
            end_time: self.end_time,
            zone_hash: self.zone_hash,
            salt: self.salt,
            conduit_key: self.conduit_key,
            counter,
        }
    }

    /// Append a fulfiller-paid consideration item after the signed ones.
    pub fn push_tip(&mut self, tip: ConsiderationItem) {
        self.consideration.push(tip);
    }

    /// Whether `now` falls inside `[start_time, end_time)`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now < self.end_time
    }

    pub fn check_time(&self, now: DateTime<Utc>) -> Result<()> {
        if self.is_active_at(now) {
            Ok(())
        } else {
            Err(ConsiderationError::InvalidTime {
                start_time: self.start_time,
                end_time: self.end_time,
                now,
            })
        }
    }
}

/// What the offerer signs; also the input to [`OrderComponents::hash`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderComponents {
    pub offerer: Address,
    pub zone: Address,
    pub offer: Vec<OfferItem>,
    pub consideration: Vec<ConsiderationItem>,
    pub order_type: OrderType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub zone_hash: [u8; 32],
    pub salt: u128,
    pub conduit_key: ConduitKey,
    /// The offerer's counter at signing time.
    pub counter: u64,
}

fn item_type_tag(item_type: ItemType) -> u8 {
    match item_type {
        ItemType::Native => 0,
        ItemType::Erc20 => 1,
        ItemType::Erc721 => 2,
        ItemType::Erc1155 => 3,
    }
}

fn encode_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u64).to_le_bytes());
}

fn encode_amount(out: &mut Vec<u8>, amount: Decimal) {
    out.extend_from_slice(&amount.normalize().serialize());
}

impl OrderComponents {
    /// Canonical byte encoding:
    /// `ORDER_DOMAIN || offerer || zone || offer[] || consideration[] ||
    /// order_type || start || end || zone_hash || salt || conduit_key || counter`.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        out.extend_from_slice(constants::ORDER_DOMAIN);
        out.extend_from_slice(self.offerer.as_bytes());
        out.extend_from_slice(self.zone.as_bytes());

        encode_len(&mut out, self.offer.len());
        for item in &self.offer {
            out.push(item_type_tag(item.item_type));
            out.extend_from_slice(item.token.as_bytes());
            out.extend_from_slice(&item.identifier.to_le_bytes());
            encode_amount(&mut out, item.start_amount);
            encode_amount(&mut out, item.end_amount);
        }

        encode_len(&mut out, self.consideration.len());
        for item in &self.consideration {
            out.push(item_type_tag(item.item_type));
            out.extend_from_slice(item.token.as_bytes());
            out.extend_from_slice(&item.identifier.to_le_bytes());
            encode_amount(&mut out, item.start_amount);
            encode_amount(&mut out, item.end_amount);
            out.extend_from_slice(item.recipient.as_bytes());
        }

        out.push(self.order_type.tag());
        out.extend_from_slice(&self.start_time.timestamp().to_le_bytes());
        out.extend_from_slice(&self.end_time.timestamp().to_le_bytes());
        out.extend_from_slice(&self.zone_hash);
        out.extend_from_slice(&self.salt.to_le_bytes());
        out.extend_from_slice(self.conduit_key.as_bytes());
        out.extend_from_slice(&self.counter.to_le_bytes());
        out
    }

    #[must_use]
    pub fn hash(&self) -> OrderHash {
        OrderHash(Sha256::digest(self.canonical_bytes()).into())
    }
}

/// Order parameters plus the offerer's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub parameters: OrderParameters,
    /// `None` when the order was validated on chain or is fulfilled by its offerer.
    pub signature: Option<OrderSignature>,
}

impl Order {
    #[must_use]
    pub fn unsigned(parameters: OrderParameters) -> Self {
        Self {
            parameters,
            signature: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Order lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle of an order hash.
///
/// ```text
///   ┌─────────┐  fulfill   ┌───────────┐
///   │ CREATED ├───────────▶│ FULFILLED │
///   └────┬────┘            └───────────┘
///        │ cancel / counter bump
///        ▼
///   ┌───────────┐
///   │ CANCELLED │
///   └───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderState {
    #[default]
    Created,
    Fulfilled,
    Cancelled,
}

impl OrderState {
    /// Both terminal states are final.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Created, Self::Fulfilled | Self::Cancelled))
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Created)
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Fulfilled => write!(f, "FULFILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Persisted status of an order hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderStatus {
    pub state: OrderState,
    /// Approved on chain; no signature needed at fulfillment.
    pub validated: bool,
}

impl OrderStatus {
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.state == OrderState::Fulfilled
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state == OrderState::Cancelled
    }
}

// ---------------------------------------------------------------------------
// Basic orders
// ---------------------------------------------------------------------------

/// Which asset pair a basic order trades, from the fulfiller's perspective
/// (`XToY`: fulfiller provides X, receives Y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasicOrderRoute {
    EthToErc721,
    EthToErc1155,
    Erc20ToErc721,
    Erc20ToErc1155,
    Erc721ToErc20,
    Erc1155ToErc20,
}

impl BasicOrderRoute {
    /// Accept-offer routes: the offerer offers ERC20 and receives the NFT.
    #[must_use]
    pub fn is_accept_offer(self) -> bool {
        matches!(self, Self::Erc721ToErc20 | Self::Erc1155ToErc20)
    }

    /// Kind of the fungible payment leg.
    #[must_use]
    pub fn payment_type(self) -> ItemType {
        match self {
            Self::EthToErc721 | Self::EthToErc1155 => ItemType::Native,
            Self::Erc20ToErc721
            | Self::Erc20ToErc1155
            | Self::Erc721ToErc20
            | Self::Erc1155ToErc20 => ItemType::Erc20,
        }
    }

    /// Kind of the non-fungible leg.
    #[must_use]
    pub fn nft_type(self) -> ItemType {
        match self {
            Self::EthToErc721 | Self::Erc20ToErc721 | Self::Erc721ToErc20 => ItemType::Erc721,
            Self::EthToErc1155 | Self::Erc20ToErc1155 | Self::Erc1155ToErc20 => ItemType::Erc1155,
        }
    }
}

/// Fee or royalty leg of a basic order, paid in the payment token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalRecipient {
    pub amount: Decimal,
    pub recipient: Address,
}

/// Single-offer / single-primary-consideration order with fee legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicOrderParameters {
    pub consideration_token: Address,
    pub consideration_identifier: u128,
    pub consideration_amount: Decimal,
    pub offerer: Address,
    pub zone: Address,
    pub offer_token: Address,
    pub offer_identifier: u128,
    pub offer_amount: Decimal,
    pub route: BasicOrderRoute,
    pub order_type: OrderType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub zone_hash: [u8; 32],
    pub salt: u128,
    pub offerer_conduit_key: ConduitKey,
    pub fulfiller_conduit_key: ConduitKey,
    /// Number of leading additional recipients covered by the signature.
    pub total_original_additional_recipients: usize,
    pub additional_recipients: Vec<AdditionalRecipient>,
    pub signature: Option<OrderSignature>,
}

impl BasicOrderParameters {
    /// The equivalent general order. Its hash is the basic order's hash.
    pub fn to_order_parameters(&self) -> Result<OrderParameters> {
        if self.additional_recipients.len() < self.total_original_additional_recipients {
            return Err(ConsiderationError::MissingOriginalConsiderationItems);
        }

        let payment = self.route.payment_type();
        let nft = self.route.nft_type();

        let (offer, primary, fee_token) = if self.route.is_accept_offer() {
            (
                OfferItem::fixed(payment, self.offer_token, self.offer_identifier, self.offer_amount),
                ConsiderationItem::fixed(
                    nft,
                    self.consideration_token,
                    self.consideration_identifier,
                    self.consideration_amount,
                    self.offerer,
                ),
                self.offer_token,
            )
        } else {
            if payment == ItemType::Native
                && (!self.consideration_token.is_zero() || self.consideration_identifier != 0)
            {
                return Err(ConsiderationError::InvalidBasicOrderParameters {
                    reason: "native payment must use the zero token and identifier 0".into(),
                });
            }
            (
                OfferItem::fixed(nft, self.offer_token, self.offer_identifier, self.offer_amount),
                ConsiderationItem::fixed(
                    payment,
                    self.consideration_token,
                    self.consideration_identifier,
                    self.consideration_amount,
                    self.offerer,
                ),
                self.consideration_token,
            )
        };

        let mut consideration = Vec::with_capacity(1 + self.additional_recipients.len());
        consideration.push(primary);
        consideration.extend(self.additional_recipients.iter().map(|leg| {
            ConsiderationItem::fixed(payment, fee_token, 0, leg.amount, leg.recipient)
        }));

        Ok(OrderParameters {
            offerer: self.offerer,
            zone: self.zone,
            offer: vec![offer],
            consideration,
            order_type: self.order_type,
            start_time: self.start_time,
            end_time: self.end_time,
            zone_hash: self.zone_hash,
            salt: self.salt,
            conduit_key: self.offerer_conduit_key,
            total_original_consideration_items: 1 + self.total_original_additional_recipients,
        })
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl OrderParameters {
    /// Full-open order active from one hour ago to one hour from now.
    pub fn dummy(
        offerer: Address,
        offer: Vec<OfferItem>,
        consideration: Vec<ConsiderationItem>,
    ) -> Self {
        let now = Utc::now();
        let total = consideration.len();
        Self {
            offerer,
            zone: Address::ZERO,
            offer,
            consideration,
            order_type: OrderType::FullOpen,
            start_time: now - chrono::Duration::hours(1),
            end_time: now + chrono::Duration::hours(1),
            zone_hash: [0u8; 32],
            salt: rand::random(),
            conduit_key: ConduitKey::ZERO,
            total_original_consideration_items: total,
        }
    }
}
