//! Settlement events emitted by the marketplace.
//!
//! Events form an append-only log an indexer would consume. Each successful
//! state transition produces exactly one event.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, ItemType, OrderHash};

/// An offer item as actually transferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentItem {
    pub item_type: ItemType,
    pub token: Address,
    pub identifier: u128,
    pub amount: Decimal,
}

/// A consideration item as actually received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedItem {
    pub item_type: ItemType,
    pub token: Address,
    pub identifier: u128,
    pub amount: Decimal,
    pub recipient: Address,
}

/// A state transition recorded by the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementEvent {
    OrderFulfilled {
        order_hash: OrderHash,
        offerer: Address,
        zone: Address,
        fulfiller: Address,
        offer: Vec<SpentItem>,
        consideration: Vec<ReceivedItem>,
    },
    OrderCancelled {
        order_hash: OrderHash,
        offerer: Address,
        zone: Address,
    },
    OrderValidated {
        order_hash: OrderHash,
        offerer: Address,
        zone: Address,
    },
    CounterIncremented {
        new_counter: u64,
        offerer: Address,
    },
}

impl SettlementEvent {
    /// The order this event concerns, if any.
    #[must_use]
    pub fn order_hash(&self) -> Option<OrderHash> {
        match self {
            Self::OrderFulfilled { order_hash, .. }
            | Self::OrderCancelled { order_hash, .. }
            | Self::OrderValidated { order_hash, .. } => Some(*order_hash),
            Self::CounterIncremented { .. } => None,
        }
    }
}

impl std::fmt::Display for SettlementEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderFulfilled { order_hash, fulfiller, .. } => {
                write!(f, "ORDER_FULFILLED {order_hash} by {fulfiller}")
            }
            Self::OrderCancelled { order_hash, .. } => write!(f, "ORDER_CANCELLED {order_hash}"),
            Self::OrderValidated { order_hash, .. } => write!(f, "ORDER_VALIDATED {order_hash}"),
            Self::CounterIncremented { new_counter, offerer } => {
                write!(f, "COUNTER_INCREMENTED {offerer} -> {new_counter}")
            }
        }
    }
}
