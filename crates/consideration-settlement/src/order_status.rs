//! Order status registry: prevents double-fulfillment and enforces
//! cancellation.
//!
//! Each order hash can be fulfilled at most once. Attempting to fulfill a
//! filled order returns [`ConsiderationError::OrderAlreadyFilled`]; a cancelled
//! one returns [`ConsiderationError::OrderIsCancelled`]. Unknown hashes are
//! implicitly `CREATED` and unvalidated.

use std::collections::HashMap;

use consideration_types::{ConsiderationError, OrderHash, OrderState, OrderStatus, Result};

/// Tracks the lifecycle of every order hash the marketplace has touched.
pub struct OrderStatusRegistry {
    statuses: HashMap<OrderHash, OrderStatus>,
}

impl OrderStatusRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            statuses: HashMap::new(),
        }
    }

    /// Current status of `order_hash` (default if never seen).
    #[must_use]
    pub fn status(&self, order_hash: &OrderHash) -> OrderStatus {
        self.statuses.get(order_hash).copied().unwrap_or_default()
    }

    /// Fail unless the order can still be fulfilled, validated or cancelled.
    ///
    /// # Errors
    /// `OrderIsCancelled` or `OrderAlreadyFilled`.
    pub fn ensure_open(&self, order_hash: &OrderHash) -> Result<()> {
        match self.status(order_hash).state {
            OrderState::Created => Ok(()),
            OrderState::Fulfilled => Err(ConsiderationError::OrderAlreadyFilled(*order_hash)),
            OrderState::Cancelled => Err(ConsiderationError::OrderIsCancelled(*order_hash)),
        }
    }

    /// Record on-chain approval. Returns `false` if it was already validated.
    pub fn mark_validated(&mut self, order_hash: OrderHash) -> Result<bool> {
        self.ensure_open(&order_hash)?;
        let status = self.statuses.entry(order_hash).or_default();
        let newly = !status.validated;
        status.validated = true;
        Ok(newly)
    }

    pub fn mark_fulfilled(&mut self, order_hash: OrderHash) -> Result<()> {
        self.transition(order_hash, OrderState::Fulfilled)
    }

    pub fn mark_cancelled(&mut self, order_hash: OrderHash) -> Result<()> {
        self.transition(order_hash, OrderState::Cancelled)
    }

    fn transition(&mut self, order_hash: OrderHash, target: OrderState) -> Result<()> {
        self.ensure_open(&order_hash)?;
        let status = self.statuses.entry(order_hash).or_default();
        debug_assert!(status.state.can_transition_to(target));
        status.state = target;
        if target == OrderState::Cancelled {
            status.validated = false;
        }
        Ok(())
    }

    /// Number of order hashes with a recorded status.
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl Default for OrderStatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}
