//! Order settlement engine.
//!
//! The marketplace fulfills signed orders: it checks the order is still open,
//! active, permitted for this fulfiller and correctly signed, then moves every
//! offer and consideration item in one ledger transaction:
//! 1. Offer items: offerer → fulfiller, via the order's conduit key
//! 2. Consideration items: fulfiller → each recipient, via the fulfiller's key
//! 3. Native consideration: paid out of the value sent with the call, with
//!    any remainder refunded
//! 4. Mark the order `FULFILLED` and emit `OrderFulfilled`
//!
//! Order statuses and counters only change after the transfers commit.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use consideration_conduit::ConduitController;
use consideration_ledger::Ledger;
use consideration_types::{
    Address, BasicOrderParameters, ConduitKey, ConduitTransfer, ConsiderationError, ItemType,
    MarketplaceConfig, Order, OrderComponents, OrderHash, OrderParameters, OrderSignature,
    OrderStatus, ReceivedItem, Result, SettlementEvent, SpentItem, validate_amount,
};
use rust_decimal::Decimal;

use crate::amount::{Rounding, checked_total, current_amount};
use crate::executor::BulkTransferExecutor;
use crate::order_status::OrderStatusRegistry;

/// Every transfer one fulfillment performs, computed before anything moves.
struct SettlementPlan {
    order_hash: OrderHash,
    offerer: Address,
    zone: Address,
    offerer_conduit_key: ConduitKey,
    fulfiller_conduit_key: ConduitKey,
    /// Pulled from the offerer via `offerer_conduit_key`.
    offerer_transfers: Vec<ConduitTransfer>,
    /// Pulled from the fulfiller via `fulfiller_conduit_key`.
    fulfiller_transfers: Vec<ConduitTransfer>,
    /// (recipient, amount) paid out of the call's value.
    native_payments: Vec<(Address, Decimal)>,
    spent: Vec<SpentItem>,
    received: Vec<ReceivedItem>,
}

/// The order settlement engine.
pub struct Marketplace {
    address: Address,
    name: String,
    executor: BulkTransferExecutor,
    statuses: OrderStatusRegistry,
    counters: HashMap<Address, u64>,
    events: Vec<SettlementEvent>,
}

impl Marketplace {
    /// `address` is the operator users approve and the channel conduits open.
    #[must_use]
    pub fn new(address: Address, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
            executor: BulkTransferExecutor::new(address, false),
            statuses: OrderStatusRegistry::new(),
            counters: HashMap::new(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &MarketplaceConfig) -> Self {
        Self::new(config.address, config.name.clone())
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn get_counter(&self, offerer: Address) -> u64 {
        self.counters.get(&offerer).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn get_order_hash(&self, components: &OrderComponents) -> OrderHash {
        components.hash()
    }

    #[must_use]
    pub fn get_order_status(&self, order_hash: &OrderHash) -> OrderStatus {
        self.statuses.status(order_hash)
    }

    /// Every event emitted so far, oldest first.
    #[must_use]
    pub fn events(&self) -> &[SettlementEvent] {
        &self.events
    }

    /// Hash of `parameters` under the offerer's current counter.
    fn order_hash_of(&self, parameters: &OrderParameters) -> OrderHash {
        parameters
            .to_components(self.get_counter(parameters.offerer))
            .hash()
    }

    // -----------------------------------------------------------------------
    // Order lifecycle
    // -----------------------------------------------------------------------

    /// Invalidate every outstanding order signed by `caller`.
    pub fn increment_counter(&mut self, caller: Address) -> u64 {
        let counter = self.counters.entry(caller).or_insert(0);
        *counter += 1;
        let new_counter = *counter;

        tracing::info!(offerer = %caller, new_counter, "Counter incremented");
        self.events.push(SettlementEvent::CounterIncremented {
            new_counter,
            offerer: caller,
        });
        new_counter
    }

    /// Approve orders on chain so they can later be fulfilled without a
    /// signature. Signatures are checked unless `caller` is the offerer.
    /// All orders are checked before any is marked.
    pub fn validate(&mut self, caller: Address, orders: &[Order]) -> Result<bool> {
        let mut pending = Vec::with_capacity(orders.len());
        for order in orders {
            let parameters = &order.parameters;
            if parameters.consideration.len() < parameters.total_original_consideration_items {
                return Err(ConsiderationError::MissingOriginalConsiderationItems);
            }
            let order_hash = self.order_hash_of(parameters);
            self.statuses.ensure_open(&order_hash)?;
            self.verify_signature(caller, parameters, order_hash, order.signature.as_ref())?;
            pending.push((order_hash, parameters.offerer, parameters.zone));
        }

        for (order_hash, offerer, zone) in pending {
            if self.statuses.mark_validated(order_hash)? {
                tracing::debug!(order_hash = %order_hash, offerer = %offerer, "Order validated");
                self.events.push(SettlementEvent::OrderValidated {
                    order_hash,
                    offerer,
                    zone,
                });
            }
        }
        Ok(true)
    }

    /// Cancel orders. `caller` must be the offerer or zone of every order;
    /// all orders are checked before any state changes.
    pub fn cancel(&mut self, caller: Address, orders: &[OrderComponents]) -> Result<bool> {
        let mut pending = Vec::with_capacity(orders.len());
        let mut seen = HashSet::new();
        for components in orders {
            if caller != components.offerer && caller != components.zone {
                tracing::warn!(caller = %caller, offerer = %components.offerer, "Cancel rejected: not offerer or zone");
                return Err(ConsiderationError::InvalidCanceller);
            }
            let order_hash = components.hash();
            self.statuses.ensure_open(&order_hash)?;
            if !seen.insert(order_hash) {
                return Err(ConsiderationError::OrderIsCancelled(order_hash));
            }
            pending.push((order_hash, components.offerer, components.zone));
        }

        for (order_hash, offerer, zone) in pending {
            self.statuses.mark_cancelled(order_hash)?;
            tracing::info!(order_hash = %order_hash, offerer = %offerer, "Order cancelled");
            self.events.push(SettlementEvent::OrderCancelled {
                order_hash,
                offerer,
                zone,
            });
        }
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Fulfillment
    // -----------------------------------------------------------------------

    /// Fulfill `order` in full.
    ///
    /// `fulfiller_conduit_key` routes the fulfiller's consideration payments;
    /// `value` is the native currency sent with the call.
    ///
    /// # Errors
    /// - `OrderAlreadyFilled` / `OrderIsCancelled`
    /// - `InvalidTime`, `InvalidRestrictedOrder`, `InvalidSignature`
    /// - `MissingOriginalConsiderationItems`, `InvalidNativeOfferItem`
    /// - `InsufficientEtherSupplied`
    /// - Any routing, conduit, receiver, or ledger error from the transfers
    pub fn fulfill_order(
        &mut self,
        ledger: &mut Ledger,
        conduits: &mut ConduitController,
        fulfiller: Address,
        order: &Order,
        fulfiller_conduit_key: ConduitKey,
        value: Decimal,
    ) -> Result<bool> {
        let parameters = &order.parameters;
        let now = ledger.timestamp();
        let result = self
            .check_fulfillable(now, fulfiller, parameters, order.signature.as_ref())
            .and_then(|order_hash| {
                self.plan(now, fulfiller, parameters, order_hash, fulfiller_conduit_key)
            })
            .and_then(|plan| self.settle(ledger, conduits, fulfiller, plan, value));
        result.inspect_err(|err| {
            tracing::warn!(fulfiller = %fulfiller, offerer = %parameters.offerer, error = %err, "Fulfillment rejected");
        })
    }

    /// Fulfill a basic order. The order hash is that of the equivalent
    /// general order. On accept-offer routes the additional recipients are
    /// paid by the offerer out of the offered ERC20, and the fulfiller
    /// receives the remainder.
    pub fn fulfill_basic_order(
        &mut self,
        ledger: &mut Ledger,
        conduits: &mut ConduitController,
        fulfiller: Address,
        params: &BasicOrderParameters,
        value: Decimal,
    ) -> Result<bool> {
        let now = ledger.timestamp();
        let result = params.to_order_parameters().and_then(|parameters| {
            let order_hash =
                self.check_fulfillable(now, fulfiller, &parameters, params.signature.as_ref())?;
            let plan = self.plan(
                now,
                fulfiller,
                &parameters,
                order_hash,
                params.fulfiller_conduit_key,
            )?;
            let plan = if params.route.is_accept_offer() {
                pay_fees_from_offer(plan)?
            } else {
                plan
            };
            self.settle(ledger, conduits, fulfiller, plan, value)
        });
        result.inspect_err(|err| {
            tracing::warn!(fulfiller = %fulfiller, route = ?params.route, error = %err, "Basic fulfillment rejected");
        })
    }

    /// Status, time window, zone restriction, signature, and consideration
    /// length, in that order.
    fn check_fulfillable(
        &self,
        now: DateTime<Utc>,
        fulfiller: Address,
        parameters: &OrderParameters,
        signature: Option<&OrderSignature>,
    ) -> Result<OrderHash> {
        let order_hash = self.order_hash_of(parameters);
        self.statuses.ensure_open(&order_hash)?;
        parameters.check_time(now)?;

        if parameters.order_type.is_restricted()
            && fulfiller != parameters.zone
            && fulfiller != parameters.offerer
        {
            return Err(ConsiderationError::InvalidRestrictedOrder(order_hash));
        }

        self.verify_signature(fulfiller, parameters, order_hash, signature)?;

        if parameters.consideration.len() < parameters.total_original_consideration_items {
            return Err(ConsiderationError::MissingOriginalConsiderationItems);
        }
        Ok(order_hash)
    }

    /// Offerers never need a signature for their own orders, nor does an
    /// order that was validated on chain.
    fn verify_signature(
        &self,
        caller: Address,
        parameters: &OrderParameters,
        order_hash: OrderHash,
        signature: Option<&OrderSignature>,
    ) -> Result<()> {
        if caller == parameters.offerer || self.statuses.status(&order_hash).validated {
            return Ok(());
        }
        signature
            .ok_or(ConsiderationError::InvalidSignature)?
            .verify(parameters.offerer, &order_hash)
    }

    fn plan(
        &self,
        now: DateTime<Utc>,
        fulfiller: Address,
        parameters: &OrderParameters,
        order_hash: OrderHash,
        fulfiller_conduit_key: ConduitKey,
    ) -> Result<SettlementPlan> {
        let mut plan = SettlementPlan {
            order_hash,
            offerer: parameters.offerer,
            zone: parameters.zone,
            offerer_conduit_key: parameters.conduit_key,
            fulfiller_conduit_key,
            offerer_transfers: Vec::with_capacity(parameters.offer.len()),
            fulfiller_transfers: Vec::with_capacity(parameters.consideration.len()),
            native_payments: Vec::new(),
            spent: Vec::with_capacity(parameters.offer.len()),
            received: Vec::with_capacity(parameters.consideration.len()),
        };

        for item in &parameters.offer {
            if item.item_type == ItemType::Native {
                return Err(ConsiderationError::InvalidNativeOfferItem);
            }
            let amount = current_amount(
                item.start_amount,
                item.end_amount,
                parameters.start_time,
                parameters.end_time,
                now,
                Rounding::Down,
            )?;
            plan.spent.push(SpentItem {
                item_type: item.item_type,
                token: item.token,
                identifier: item.identifier,
                amount,
            });
            plan.offerer_transfers.push(ConduitTransfer {
                item_type: item.item_type,
                token: item.token,
                from: parameters.offerer,
                to: fulfiller,
                identifier: item.identifier,
                amount,
            });
        }

        for item in &parameters.consideration {
            let amount = current_amount(
                item.start_amount,
                item.end_amount,
                parameters.start_time,
                parameters.end_time,
                now,
                Rounding::Up,
            )?;
            plan.received.push(ReceivedItem {
                item_type: item.item_type,
                token: item.token,
                identifier: item.identifier,
                amount,
                recipient: item.recipient,
            });
            match item.item_type {
                ItemType::Native => {
                    item.item_type.validate_identifier(item.identifier)?;
                    validate_amount(amount)?;
                    plan.native_payments.push((item.recipient, amount));
                }
                ItemType::Erc20 | ItemType::Erc721 | ItemType::Erc1155 => {
                    plan.fulfiller_transfers.push(ConduitTransfer {
                        item_type: item.item_type,
                        token: item.token,
                        from: fulfiller,
                        to: item.recipient,
                        identifier: item.identifier,
                        amount,
                    });
                }
            }
        }
        Ok(plan)
    }

    fn settle(
        &mut self,
        ledger: &mut Ledger,
        conduits: &mut ConduitController,
        fulfiller: Address,
        plan: SettlementPlan,
        value: Decimal,
    ) -> Result<bool> {
        validate_amount(value)?;
        let native_needed = checked_total(plan.native_payments.iter().map(|(_, amount)| *amount))?;
        if native_needed > value {
            return Err(ConsiderationError::InsufficientEtherSupplied {
                needed: native_needed,
                supplied: value,
            });
        }

        let marketplace = self.address;
        let executor = self.executor;
        ledger.transact(|ledger| -> Result<()> {
            // ── NATIVE VALUE ─────────────────────────────────────────────
            if !value.is_zero() {
                ledger.transfer_native(fulfiller, marketplace, value)?;
            }
            for (recipient, amount) in &plan.native_payments {
                ledger.transfer_native(marketplace, *recipient, *amount)?;
            }
            let refund = value - native_needed;
            if !refund.is_zero() {
                ledger.transfer_native(marketplace, fulfiller, refund)?;
            }

            // ── TOKEN ITEMS ──────────────────────────────────────────────
            if !plan.offerer_transfers.is_empty() {
                executor.execute_batch(
                    ledger,
                    conduits,
                    plan.offerer_conduit_key,
                    &plan.offerer_transfers,
                )?;
            }
            if !plan.fulfiller_transfers.is_empty() {
                executor.execute_batch(
                    ledger,
                    conduits,
                    plan.fulfiller_conduit_key,
                    &plan.fulfiller_transfers,
                )?;
            }
            Ok(())
        })?;

        self.statuses.mark_fulfilled(plan.order_hash)?;

        tracing::info!(
            order_hash = %plan.order_hash,
            offerer = %plan.offerer,
            fulfiller = %fulfiller,
            offer_items = plan.spent.len(),
            consideration_items = plan.received.len(),
            "Order fulfilled"
        );
        self.events.push(SettlementEvent::OrderFulfilled {
            order_hash: plan.order_hash,
            offerer: plan.offerer,
            zone: plan.zone,
            fulfiller,
            offer: plan.spent,
            consideration: plan.received,
        });
        Ok(true)
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self::from_config(&MarketplaceConfig::default())
    }
}

/// Accept-offer basic orders: the fee legs come out of the offerer's ERC20
/// directly, and the fulfiller receives what is left of the offer.
fn pay_fees_from_offer(mut plan: SettlementPlan) -> Result<SettlementPlan> {
    let fees = if plan.fulfiller_transfers.len() > 1 {
        plan.fulfiller_transfers.split_off(1)
    } else {
        Vec::new()
    };
    let fee_total = checked_total(fees.iter().map(|fee| fee.amount))?;

    let offer = plan.offerer_transfers.first_mut().ok_or_else(|| {
        ConsiderationError::InvalidBasicOrderParameters {
            reason: "accept-offer order has no offer item".into(),
        }
    })?;
    if fee_total > offer.amount {
        return Err(ConsiderationError::InvalidBasicOrderParameters {
            reason: format!(
                "additional recipients total {fee_total} exceeds offer amount {}",
                offer.amount
            ),
        });
    }
    offer.amount -= fee_total;

    let offerer = plan.offerer;
    plan.offerer_transfers
        .extend(fees.into_iter().map(|fee| ConduitTransfer { from: offerer, ..fee }));
    Ok(plan)
}
