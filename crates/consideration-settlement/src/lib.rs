//! # consideration-settlement
//!
//! **Settlement plane**: bulk transfers and order fulfillment on top of the
//! ledger and conduit registry.
//!
//! ## Architecture
//!
//! Every batch of item movements goes through one [`BulkTransferExecutor`]:
//! 1. Resolves the routing key (direct, or an open conduit channel)
//! 2. Executes the whole batch inside a ledger transaction
//! 3. Wraps conduit and receiver failures with their context
//!
//! Two entry points sit on top of it:
//!
//! - [`TransferHelper`]: stateless multi-recipient transfers
//! - [`Marketplace`]: order hashing, signatures, counters, validation,
//!   cancellation, and fulfillment of general and basic orders
//!
//! Order lifecycle bookkeeping lives in [`OrderStatusRegistry`]; time-based
//! amount interpolation in [`amount`].

pub mod amount;
pub mod executor;
pub mod marketplace;
pub mod order_status;
pub mod transfer_helper;

pub use amount::{Rounding, checked_total, current_amount};
pub use executor::BulkTransferExecutor;
pub use marketplace::Marketplace;
pub use order_status::OrderStatusRegistry;
pub use transfer_helper::TransferHelper;
