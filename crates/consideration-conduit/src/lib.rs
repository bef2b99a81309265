//! # consideration-conduit
//!
//! Conduits and the registry that governs them.
//!
//! - [`Conduit`]: a transfer intermediary executing whole batches
//! - [`LedgerConduit`]: the standard conduit, operating on the ledger with
//!   its own address as operator
//! - [`ConduitController`]: creation, channels, and two-step ownership
//! - [`router`]: routing-key resolution, batch forwarding, magic-value
//!   verification, and revert wrapping

pub mod conduit;
pub mod controller;
#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;
pub mod router;

pub use conduit::{Conduit, LedgerConduit};
pub use controller::ConduitController;
pub use router::{ConduitHandle, Route, forward, resolve, verify_magic, wrap_conduit_revert};
