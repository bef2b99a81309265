//! # consideration-ledger
//!
//! In-memory token ledger underneath every Consideration transfer path.
//!
//! - [`Ledger`]: balances, approvals, deployments, and the logical clock
//! - [`Ledger::transact`]: snapshot/rollback for all-or-nothing batches
//! - [`Erc721Receiver`]: contract hooks consulted on ERC721 delivery
//! - [`SupplyConservation`]: Σ(balances) == Σ(mints) per token

pub mod ledger;
pub mod receiver;
pub mod supply_conservation;

pub use ledger::Ledger;
pub use receiver::{AcceptingReceiver, Erc721Receiver};
#[cfg(any(test, feature = "test-helpers"))]
pub use receiver::{RevertingReceiver, WrongMagicReceiver};
pub use supply_conservation::SupplyConservation;
