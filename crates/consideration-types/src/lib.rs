//! # consideration-types
//!
//! Shared types, errors, and configuration for the **Consideration**
//! settlement engine.
//!
//! This crate is the leaf dependency of the workspace: every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`ConduitKey`], [`OrderHash`]
//! - **Item model**: [`ItemType`], [`TransferItem`], [`TransferHelperItem`], [`ConduitTransfer`]
//! - **Order model**: [`OrderParameters`], [`OrderComponents`], [`Order`], [`OrderStatus`],
//!   [`BasicOrderParameters`]
//! - **Events**: [`SettlementEvent`], [`SpentItem`], [`ReceivedItem`]
//! - **Diagnostics**: [`RevertData`], [`RevertReason`]
//! - **Signatures**: [`OrderSignature`]
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`ConsiderationError`] with `CX_ERR_` prefix codes
//! - **Constants**: magic values and domain separators

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod item;
pub mod order;
pub mod revert;
pub mod signature;

// Re-export all primary types at crate root for ergonomic imports:
//   use consideration_types::{Address, TransferItem, OrderParameters, ...};

pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use item::*;
pub use order::*;
pub use revert::*;
pub use signature::*;

// Constants are accessed via `consideration_types::constants::FOO`
// (not re-exported to avoid name collisions).
