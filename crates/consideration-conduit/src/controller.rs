//! Conduit controller: the registry that deploys conduits and manages their
//! channels and ownership.
//!
//! Conduit addresses are derived deterministically from the controller's
//! address and the conduit key, so any party can compute where a conduit
//! lives before it exists. Only the owner of a conduit may open or close its
//! channels. Ownership moves in two steps: the owner nominates a potential
//! owner, who must then accept.

use std::collections::HashMap;

use consideration_ledger::Ledger;
use consideration_types::constants::CONDUIT_DOMAIN;
use consideration_types::{
    Address, ConduitControllerConfig, ConduitKey, ConduitTransfer, ConsiderationError, Result,
    RevertData,
};

use crate::conduit::{Conduit, LedgerConduit};

struct ConduitRecord {
    key: ConduitKey,
    owner: Address,
    /// `Address::ZERO` when no transfer is pending.
    potential_owner: Address,
    /// Open channels, kept compact with swap-remove.
    channels: Vec<Address>,
    /// channel → index into `channels`.
    channel_indexes: HashMap<Address, usize>,
    conduit: Box<dyn Conduit>,
}

/// Registry of conduits, keyed by routing key and by address.
pub struct ConduitController {
    address: Address,
    conduits: HashMap<Address, ConduitRecord>,
    keys: HashMap<ConduitKey, Address>,
}

impl ConduitController {
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            conduits: HashMap::new(),
            keys: HashMap::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ConduitControllerConfig) -> Self {
        Self::new(config.address)
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Where the conduit for `key` lives (or would live).
    #[must_use]
    pub fn conduit_address(&self, key: ConduitKey) -> Address {
        Address::from_digest(&[CONDUIT_DOMAIN, self.address.as_bytes(), key.as_bytes()])
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Deploy a standard [`LedgerConduit`] under `key`.
    ///
    /// # Errors
    /// - `InvalidCreator` if `caller` is not the creator named by the key
    /// - `InvalidInitialOwner` if `initial_owner` is zero
    /// - `ConduitAlreadyExists` if the key is taken
    pub fn create_conduit(
        &mut self,
        caller: Address,
        key: ConduitKey,
        initial_owner: Address,
    ) -> Result<Address> {
        self.install_conduit(caller, key, initial_owner, |address| {
            Box::new(LedgerConduit::new(address))
        })
    }

    /// Deploy a custom conduit implementation under `key`. `build` receives the
    /// derived conduit address. Same checks as [`create_conduit`](Self::create_conduit).
    pub fn install_conduit(
        &mut self,
        caller: Address,
        key: ConduitKey,
        initial_owner: Address,
        build: impl FnOnce(Address) -> Box<dyn Conduit>,
    ) -> Result<Address> {
        if key.creator() != caller {
            return Err(ConsiderationError::InvalidCreator);
        }
        if initial_owner.is_zero() {
            return Err(ConsiderationError::InvalidInitialOwner);
        }
        let address = self.conduit_address(key);
        if self.conduits.contains_key(&address) {
            return Err(ConsiderationError::ConduitAlreadyExists(address));
        }

        self.conduits.insert(
            address,
            ConduitRecord {
                key,
                owner: initial_owner,
                potential_owner: Address::ZERO,
                channels: Vec::new(),
                channel_indexes: HashMap::new(),
                conduit: build(address),
            },
        );
        self.keys.insert(key, address);

        tracing::info!(
            conduit = %address,
            conduit_key = %key,
            owner = %initial_owner,
            "Conduit created"
        );
        Ok(address)
    }

    // -----------------------------------------------------------------------
    // Channels
    // -----------------------------------------------------------------------

    /// Open or close `channel` on `conduit`. Idempotent.
    ///
    /// # Errors
    /// `NoConduit`, or `CallerIsNotOwner` if `caller` does not own the conduit.
    pub fn update_channel(
        &mut self,
        caller: Address,
        conduit: Address,
        channel: Address,
        open: bool,
    ) -> Result<()> {
        let record = self.record_mut(conduit)?;
        if record.owner != caller {
            return Err(ConsiderationError::CallerIsNotOwner(conduit));
        }

        let is_open = record.channel_indexes.contains_key(&channel);
        if open && !is_open {
            record.channel_indexes.insert(channel, record.channels.len());
            record.channels.push(channel);
        } else if !open && is_open {
            if let Some(index) = record.channel_indexes.remove(&channel) {
                record.channels.swap_remove(index);
                if let Some(moved) = record.channels.get(index) {
                    record.channel_indexes.insert(*moved, index);
                }
            }
        }

        tracing::debug!(conduit = %conduit, channel = %channel, open, "Channel updated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Ownership
    // -----------------------------------------------------------------------

    /// Nominate `new_potential_owner`; takes effect on [`accept_ownership`](Self::accept_ownership).
    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        conduit: Address,
        new_potential_owner: Address,
    ) -> Result<()> {
        let record = self.record_mut(conduit)?;
        if record.owner != caller {
            return Err(ConsiderationError::CallerIsNotOwner(conduit));
        }
        if new_potential_owner.is_zero() {
            return Err(ConsiderationError::NewPotentialOwnerIsZeroAddress(conduit));
        }
        if new_potential_owner == record.potential_owner {
            return Err(ConsiderationError::NewPotentialOwnerAlreadySet {
                conduit,
                new_potential_owner,
            });
        }
        record.potential_owner = new_potential_owner;
        tracing::debug!(conduit = %conduit, potential_owner = %new_potential_owner, "Ownership transfer started");
        Ok(())
    }

    pub fn cancel_ownership_transfer(&mut self, caller: Address, conduit: Address) -> Result<()> {
        let record = self.record_mut(conduit)?;
        if record.owner != caller {
            return Err(ConsiderationError::CallerIsNotOwner(conduit));
        }
        if record.potential_owner.is_zero() {
            return Err(ConsiderationError::NoPotentialOwnerCurrentlySet(conduit));
        }
        record.potential_owner = Address::ZERO;
        Ok(())
    }

    pub fn accept_ownership(&mut self, caller: Address, conduit: Address) -> Result<()> {
        let record = self.record_mut(conduit)?;
        if record.potential_owner.is_zero() || record.potential_owner != caller {
            return Err(ConsiderationError::CallerIsNotNewPotentialOwner(conduit));
        }
        let previous = record.owner;
        record.owner = caller;
        record.potential_owner = Address::ZERO;
        tracing::info!(conduit = %conduit, from = %previous, to = %caller, "Conduit ownership transferred");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The conduit address for `key` and whether it has been created.
    /// Uncreated keys report the address they would deploy to.
    #[must_use]
    pub fn get_conduit(&self, key: ConduitKey) -> (Address, bool) {
        match self.keys.get(&key) {
            Some(address) => (*address, true),
            None => (self.conduit_address(key), false),
        }
    }

    pub fn get_key(&self, conduit: Address) -> Result<ConduitKey> {
        Ok(self.record(conduit)?.key)
    }

    pub fn owner_of(&self, conduit: Address) -> Result<Address> {
        Ok(self.record(conduit)?.owner)
    }

    pub fn get_potential_owner(&self, conduit: Address) -> Result<Address> {
        Ok(self.record(conduit)?.potential_owner)
    }

    pub fn get_channel_status(&self, conduit: Address, channel: Address) -> Result<bool> {
        Ok(self.record(conduit)?.channel_indexes.contains_key(&channel))
    }

    pub fn get_total_channels(&self, conduit: Address) -> Result<usize> {
        Ok(self.record(conduit)?.channels.len())
    }

    pub fn get_channel(&self, conduit: Address, index: usize) -> Result<Address> {
        self.record(conduit)?
            .channels
            .get(index)
            .copied()
            .ok_or(ConsiderationError::ChannelOutOfRange(conduit))
    }

    pub fn get_channels(&self, conduit: Address) -> Result<Vec<Address>> {
        Ok(self.record(conduit)?.channels.clone())
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Hand a batch to the conduit at `conduit`. Channel checks happen in
    /// [`resolve`](crate::router::resolve) before this is reached.
    ///
    /// # Errors
    /// The outer error is `NoConduit`; the inner result is the conduit's own
    /// return value or revert data, unwrapped.
    pub fn call_conduit(
        &mut self,
        conduit: Address,
        ledger: &mut Ledger,
        transfers: &[ConduitTransfer],
    ) -> Result<std::result::Result<[u8; 4], RevertData>> {
        let record = self.record_mut(conduit)?;
        Ok(record.conduit.execute(ledger, transfers))
    }

    fn record(&self, conduit: Address) -> Result<&ConduitRecord> {
        self.conduits
            .get(&conduit)
            .ok_or(ConsiderationError::NoConduit(conduit))
    }

    fn record_mut(&mut self, conduit: Address) -> Result<&mut ConduitRecord> {
        self.conduits
            .get_mut(&conduit)
            .ok_or(ConsiderationError::NoConduit(conduit))
    }
}

impl Default for ConduitController {
    fn default() -> Self {
        Self::from_config(&ConduitControllerConfig::default())
    }
}
