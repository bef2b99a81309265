//! Configuration for the settlement engines.

use serde::{Deserialize, Serialize};

use crate::{Address, ConsiderationError, Result, constants};

/// Top-level engine configuration. Every section has defaults, so a partial
/// JSON document is enough.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub marketplace: MarketplaceConfig,
    pub transfer_helper: TransferHelperConfig,
    pub conduit_controller: ConduitControllerConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// All three engine addresses must be distinct and nonzero.
    pub fn validate(&self) -> Result<()> {
        let addrs = [
            ("marketplace", self.marketplace.address),
            ("transfer_helper", self.transfer_helper.address),
            ("conduit_controller", self.conduit_controller.address),
        ];
        for (name, addr) in addrs {
            if addr.is_zero() {
                return Err(ConsiderationError::Configuration(format!(
                    "{name}.address must not be zero"
                )));
            }
        }
        if addrs[0].1 == addrs[1].1 || addrs[0].1 == addrs[2].1 || addrs[1].1 == addrs[2].1 {
            return Err(ConsiderationError::Configuration(
                "engine addresses must be distinct".into(),
            ));
        }
        Ok(())
    }
}

/// Order settlement engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Account the marketplace acts as (operator on the direct path, channel on conduits).
    pub address: Address,
    pub name: String,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            address: Address::derive(constants::DEFAULT_MARKETPLACE_LABEL),
            name: constants::ENGINE_NAME.to_string(),
        }
    }
}

/// Bulk transfer helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferHelperConfig {
    pub address: Address,
    /// Invoke ERC721 receiver hooks on contract recipients (direct path).
    pub validate_erc721_receivers: bool,
}

impl Default for TransferHelperConfig {
    fn default() -> Self {
        Self {
            address: Address::derive(constants::DEFAULT_TRANSFER_HELPER_LABEL),
            validate_erc721_receivers: true,
        }
    }
}

/// Conduit registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConduitControllerConfig {
    pub address: Address,
}

impl Default for ConduitControllerConfig {
    fn default() -> Self {
        Self {
            address: Address::derive(constants::DEFAULT_CONDUIT_CONTROLLER_LABEL),
        }
    }
}
